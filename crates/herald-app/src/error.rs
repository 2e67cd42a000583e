use herald_core::error::DomainError;
use herald_ports::error::PublishError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("no publishers defined")]
    NoPublishers,
    #[error("{publisher}: {source}")]
    Publish {
        publisher: String,
        #[source]
        source: PublishError,
    },
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("{}", join_lines(.0))]
    Joined(Vec<AppError>),
}

impl AppError {
    /// Folds collected errors into one result without dropping any of them.
    pub fn join(mut errors: Vec<AppError>) -> Result<(), AppError> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(Self::Joined(errors)),
        }
    }

    /// Number of leaf errors, looking through nested joins.
    pub fn count(&self) -> usize {
        match self {
            Self::Joined(errors) => errors.iter().map(Self::count).sum(),
            _ => 1,
        }
    }
}

fn join_lines(errors: &[AppError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
