use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid label match (must be 'label=value'): {0}")]
    InvalidLabelMatch(String),
}
