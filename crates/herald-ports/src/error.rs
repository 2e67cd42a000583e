use thiserror::Error;

/// Raised when a call is cut short by the invocation's cancellation token or
/// by its own timeout.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum Interrupted {
    #[error("cancelled")]
    Cancelled,
    #[error("timed out after {0:?}")]
    TimedOut(std::time::Duration),
}

#[derive(Debug, Error)]
pub enum PortError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("connection error: {0}")]
    Connection(String),
    #[error("store call interrupted: {0}")]
    Interrupted(#[from] Interrupted),
}

#[derive(Debug, Error)]
pub enum ChatError {
    /// The chat API answered but refused the call; `code` is its error code.
    #[error("chat api error: {code}")]
    Api { code: String },
    #[error("chat transport error: {0}")]
    Transport(String),
    #[error("chat call interrupted: {0}")]
    Interrupted(#[from] Interrupted),
}

impl ChatError {
    pub fn api(code: impl Into<String>) -> Self {
        Self::Api { code: code.into() }
    }

    pub fn is_already_reacted(&self) -> bool {
        matches!(self, Self::Api { code } if code == "already_reacted")
    }

    pub fn is_no_reaction(&self) -> bool {
        matches!(self, Self::Api { code } if code == "no_reaction")
    }
}

#[derive(Debug, Error)]
pub enum PagingError {
    #[error("paging transport error: {0}")]
    Transport(String),
    #[error("paging service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("paging service rejected the event: {}", .0.join("; "))]
    Rejected(Vec<String>),
    #[error("paging call interrupted: {0}")]
    Interrupted(#[from] Interrupted),
}

#[derive(Debug, Error)]
pub enum PublishError {
    /// Another invocation holds the lock for this exact message and is about
    /// to post it. Not a failure of the system as a whole.
    #[error("the message is already locked by a concurrent delivery")]
    AlreadyLocked,
    #[error(transparent)]
    Store(#[from] PortError),
    #[error(transparent)]
    Chat(#[from] ChatError),
    #[error(transparent)]
    Paging(#[from] PagingError),
    #[error("{}", join_lines(.0))]
    Multiple(Vec<PublishError>),
}

impl PublishError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::AlreadyLocked)
    }

    /// Combines an optional earlier error with a later one, keeping both.
    pub fn join(first: Option<Self>, second: Self) -> Self {
        match first {
            None => second,
            Some(Self::Multiple(mut errors)) => {
                errors.push(second);
                Self::Multiple(errors)
            }
            Some(first) => Self::Multiple(vec![first, second]),
        }
    }
}

fn join_lines(errors: &[PublishError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
