use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::Span;

use crate::error::Interrupted;

/// Cancellation and logging span for one invocation.
#[derive(Debug, Clone)]
pub struct Context {
    cancel: CancellationToken,
    span: Span,
}

impl Context {
    pub fn new(span: Span) -> Self {
        Self {
            cancel: CancellationToken::new(),
            span,
        }
    }

    /// Same cancellation, narrower span.
    pub fn with_span(&self, span: Span) -> Self {
        Self {
            cancel: self.cancel.clone(),
            span,
        }
    }

    /// Same span, independent of this invocation's cancellation. For
    /// best-effort notifications that must still go out while the
    /// invocation is being torn down.
    pub fn detached(&self) -> Self {
        Self {
            cancel: CancellationToken::new(),
            span: self.span.clone(),
        }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Drives `fut` to completion unless the context is cancelled first or
    /// `limit` elapses; either interruption drops the in-flight future.
    pub async fn run<F, T, E>(&self, limit: Duration, fut: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: From<Interrupted>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Interrupted::Cancelled.into()),
            res = tokio::time::timeout(limit, fut) => {
                res.unwrap_or_else(|_| Err(Interrupted::TimedOut(limit).into()))
            }
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(Span::none())
    }
}
