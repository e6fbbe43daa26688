use std::future::{Future, pending};
use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

/// Why a [`CallContext`] stopped a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    #[error("context deadline exceeded")]
    Timeout,
    #[error("context canceled")]
    Canceled,
}

/// Deadline and cancellation scope for a single API call.
///
/// A background context never expires. Contexts are cheap to clone; clones
/// share the same cancellation token.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
    cancel: Option<CancellationToken>,
}

impl CallContext {
    /// A context with no deadline that can't be canceled.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            cancel: None,
        }
    }

    /// Attach a cancellation token. Canceling it aborts any call running
    /// under this context.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The reason this context is done, or `None` while it's still live.
    ///
    /// Cancellation wins when both apply.
    pub fn err(&self) -> Option<ContextError> {
        if self.cancel.as_ref().is_some_and(|t| t.is_cancelled()) {
            return Some(ContextError::Canceled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Some(ContextError::Timeout);
        }
        None
    }

    /// Drive `fut` until it completes or this context is done.
    ///
    /// An already-finished context fails without polling `fut`.
    pub(crate) async fn run<F: Future>(&self, fut: F) -> Result<F::Output, ContextError> {
        if let Some(err) = self.err() {
            return Err(err);
        }

        let canceled = async {
            match &self.cancel {
                Some(token) => token.cancelled().await,
                None => pending().await,
            }
        };
        let expired = async {
            match self.deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => pending().await,
            }
        };

        tokio::select! {
            biased;
            () = canceled => Err(ContextError::Canceled),
            () = expired => Err(ContextError::Timeout),
            out = fut => Ok(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn background_is_never_done() {
        assert_eq!(CallContext::background().err(), None);
        assert!(CallContext::background().deadline().is_none());
    }

    #[tokio::test]
    async fn elapsed_deadline_reports_timeout() {
        let ctx = CallContext::with_deadline(Instant::now() - Duration::from_millis(1));
        assert_eq!(ctx.err(), Some(ContextError::Timeout));
    }

    #[tokio::test]
    async fn cancellation_beats_deadline() {
        let token = CancellationToken::new();
        token.cancel();
        let ctx = CallContext::with_deadline(Instant::now() - Duration::from_millis(1))
            .with_cancellation(token);
        assert_eq!(ctx.err(), Some(ContextError::Canceled));
    }

    #[tokio::test]
    async fn run_skips_future_when_already_canceled() {
        let token = CancellationToken::new();
        token.cancel();
        let ctx = CallContext::background().with_cancellation(token);

        let mut polled = false;
        let result = ctx.run(async { polled = true }).await;
        assert_eq!(result, Err(ContextError::Canceled));
        assert!(!polled);
    }

    #[tokio::test(start_paused = true)]
    async fn run_times_out_pending_future() {
        let ctx = CallContext::with_timeout(Duration::from_secs(2));
        let result = ctx.run(pending::<()>()).await;
        assert_eq!(result, Err(ContextError::Timeout));
    }

    #[tokio::test]
    async fn run_stops_when_token_fires() {
        let token = CancellationToken::new();
        let ctx = CallContext::background().with_cancellation(token.clone());
        let canceller = tokio::spawn(async move { token.cancel() });

        let result = ctx.run(pending::<()>()).await;
        canceller.await.unwrap();
        assert_eq!(result, Err(ContextError::Canceled));
    }

    #[tokio::test]
    async fn run_returns_output_of_completed_future() {
        let ctx = CallContext::with_timeout(Duration::from_secs(30));
        assert_eq!(ctx.run(async { 7 }).await, Ok(7));
    }
}
