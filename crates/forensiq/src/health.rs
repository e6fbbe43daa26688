use crate::client::{ApiError, ForensiqClient};
use crate::context::CallContext;
use crate::transport::Transport;

/// Liveness probe for a service behind a client.
///
/// [`ForensiqClient`] answers it with `GET /ready` under a context that never
/// expires, so callers that only care about up/down need no [`CallContext`].
pub trait HealthCheck: Send + Sync {
    /// `Ok(false)` means the service answered but isn't ready; errors are
    /// whatever the underlying request failed with.
    fn is_healthy(&self) -> impl std::future::Future<Output = Result<bool, ApiError>> + Send;
}

impl<T: Transport> HealthCheck for ForensiqClient<T> {
    async fn is_healthy(&self) -> Result<bool, ApiError> {
        self.ready(&CallContext::background()).await
    }
}
