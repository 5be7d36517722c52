use std::time::Duration;

use futures::Future;
use tokio::time::Timeout;

/// Postfix sugar for `tokio::time::timeout`, so shutdown paths read as
/// `fut.timeout(d).await` instead of nesting.
pub trait FutureTimeout: Future {
    #[inline(always)]
    fn timeout(self, duration: Duration) -> Timeout<Self>
    where
        Self: Sized,
    {
        tokio::time::timeout(duration, self)
    }
}

impl<F: Future> FutureTimeout for F {}
