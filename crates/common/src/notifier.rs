use async_trait::async_trait;

use crate::Result;

/// Delivers a one-shot message to an alarm owner.
///
/// `TelegramNotifier` implements this for the `telegram` platform. A failed
/// send is reported as `Error::Notification` and is never retried by the
/// caller.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: i64, text: &str) -> Result<()>;
}
