//! The one place where the scheduler hands work to a notifier.
//!
//! Notifiers do their own network I/O and may be slow, fail, or panic. Each
//! delivery runs to completion in its own short-lived task, which is awaited
//! and then discarded. The caller therefore observes exactly one outcome per
//! attempt before it moves on, and a misbehaving notifier cannot unwind into
//! the tick that invoked it.

use std::sync::Arc;

use tracing::debug;

use common::{Error, Notifier, Result};

/// Deliver `text` to `recipient` and wait for the attempt to finish.
pub async fn deliver(notifier: Arc<dyn Notifier>, recipient: i64, text: String) -> Result<()> {
    debug!(recipient, "Starting notification delivery");
    let task = tokio::spawn(async move { notifier.send(recipient, &text).await });

    match task.await {
        Ok(outcome) => outcome,
        Err(e) if e.is_panic() => Err(Error::Notification("notifier panicked".into())),
        Err(e) => Err(Error::Notification(format!("delivery task aborted: {e}"))),
    }
}
