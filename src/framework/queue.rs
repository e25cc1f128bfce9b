//! Boundary to the queue backend used for deferred actions.

use crate::model::Action;
use async_trait::async_trait;

/// A backend able to run actions later.
#[async_trait]
pub trait Queue: Send + Sync {
    /// Schedules `action`. `timestamp` is in epoch milliseconds; `None` means
    /// as soon as possible. Returns `false` when the backend refused it.
    async fn enqueue(&self, action: Action, timestamp: Option<i64>) -> bool;
}
