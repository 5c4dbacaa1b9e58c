use async_trait::async_trait;

use crate::{canonical::CanonicalUpdate, Result};

/// Port for the external append-only stream store.
///
/// One sink connection per worker process, shared by that worker's providers.
/// Concurrency within a worker is strictly cooperative, so the sink needs no
/// additional locking beyond what its own client does.
#[async_trait]
pub trait UpdateSink: Send + Sync {
    /// Append one record to the named stream.
    async fn publish(&self, stream: &str, update: &CanonicalUpdate) -> Result<()>;
}
