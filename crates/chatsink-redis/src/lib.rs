//! Redis stream sink adapter.
//!
//! Implements the `chatsink-core` UpdateSink port over Redis streams: each
//! canonical update becomes one `XADD updates:{stream_key} * data <json>`.

use async_trait::async_trait;

use redis::{aio::ConnectionManager, AsyncCommands};
use tracing::info;

use chatsink_core::{canonical::CanonicalUpdate, errors::Error, sink::UpdateSink, Result};

/// Publish sink backed by one Redis connection per worker process.
///
/// `ConnectionManager` multiplexes and reconnects under the hood; cloning it
/// per call is the intended usage and keeps `publish` at `&self`.
#[derive(Clone)]
pub struct RedisSink {
    conn: ConnectionManager,
}

impl std::fmt::Debug for RedisSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisSink").finish_non_exhaustive()
    }
}

impl RedisSink {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| Error::Config(format!("invalid redis url {url}: {e}")))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| Error::Publish(format!("failed to connect to redis at {url}: {e}")))?;
        info!(%url, "connected to redis");
        Ok(Self { conn })
    }
}

#[async_trait]
impl UpdateSink for RedisSink {
    async fn publish(&self, stream: &str, update: &CanonicalUpdate) -> Result<()> {
        let payload = update.to_json()?;
        let mut conn = self.conn.clone();
        let _id: String = conn
            .xadd(stream, "*", &[("data", payload.as_str())])
            .await
            .map_err(|e| Error::Publish(format!("xadd to {stream} failed: {e}")))?;
        Ok(())
    }
}
