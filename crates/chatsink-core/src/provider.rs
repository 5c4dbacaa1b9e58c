use async_trait::async_trait;

use crate::{config::PlatformKind, errors::Error, Result};

/// Destination stream for one account.
pub fn stream_name(stream_key: &str) -> String {
    format!("updates:{stream_key}")
}

/// Port binding one platform account's receive loop to the publish sink.
///
/// One provider per account, never shared. `start()` runs the platform
/// client's receive loop to completion: it suspends for as long as the
/// account is live and returns only after a stop request or an unrecoverable
/// error. Publish failures are not retried here; they terminate the loop and
/// surface as the `start()` error.
#[async_trait]
pub trait Provider: Send + Sync + std::fmt::Debug {
    fn platform(&self) -> PlatformKind;

    /// Destination stream, derived once as `updates:{stream_key}`.
    fn stream(&self) -> &str;

    async fn start(&self) -> Result<()>;

    /// Request the platform client to shut down. Idempotent; in-flight
    /// publishes are allowed to complete.
    async fn stop(&self) -> Result<()>;
}

/// Placeholder for platforms that are configured but not implemented yet.
///
/// Constructs fine (configuration errors for unknown names surface earlier,
/// at the factory) and fails on first use, so a misconfigured account takes
/// its worker down instead of silently succeeding.
#[derive(Debug)]
pub struct StubProvider {
    platform: PlatformKind,
    stream: String,
}

impl StubProvider {
    pub fn new(platform: PlatformKind, stream_key: &str) -> Self {
        Self {
            platform,
            stream: stream_name(stream_key),
        }
    }
}

#[async_trait]
impl Provider for StubProvider {
    fn platform(&self) -> PlatformKind {
        self.platform
    }

    fn stream(&self) -> &str {
        &self.stream
    }

    async fn start(&self) -> Result<()> {
        Err(Error::Unimplemented(self.platform))
    }

    async fn stop(&self) -> Result<()> {
        Err(Error::Unimplemented(self.platform))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_stream_name_from_key() {
        assert_eq!(stream_name("c1"), "updates:c1");
    }

    #[tokio::test]
    async fn stub_provider_fails_on_start_and_stop() {
        let stub = StubProvider::new(PlatformKind::Max, "c1");
        assert_eq!(stub.stream(), "updates:c1");

        let err = stub.start().await.unwrap_err();
        assert!(matches!(err, Error::Unimplemented(PlatformKind::Max)), "got {err:?}");

        let err = stub.stop().await.unwrap_err();
        assert!(matches!(err, Error::Unimplemented(PlatformKind::Max)), "got {err:?}");
    }
}
