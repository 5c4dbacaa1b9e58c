//! Provider factory: maps a platform name to a provider variant.
//!
//! Lives in the binary crate because it is the one place that sees both the
//! core port and the adapter crates implementing it.

use std::sync::Arc;

use chatsink_core::{
    config::PlatformKind,
    provider::{Provider, StubProvider},
    sink::UpdateSink,
    Result,
};
use chatsink_telegram::TelegramProvider;

/// Build a provider from a platform name (case-insensitive).
///
/// Unknown names fail here, at construction time, so configuration errors
/// surface before any provider starts.
pub fn create(
    platform: &str,
    stream_key: &str,
    token: &str,
    sink: Arc<dyn UpdateSink>,
) -> Result<Arc<dyn Provider>> {
    create_for(platform.parse()?, stream_key, token, sink)
}

pub fn create_for(
    platform: PlatformKind,
    stream_key: &str,
    token: &str,
    sink: Arc<dyn UpdateSink>,
) -> Result<Arc<dyn Provider>> {
    match platform {
        PlatformKind::Telegram => Ok(Arc::new(TelegramProvider::new(stream_key, token, sink)?)),
        // Stubs construct fine and fail on first use (hard configuration
        // error for these platforms today).
        PlatformKind::TamTam | PlatformKind::Max => {
            Ok(Arc::new(StubProvider::new(platform, stream_key)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use chatsink_core::{canonical::CanonicalUpdate, Error};

    struct NullSink;

    #[async_trait]
    impl UpdateSink for NullSink {
        async fn publish(&self, _stream: &str, _update: &CanonicalUpdate) -> Result<()> {
            Ok(())
        }
    }

    fn sink() -> Arc<dyn UpdateSink> {
        Arc::new(NullSink)
    }

    #[test]
    fn platform_name_matching_is_case_insensitive() {
        let lower = create("telegram", "c1", "T1", sink()).unwrap();
        let upper = create("Telegram", "c1", "T1", sink()).unwrap();

        assert_eq!(lower.platform(), PlatformKind::Telegram);
        assert_eq!(upper.platform(), PlatformKind::Telegram);
        assert_eq!(lower.stream(), "updates:c1");
    }

    #[test]
    fn unknown_platform_fails_at_construction() {
        let err = create("unknown", "c1", "T1", sink()).unwrap_err();
        match err {
            Error::UnsupportedPlatform { platform, known } => {
                assert_eq!(platform, "unknown");
                assert!(known.contains(&"telegram".to_string()));
            }
            other => panic!("expected UnsupportedPlatform, got {other:?}"),
        }
    }

    #[test]
    fn stub_platforms_construct_but_are_marked() {
        let stub = create("max", "c3", "T3", sink()).unwrap();
        assert_eq!(stub.platform(), PlatformKind::Max);
        assert_eq!(stub.stream(), "updates:c3");
    }
}
