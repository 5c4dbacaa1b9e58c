use crate::config::PlatformKind;

/// Core error type.
///
/// Adapter crates map their specific errors into this type so the
/// orchestration layer can handle failures consistently (startup-fatal vs
/// worker-fatal).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("unsupported platform \"{platform}\" (known platforms: {})", .known.join(", "))]
    UnsupportedPlatform {
        platform: String,
        known: Vec<String>,
    },

    #[error("platform {0} is not implemented")]
    Unimplemented(PlatformKind),

    #[error("platform client error: {0}")]
    Platform(String),

    #[error("publish error: {0}")]
    Publish(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
