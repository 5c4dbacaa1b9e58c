use std::{env, fmt, fs, str::FromStr, time::Duration};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Deserialize;

use crate::{errors::Error, Result};

const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
const DEFAULT_GRACE_SECS: u64 = 5;

/// Chat platform a bot account belongs to.
///
/// Closed set: adding a platform means adding a provider variant to the
/// factory, so unknown names are rejected at parse time rather than when the
/// account first starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlatformKind {
    Telegram,
    TamTam,
    Max,
}

impl PlatformKind {
    pub const KNOWN: [&'static str; 3] = ["telegram", "tamtam", "max"];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformKind::Telegram => "telegram",
            PlatformKind::TamTam => "tamtam",
            PlatformKind::Max => "max",
        }
    }
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlatformKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "telegram" => Ok(PlatformKind::Telegram),
            "tamtam" => Ok(PlatformKind::TamTam),
            "max" => Ok(PlatformKind::Max),
            _ => Err(Error::UnsupportedPlatform {
                platform: s.to_string(),
                known: Self::KNOWN.iter().map(|k| k.to_string()).collect(),
            }),
        }
    }
}

/// One configured bot account. Immutable once loaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountConfig {
    /// Destination identifier; the provider publishes to `updates:{stream_key}`.
    pub stream_key: String,
    pub platform: PlatformKind,
    /// Opaque platform credential.
    pub token: String,
}

/// Resolved runtime settings for the whole fleet.
#[derive(Clone, Debug)]
pub struct Settings {
    pub accounts: Vec<AccountConfig>,
    pub redis_url: String,
    /// Requested worker count; the distributor caps it at the account count.
    pub workers: usize,
    /// Per-worker grace period during fleet shutdown.
    pub grace: Duration,
}

impl Settings {
    /// Load settings from the environment.
    ///
    /// Account sources, first match wins: `CONFIG_FILE` (JSON file),
    /// `CONFIG_B64` (base64-encoded JSON), `CONFIG` (legacy text form).
    pub fn load() -> Result<Self> {
        let accounts = load_accounts_from_env()?;

        let redis_url = env_str("REDIS_URL")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_REDIS_URL.to_string());

        let workers = match env_str("WORKERS").and_then(non_empty) {
            Some(raw) => {
                let workers = raw.trim().parse::<usize>().map_err(|_| {
                    Error::Config(format!("WORKERS must be a positive integer, got {raw:?}"))
                })?;
                if workers == 0 {
                    return Err(Error::Config(
                        "WORKERS must be at least 1".to_string(),
                    ));
                }
                workers
            }
            None => 1,
        };

        let grace = Duration::from_secs(
            env_str("SHUTDOWN_GRACE_SECS")
                .and_then(|s| s.trim().parse::<u64>().ok())
                .unwrap_or(DEFAULT_GRACE_SECS),
        );

        Ok(Self {
            accounts,
            redis_url,
            workers,
            grace,
        })
    }
}

fn load_accounts_from_env() -> Result<Vec<AccountConfig>> {
    if let Some(path) = env_str("CONFIG_FILE").and_then(non_empty) {
        let raw = fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("failed to read config file {path}: {e}")))?;
        return parse_structured(&raw);
    }

    if let Some(encoded) = env_str("CONFIG_B64").and_then(non_empty) {
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| Error::Config(format!("CONFIG_B64 is not valid base64: {e}")))?;
        let raw = String::from_utf8(bytes)
            .map_err(|e| Error::Config(format!("CONFIG_B64 is not valid UTF-8: {e}")))?;
        return parse_structured(&raw);
    }

    if let Some(raw) = env_str("CONFIG").and_then(non_empty) {
        return parse_legacy(&raw);
    }

    Err(Error::Config(
        "no bot configuration provided: set CONFIG_FILE, CONFIG_B64, or CONFIG".to_string(),
    ))
}

#[derive(Deserialize)]
struct BotsFile {
    bots: Vec<BotEntry>,
}

#[derive(Deserialize)]
struct BotEntry {
    app: String,
    platform: String,
    token: String,
}

/// Parse the structured JSON form: `{"bots": [{"app", "platform", "token"}]}`.
pub fn parse_structured(raw: &str) -> Result<Vec<AccountConfig>> {
    let file: BotsFile = serde_json::from_str(raw)
        .map_err(|e| Error::Config(format!("invalid bots config: {e}")))?;

    let mut accounts = Vec::with_capacity(file.bots.len());
    for entry in file.bots {
        accounts.push(build_account(&entry.app, &entry.platform, &entry.token)?);
    }
    validate(accounts)
}

/// Parse the legacy text form: `streamKey:platform:token` entries joined by
/// `", "`.
pub fn parse_legacy(raw: &str) -> Result<Vec<AccountConfig>> {
    let mut accounts = Vec::new();
    for entry in raw.split(", ") {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        // Split on the first two ':' only; Telegram tokens contain ':'.
        let mut parts = entry.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(stream_key), Some(platform), Some(token)) => {
                accounts.push(build_account(stream_key, platform, token)?);
            }
            _ => {
                return Err(Error::Config(format!(
                    "invalid config entry {entry:?}: expected streamKey:platform:token"
                )));
            }
        }
    }
    validate(accounts)
}

fn build_account(stream_key: &str, platform: &str, token: &str) -> Result<AccountConfig> {
    let stream_key = stream_key.trim();
    let token = token.trim();
    if stream_key.is_empty() {
        return Err(Error::Config("bot entry has an empty stream key".to_string()));
    }
    if token.is_empty() {
        return Err(Error::Config(format!(
            "bot entry {stream_key:?} has an empty token"
        )));
    }
    Ok(AccountConfig {
        stream_key: stream_key.to_string(),
        platform: platform.parse()?,
        token: token.to_string(),
    })
}

/// Two providers on the same stream key would race writes to one destination
/// stream, so duplicates are rejected up front.
fn validate(accounts: Vec<AccountConfig>) -> Result<Vec<AccountConfig>> {
    if accounts.is_empty() {
        return Err(Error::Config("bots list is empty".to_string()));
    }
    let mut seen = std::collections::HashSet::new();
    for account in &accounts {
        if !seen.insert(account.stream_key.as_str()) {
            return Err(Error::Config(format!(
                "duplicate stream key {:?}",
                account.stream_key
            )));
        }
    }
    Ok(accounts)
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
