use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Normalized, platform-agnostic representation of one inbound chat message.
///
/// Built by a provider from a platform-native message, published to the sink
/// as a flat JSON object, then discarded. Never mutated after construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CanonicalUpdate {
    /// Platform-namespaced sender id, e.g. `tg_42`.
    pub user_id: String,
    pub text: String,
    /// Origin-platform send time (serialized as ISO 8601).
    pub sent_at: DateTime<Utc>,
}

impl CanonicalUpdate {
    pub fn new(
        user_id: impl Into<String>,
        text: impl Into<String>,
        sent_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            text: text.into(),
            sent_at,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
