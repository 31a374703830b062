use std::time::Duration;

use serde::{Deserialize, Serialize};

/// `modules.book_owners` section.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BookOwnersConfig {
    /// Base URL of the upstream service; `/api/v1/bookowners` is appended.
    pub base_url: String,
    /// Opt-in per-request timeout. Unset keeps the transport default.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
}

impl BookOwnersConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}
