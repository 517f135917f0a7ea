//! Session state-machine configuration.

use super::defaults::default_disconnect_grace_secs;
use serde::{Deserialize, Serialize};

/// Timing for the `SessionManager` disconnect-grace timer (`SPEC_FULL.md` §4.8).
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionConfig {
    /// Seconds a `Disconnected` session is held before transitioning to `Offline`.
    #[serde(default = "default_disconnect_grace_secs")]
    pub disconnect_grace_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            disconnect_grace_secs: default_disconnect_grace_secs(),
        }
    }
}
