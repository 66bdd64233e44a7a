use std::time::Duration;

use serde::{
    Deserialize,
    Serialize,
};

fn bool_true() -> bool {
    true
}
fn bool_false() -> bool {
    false
}

fn default_u64<const V: u64>() -> u64 {
    V
}

fn default_stale_label() -> String {
    "<stale>".to_string()
}

/// Refresh cadences and feature toggles of the radar.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct RadarSettings {
    #[serde(default = "default_u64::<1000>")]
    pub discovery_interval_ms: u64,

    #[serde(default = "default_u64::<5000>")]
    pub validation_interval_ms: u64,

    #[serde(default = "default_u64::<30000>")]
    pub gear_refresh_interval_ms: u64,

    /// Time without a position update after which an erroneous entity is labeled as stale
    #[serde(default = "default_u64::<1500>")]
    pub stale_after_ms: u64,

    /// Resolve the full skeleton of observed players
    #[serde(default = "bool_true")]
    pub skeleton: bool,

    /// Resolve the full skeleton of the local player
    #[serde(default = "bool_false")]
    pub local_skeleton: bool,

    #[serde(default = "bool_true")]
    pub gear: bool,

    #[serde(default = "default_stale_label")]
    pub stale_label: String,
}

impl Default for RadarSettings {
    fn default() -> Self {
        Self {
            discovery_interval_ms: default_u64::<1000>(),
            validation_interval_ms: default_u64::<5000>(),
            gear_refresh_interval_ms: default_u64::<30000>(),
            stale_after_ms: default_u64::<1500>(),
            skeleton: bool_true(),
            local_skeleton: bool_false(),
            gear: bool_true(),
            stale_label: default_stale_label(),
        }
    }
}

impl RadarSettings {
    pub fn discovery_interval(&self) -> Duration {
        Duration::from_millis(self.discovery_interval_ms)
    }

    pub fn validation_interval(&self) -> Duration {
        Duration::from_millis(self.validation_interval_ms)
    }

    pub fn gear_refresh_interval(&self) -> Duration {
        Duration::from_millis(self.gear_refresh_interval_ms)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_millis(self.stale_after_ms)
    }
}
