use crate::constants::{DEFAULT_KIRO_VERSION, DEFAULT_LOW_BALANCE_THRESHOLD};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    #[serde(default = "default_low_balance_threshold")]
    pub low_balance_threshold: f64,
    #[serde(default = "default_kiro_version")]
    pub kiro_version: String,
}

fn default_low_balance_threshold() -> f64 {
    DEFAULT_LOW_BALANCE_THRESHOLD
}

fn default_kiro_version() -> String {
    DEFAULT_KIRO_VERSION.to_string()
}

impl AppSettings {
    pub fn new() -> Self {
        Self {
            low_balance_threshold: default_low_balance_threshold(),
            kiro_version: default_kiro_version(),
        }
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        Self::new()
    }
}
