use super::token::{wire_timestamp, wire_timestamp_opt};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-level view of one backup directory.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupEntry {
    pub name: String,
    #[serde(with = "wire_timestamp_opt")]
    pub created_at: Option<DateTime<Utc>>,
    pub has_token: bool,
    pub has_machine_id: bool,
    pub has_usage_cache: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineIdRecord {
    pub machine_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupInfo {
    #[serde(with = "wire_timestamp")]
    pub created_at: DateTime<Utc>,
}

/// One row of the user-facing backup listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupItem {
    pub name: String,
    pub backup_time: String,
    pub has_token: bool,
    pub has_machine_id: bool,
    pub machine_id: String,
    pub provider: String,
    pub is_current: bool,
    pub is_original_machine: bool,
    pub is_token_expired: bool,
    pub subscription_title: String,
    pub usage_limit: f64,
    pub current_usage: f64,
    pub balance: f64,
    pub is_low_balance: bool,
    pub cached_at: String,
}

/// Result of switching or reverting identities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchOutcome {
    pub backup: Option<String>,
    pub processes_killed: usize,
}

/// Result of moving to a freshly generated machine identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMachineOutcome {
    pub machine_id: String,
    pub processes_killed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideStatus {
    pub custom_machine_id: Option<String>,
    pub active: bool,
    pub raw_machine_id: Option<String>,
}
