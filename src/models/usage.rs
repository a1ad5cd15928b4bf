use super::token::{format_timestamp, wire_timestamp};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Figures returned by the usage API for one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageReading {
    pub subscription_title: String,
    pub usage_limit: f64,
    pub current_usage: f64,
    pub balance: f64,
}

/// Durable per-backup cache. `is_low_balance` is deliberately absent: it
/// depends on the live threshold and is derived at read time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSnapshot {
    pub subscription_title: String,
    pub usage_limit: f64,
    pub current_usage: f64,
    pub balance: f64,
    #[serde(with = "wire_timestamp")]
    pub cached_at: DateTime<Utc>,
}

impl UsageSnapshot {
    pub fn from_reading(reading: UsageReading, cached_at: DateTime<Utc>) -> Self {
        Self {
            subscription_title: reading.subscription_title,
            usage_limit: reading.usage_limit,
            current_usage: reading.current_usage,
            balance: reading.balance,
            cached_at,
        }
    }
}

pub fn is_low_balance(balance: f64, usage_limit: f64, threshold: f64) -> bool {
    if usage_limit <= 0.0 {
        return false;
    }
    balance / usage_limit < threshold
}

/// A usage snapshot as presented to callers, low-balance flag evaluated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageView {
    pub subscription_title: String,
    pub usage_limit: f64,
    pub current_usage: f64,
    pub balance: f64,
    pub is_low_balance: bool,
    pub cached_at: Option<String>,
}

impl UsageView {
    pub fn from_snapshot(snapshot: &UsageSnapshot, threshold: f64) -> Self {
        Self {
            subscription_title: snapshot.subscription_title.clone(),
            usage_limit: snapshot.usage_limit,
            current_usage: snapshot.current_usage,
            balance: snapshot.balance,
            is_low_balance: is_low_balance(snapshot.balance, snapshot.usage_limit, threshold),
            cached_at: Some(format_timestamp(snapshot.cached_at)),
        }
    }

    pub fn from_reading(reading: &UsageReading, threshold: f64) -> Self {
        Self {
            subscription_title: reading.subscription_title.clone(),
            usage_limit: reading.usage_limit,
            current_usage: reading.current_usage,
            balance: reading.balance,
            is_low_balance: is_low_balance(reading.balance, reading.usage_limit, threshold),
            cached_at: None,
        }
    }
}

/// Outcome of a successful usage refresh for one backup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRefresh {
    pub subscription_title: String,
    pub usage_limit: f64,
    pub current_usage: f64,
    pub balance: f64,
    pub is_low_balance: bool,
    pub is_token_expired: bool,
    pub cached_at: String,
    /// True when the stored token had expired and was rotated on the way.
    pub token_refreshed: bool,
}
