pub const BASELINE_BACKUP_NAME: &str = "original";

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_KIRO_VERSION: &str = "0.2.0";
pub const DEFAULT_LOW_BALANCE_THRESHOLD: f64 = 0.2;

pub const HTTP_TIMEOUT_SECS: u64 = 15;

pub const TOKEN_FILE: &str = "kiro-auth-token.json";
pub const MACHINE_ID_FILE: &str = "machine-id.json";
pub const USAGE_CACHE_FILE: &str = "usage-cache.json";
pub const BACKUP_INFO_FILE: &str = "backup-info.json";

/// Wire format for every timestamp crossing a boundary, e.g. `2025-01-15T10:30:00.000Z`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

fn region_or_default(region: Option<&str>) -> &str {
    match region {
        Some(r) if !r.trim().is_empty() => r.trim(),
        _ => DEFAULT_REGION,
    }
}

pub fn social_refresh_url(region: Option<&str>) -> String {
    format!(
        "https://prod.{}.auth.desktop.kiro.dev/refreshToken",
        region_or_default(region)
    )
}

pub fn idc_token_url(region: Option<&str>) -> String {
    format!("https://oidc.{}.amazonaws.com/token", region_or_default(region))
}

pub fn usage_limits_url(region: Option<&str>) -> String {
    format!(
        "https://codewhisperer.{}.amazonaws.com/getUsageLimits",
        region_or_default(region)
    )
}

pub fn user_agent(kiro_version: &str, hashed_machine_id: &str) -> String {
    format!("KiroIDE-{}-{}", kiro_version, hashed_machine_id)
}
