use super::print_json;
use crate::error::AppResult;
use crate::models::AppSettings;
use crate::modules::IdentityService;

pub fn show(service: &IdentityService, json: bool) -> AppResult<()> {
    let settings = service.settings()?;
    if json {
        return print_json(&settings);
    }
    println!("lowBalanceThreshold = {}", settings.low_balance_threshold);
    println!("kiroVersion         = {}", settings.kiro_version);
    Ok(())
}

fn apply_changes(
    mut settings: AppSettings,
    low_balance_threshold: Option<f64>,
    kiro_version: Option<String>,
) -> AppSettings {
    if let Some(threshold) = low_balance_threshold {
        settings.low_balance_threshold = threshold;
    }
    if let Some(version) = kiro_version {
        settings.kiro_version = version.trim().to_string();
    }
    settings
}

pub fn set(
    service: &IdentityService,
    low_balance_threshold: Option<f64>,
    kiro_version: Option<String>,
    json: bool,
) -> AppResult<()> {
    let updated = apply_changes(service.settings()?, low_balance_threshold, kiro_version);
    service.save_settings(&updated)?;
    if json {
        return print_json(&updated);
    }
    println!("Settings saved");
    Ok(())
}
