use crate::constants::BASELINE_BACKUP_NAME;
use crate::error::{AppError, AppResult};
use crate::models::AppSettings;
use std::fmt;

#[derive(Debug, Clone)]
pub struct ConfigError {
    pub field: String,
    pub message: String,
    pub actual_value: Option<String>,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.actual_value {
            Some(val) => write!(f, "  • {}: {} (got: {})", self.field, self.message, val),
            None => write!(f, "  • {}: {}", self.field, self.message),
        }
    }
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            actual_value: None,
        }
    }

    fn with_value(
        field: impl Into<String>,
        message: impl Into<String>,
        value: impl ToString,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            actual_value: Some(value.to_string()),
        }
    }
}

pub fn validate_settings(settings: &AppSettings) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let threshold = settings.low_balance_threshold;
    if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
        errors.push(ConfigError::with_value(
            "lowBalanceThreshold",
            "must be between 0.0 and 1.0",
            threshold,
        ));
    }

    let version = settings.kiro_version.trim();
    if version.is_empty() {
        errors.push(ConfigError::new("kiroVersion", "must not be empty"));
    } else if version.chars().any(char::is_whitespace) {
        errors.push(ConfigError::with_value(
            "kiroVersion",
            "must not contain whitespace",
            version,
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

pub fn join_config_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Backup names become directory names, so path separators and dot
/// segments are refused along with empty names.
pub fn validate_backup_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::Validation("backup name must not be empty".to_string()));
    }
    if name == "." || name == ".." || name.contains(['/', '\\']) || name.contains('\0') {
        return Err(AppError::Validation(format!(
            "backup name contains invalid characters: {}",
            name
        )));
    }
    Ok(())
}

pub fn is_baseline_name(name: &str) -> bool {
    name == BASELINE_BACKUP_NAME
}
