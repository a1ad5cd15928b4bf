use crate::error::{AppError, AppResult};
use crate::models::AppSettings;
use crate::modules::system::{logger, validation};
use crate::utils::files;
use std::fs;
use std::path::{Path, PathBuf};

const SETTINGS_FILE: &str = "settings.json";

/// Settings file reader. Every `load` goes back to disk so a threshold
/// changed by another process is picked up on the next operation.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(SETTINGS_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> AppResult<AppSettings> {
        if !self.path.exists() {
            let settings = AppSettings::new();
            if let Err(e) = self.write(&settings) {
                logger::log_warn(&format!("Failed to create default settings file: {}", e));
            }
            return Ok(settings);
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|e| AppError::Config(format!("failed_to_read_settings_file: {}", e)))?;
        if content.trim().is_empty() {
            logger::log_warn("Settings file is empty, using defaults");
            return Ok(AppSettings::new());
        }

        serde_json::from_str(&content)
            .map_err(|e| AppError::Config(format!("failed_to_parse_settings_file: {}", e)))
    }

    /// Threshold used for low-balance evaluation. A broken settings file
    /// falls back to the default instead of failing the caller.
    pub fn low_balance_threshold(&self) -> f64 {
        match self.load() {
            Ok(settings) if validation::validate_settings(&settings).is_ok() => {
                settings.low_balance_threshold
            }
            Ok(_) => {
                logger::log_warn("Stored low balance threshold is invalid, using default");
                AppSettings::default().low_balance_threshold
            }
            Err(e) => {
                logger::log_warn(&format!("{}, using default threshold", e));
                AppSettings::default().low_balance_threshold
            }
        }
    }

    /// Version string reported to the remote endpoints.
    pub fn kiro_version(&self) -> String {
        match self.load() {
            Ok(settings) if !settings.kiro_version.trim().is_empty() => settings.kiro_version,
            _ => AppSettings::default().kiro_version,
        }
    }

    pub fn save(&self, settings: &AppSettings) -> AppResult<()> {
        validation::validate_settings(settings).map_err(|errors| {
            AppError::Validation(format!(
                "settings_validation_failed:\n{}",
                validation::join_config_errors(&errors)
            ))
        })?;
        self.write(settings)?;
        logger::log_info(&format!(
            "Settings saved (low balance threshold: {})",
            settings.low_balance_threshold
        ));
        Ok(())
    }

    fn write(&self, settings: &AppSettings) -> AppResult<()> {
        files::write_json_atomic(&self.path, settings)
            .map_err(|e| AppError::Config(format!("failed_to_save_settings: {}", e)))
    }
}
