use crate::error::{AppError, AppResult};
use std::fs;
use std::path::{Path, PathBuf};

const DATA_DIR: &str = ".kiro-switch";
const KIRO_HOME_DIR: &str = ".kiro";

fn ensure_dir(path: &Path) -> AppResult<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

fn env_dir(key: &str) -> Option<PathBuf> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}

pub fn get_data_dir() -> AppResult<PathBuf> {
    if let Some(data_dir) = env_dir("KIRO_SWITCH_DATA_DIR") {
        ensure_dir(&data_dir)?;
        return Ok(data_dir);
    }
    if cfg!(test) {
        let data_dir =
            std::env::temp_dir().join(format!(".kiro-switch-test-{}", std::process::id()));
        ensure_dir(&data_dir)?;
        return Ok(data_dir);
    }

    if let Some(home) = dirs::home_dir() {
        let data_dir = home.join(DATA_DIR);
        if ensure_dir(&data_dir).is_ok() {
            return Ok(data_dir);
        }
    }
    let fallback_dir = std::env::temp_dir().join(DATA_DIR);
    ensure_dir(&fallback_dir)?;
    Ok(fallback_dir)
}

pub fn get_backups_dir() -> AppResult<PathBuf> {
    let backups_dir = get_data_dir()?.join("backups");
    ensure_dir(&backups_dir)?;
    Ok(backups_dir)
}

/// Directory where Kiro keeps its live credential (`~/.aws/sso/cache`).
pub fn get_sso_cache_dir() -> AppResult<PathBuf> {
    if let Some(dir) = env_dir("KIRO_SSO_CACHE_DIR") {
        return Ok(dir);
    }
    let home = dirs::home_dir()
        .ok_or_else(|| AppError::Config("failed_to_get_home_dir".to_string()))?;
    Ok(home.join(".aws").join("sso").join("cache"))
}

/// Kiro's per-user directory, home of the custom machine id override.
pub fn get_kiro_home_dir() -> AppResult<PathBuf> {
    if let Some(dir) = env_dir("KIRO_HOME") {
        return Ok(dir);
    }
    let home = dirs::home_dir()
        .ok_or_else(|| AppError::Config("failed_to_get_home_dir".to_string()))?;
    Ok(home.join(KIRO_HOME_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{lock_env, unique_temp_dir, ScopedEnvVar};

    #[test]
    fn data_dir_honours_env_override() {
        let _guard = lock_env();
        let root = unique_temp_dir("kiro-switch-paths");
        let target = root.join("nested").join("data");
        let _env = ScopedEnvVar::set("KIRO_SWITCH_DATA_DIR", target.to_str().unwrap());

        let resolved = get_data_dir().expect("data dir");
        assert_eq!(resolved, target);
        assert!(target.is_dir());
        assert!(get_backups_dir().expect("backups dir").ends_with("backups"));
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let _guard = lock_env();
        let _env = ScopedEnvVar::set("KIRO_SSO_CACHE_DIR", "   ");
        if let Ok(dir) = get_sso_cache_dir() {
            assert!(dir.ends_with("cache"));
        }
    }
}
