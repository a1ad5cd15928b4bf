use crate::constants::{
    BACKUP_INFO_FILE, BASELINE_BACKUP_NAME, MACHINE_ID_FILE, TOKEN_FILE, USAGE_CACHE_FILE,
};
use crate::error::{AppError, AppResult};
use crate::models::token::format_timestamp;
use crate::models::{
    BackupEntry, BackupInfo, IdcCredentials, KiroToken, MachineIdRecord, UsageReading,
    UsageSnapshot,
};
use crate::modules::system::{logger, paths, validation};
use crate::utils::files::{write_bytes_atomic, write_json_atomic};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

fn idc_credentials_file(client_id_hash: &str) -> String {
    format!("{}.json", client_id_hash)
}

/// Snapshot store under `<data dir>/backups/<name>/`.
pub struct BackupStore {
    backups_dir: PathBuf,
    sso_cache_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl BackupStore {
    pub fn new(backups_dir: PathBuf, sso_cache_dir: PathBuf) -> Self {
        Self {
            backups_dir,
            sso_cache_dir,
            write_lock: Mutex::new(()),
        }
    }

    pub fn from_environment() -> AppResult<Self> {
        Ok(Self::new(
            paths::get_backups_dir()?,
            paths::get_sso_cache_dir()?,
        ))
    }

    pub fn backups_dir(&self) -> &Path {
        &self.backups_dir
    }

    /// Where Kiro reads its active credential.
    pub fn live_token_path(&self) -> PathBuf {
        self.sso_cache_dir.join(TOKEN_FILE)
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn backup_dir(&self, name: &str) -> PathBuf {
        self.backups_dir.join(name)
    }

    /// Validated path of a backup that must already exist.
    fn existing_dir(&self, name: &str) -> AppResult<PathBuf> {
        validation::validate_backup_name(name)?;
        let dir = self.backup_dir(name);
        if !dir.is_dir() {
            return Err(AppError::NotFound(name.to_string()));
        }
        Ok(dir)
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str, file: &str) -> AppResult<T> {
        let path = self.existing_dir(name)?.join(file);
        if !path.exists() {
            return Err(AppError::Read(format!("backup '{}' has no {}", name, file)));
        }
        let content = fs::read_to_string(&path)
            .map_err(|e| AppError::Read(format!("failed_to_read {}/{}: {}", name, file, e)))?;
        serde_json::from_str(&content)
            .map_err(|e| AppError::Read(format!("failed_to_parse {}/{}: {}", name, file, e)))
    }

    pub fn exists(&self, name: &str) -> bool {
        validation::validate_backup_name(name).is_ok() && self.backup_dir(name).is_dir()
    }

    /// Every backup, baseline included, sorted by name.
    pub fn list(&self) -> AppResult<Vec<BackupEntry>> {
        if !self.backups_dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.backups_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                logger::log_warn("Skipping backup directory with a non UTF-8 name");
                continue;
            };
            let dir = entry.path();
            entries.push(BackupEntry {
                created_at: self.created_at(&name, &dir),
                has_token: dir.join(TOKEN_FILE).exists(),
                has_machine_id: dir.join(MACHINE_ID_FILE).exists(),
                has_usage_cache: dir.join(USAGE_CACHE_FILE).exists(),
                name,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn created_at(&self, name: &str, dir: &Path) -> Option<DateTime<Utc>> {
        match self.read_json::<BackupInfo>(name, BACKUP_INFO_FILE) {
            Ok(info) => Some(info.created_at),
            Err(_) => fs::metadata(dir)
                .and_then(|m| m.modified())
                .ok()
                .map(DateTime::<Utc>::from),
        }
    }

    /// Snapshots the live credential (and its IdC client registration, when
    /// the token references one) together with `machine_id`.
    pub fn create(&self, name: &str, machine_id: &str) -> AppResult<BackupEntry> {
        validation::validate_backup_name(name)?;
        if validation::is_baseline_name(name) {
            return Err(AppError::Validation(format!(
                "'{}' is reserved for the baseline backup",
                name
            )));
        }

        let _lock = self.lock();
        if self.backup_dir(name).exists() {
            return Err(AppError::Validation(format!("backup '{}' already exists", name)));
        }
        if !self.live_token_path().exists() {
            return Err(AppError::Read(format!(
                "no live credential at {}",
                self.live_token_path().display()
            )));
        }
        self.snapshot(name, machine_id)?;
        logger::log_info(&format!("Backup created: {}", name));
        self.entry(name)
    }

    /// Creates the baseline backup from the raw system id if it is missing.
    /// Returns whether anything was written.
    pub fn ensure_baseline(&self, raw_machine_id: &str) -> AppResult<bool> {
        let _lock = self.lock();
        if self.backup_dir(BASELINE_BACKUP_NAME).is_dir() {
            return Ok(false);
        }
        self.snapshot(BASELINE_BACKUP_NAME, raw_machine_id)?;
        logger::log_info("Baseline backup created");
        Ok(true)
    }

    fn snapshot(&self, name: &str, machine_id: &str) -> AppResult<()> {
        let dir = self.backup_dir(name);
        fs::create_dir_all(&dir)?;

        let result = self.snapshot_into(&dir, machine_id);
        if result.is_err() {
            let _ = fs::remove_dir_all(&dir);
        }
        result
    }

    fn snapshot_into(&self, dir: &Path, machine_id: &str) -> AppResult<()> {
        let now = Utc::now();
        let live_token = self.live_token_path();
        if live_token.exists() {
            let bytes = fs::read(&live_token)?;
            let token: KiroToken = serde_json::from_slice(&bytes).map_err(|e| {
                AppError::Read(format!("live credential is not valid JSON: {}", e))
            })?;
            write_bytes_atomic(&dir.join(TOKEN_FILE), &bytes)?;

            let hash = token.client_id_hash.trim();
            if !hash.is_empty() {
                let file = idc_credentials_file(hash);
                let live_creds = self.sso_cache_dir.join(&file);
                if live_creds.exists() {
                    write_bytes_atomic(&dir.join(&file), &fs::read(&live_creds)?)?;
                } else {
                    logger::log_warn(&format!(
                        "Token references IdC client {} but {} is missing",
                        hash, file
                    ));
                }
            }
        }

        write_json_atomic(
            &dir.join(MACHINE_ID_FILE),
            &MachineIdRecord {
                machine_id: machine_id.to_string(),
                backup_time: Some(format_timestamp(now)),
            },
        )?;
        write_json_atomic(&dir.join(BACKUP_INFO_FILE), &BackupInfo { created_at: now })
    }

    fn entry(&self, name: &str) -> AppResult<BackupEntry> {
        let dir = self.existing_dir(name)?;
        Ok(BackupEntry {
            name: name.to_string(),
            created_at: self.created_at(name, &dir),
            has_token: dir.join(TOKEN_FILE).exists(),
            has_machine_id: dir.join(MACHINE_ID_FILE).exists(),
            has_usage_cache: dir.join(USAGE_CACHE_FILE).exists(),
        })
    }

    pub fn delete(&self, name: &str) -> AppResult<()> {
        validation::validate_backup_name(name)?;
        if validation::is_baseline_name(name) {
            return Err(AppError::Validation(
                "the baseline backup cannot be deleted".to_string(),
            ));
        }
        let _lock = self.lock();
        let dir = self.existing_dir(name)?;
        fs::remove_dir_all(&dir)?;
        logger::log_info(&format!("Backup deleted: {}", name));
        Ok(())
    }

    pub fn read_token(&self, name: &str) -> AppResult<KiroToken> {
        self.read_json(name, TOKEN_FILE)
    }

    /// The credential Kiro is currently using, if any.
    pub fn read_live_token(&self) -> AppResult<Option<KiroToken>> {
        let path = self.live_token_path();
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .map_err(|e| AppError::Read(format!("failed_to_read_live_token: {}", e)))?;
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| AppError::Read(format!("failed_to_parse_live_token: {}", e)))
    }

    /// Replaces the access token and expiry; every other field is kept.
    pub fn write_token(&self, name: &str, access_token: &str, expires_at: &str) -> AppResult<()> {
        let _lock = self.lock();
        let path = self.existing_dir(name)?.join(TOKEN_FILE);
        let content = fs::read_to_string(&path)
            .map_err(|e| AppError::Read(format!("failed_to_read {}/{}: {}", name, TOKEN_FILE, e)))?;
        let mut raw: serde_json::Value = serde_json::from_str(&content)
            .map_err(|e| AppError::Read(format!("failed_to_parse {}/{}: {}", name, TOKEN_FILE, e)))?;
        let object = raw.as_object_mut().ok_or_else(|| {
            AppError::Read(format!("{}/{} is not a JSON object", name, TOKEN_FILE))
        })?;
        object.insert("accessToken".to_string(), access_token.into());
        object.insert("expiresAt".to_string(), expires_at.into());
        write_json_atomic(&path, &raw)
    }

    pub fn read_machine_id(&self, name: &str) -> AppResult<String> {
        let record: MachineIdRecord = self.read_json(name, MACHINE_ID_FILE)?;
        let id = record.machine_id.trim();
        if id.is_empty() {
            return Err(AppError::Read(format!("backup '{}' has an empty machine id", name)));
        }
        Ok(id.to_string())
    }

    /// `Ok(None)` when the backup holds no registration for this client.
    pub fn read_idc_credentials(
        &self,
        name: &str,
        client_id_hash: &str,
    ) -> AppResult<Option<IdcCredentials>> {
        if client_id_hash.is_empty() || client_id_hash.contains(['/', '\\', '.']) {
            return Err(AppError::Read(format!(
                "invalid client id hash: {}",
                client_id_hash
            )));
        }
        let file = idc_credentials_file(client_id_hash);
        if !self.existing_dir(name)?.join(&file).exists() {
            return Ok(None);
        }
        let creds: IdcCredentials = self.read_json(name, &file)?;
        if creds.client_id.trim().is_empty() || creds.client_secret.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(creds))
    }

    pub fn read_usage_cache(&self, name: &str) -> AppResult<Option<UsageSnapshot>> {
        if !self.existing_dir(name)?.join(USAGE_CACHE_FILE).exists() {
            return Ok(None);
        }
        self.read_json(name, USAGE_CACHE_FILE).map(Some)
    }

    /// Persists `reading` stamped with the current time.
    pub fn write_usage_cache(&self, name: &str, reading: &UsageReading) -> AppResult<UsageSnapshot> {
        let _lock = self.lock();
        let path = self.existing_dir(name)?.join(USAGE_CACHE_FILE);
        let snapshot = UsageSnapshot::from_reading(reading.clone(), Utc::now());
        write_json_atomic(&path, &snapshot)?;
        Ok(snapshot)
    }

    /// Makes the stored credential the live one.
    pub fn restore(&self, name: &str) -> AppResult<()> {
        let _lock = self.lock();
        let dir = self.existing_dir(name)?;
        let token_path = dir.join(TOKEN_FILE);
        if !token_path.exists() {
            return Err(AppError::Read(format!("backup '{}' has no {}", name, TOKEN_FILE)));
        }
        let bytes = fs::read(&token_path)?;
        let token: KiroToken = serde_json::from_slice(&bytes)
            .map_err(|e| AppError::Read(format!("failed_to_parse {}/{}: {}", name, TOKEN_FILE, e)))?;

        write_bytes_atomic(&self.live_token_path(), &bytes)?;

        let hash = token.client_id_hash.trim();
        if !hash.is_empty() {
            let file = idc_credentials_file(hash);
            let stored = dir.join(&file);
            if stored.exists() {
                write_bytes_atomic(&self.sso_cache_dir.join(&file), &fs::read(&stored)?)?;
            }
        }
        logger::log_info(&format!("Restored credential from backup: {}", name));
        Ok(())
    }
}
