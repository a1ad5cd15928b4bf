use crate::constants::BASELINE_BACKUP_NAME;
use crate::error::{AppError, AppResult};
use crate::models::token::format_timestamp;
use crate::models::{
    AppSettings, BackupEntry, BackupItem, IdcCredentials, NewMachineOutcome, OverrideStatus,
    SwitchOutcome, UsageRefresh, UsageView,
};
use crate::modules::auth::is_expired;
use crate::modules::context::AppContext;
use crate::modules::persistence::usage_cache::UsageCacheManager;
use crate::modules::system::machine_id::hash_machine_id;
use crate::modules::system::process::ProcessInfo;
use crate::modules::system::{logger, validation};

/// Front door for every user-facing operation: backups, identity switches
/// and usage figures.
pub struct IdentityService {
    ctx: AppContext,
    usage_cache: UsageCacheManager,
}

impl IdentityService {
    pub fn new(ctx: AppContext) -> Self {
        let usage_cache = UsageCacheManager::new(ctx.store.clone(), ctx.settings.clone());
        Self { ctx, usage_cache }
    }

    fn require_backup(&self, name: &str) -> AppResult<()> {
        validation::validate_backup_name(name)?;
        if !self.ctx.store.exists(name) {
            return Err(AppError::NotFound(name.to_string()));
        }
        Ok(())
    }

    /// Fetches fresh usage for a backup, refreshing its token first when it
    /// has expired.
    pub async fn refresh_usage(&self, name: &str) -> AppResult<UsageRefresh> {
        self.require_backup(name)?;

        let machine_id = self.ctx.store.read_machine_id(name)?;
        let mut token = self.ctx.store.read_token(name)?;
        let hashed = hash_machine_id(&machine_id);

        let mut token_refreshed = false;
        if is_expired(&token) {
            let store = self.ctx.store.clone();
            let backup = name.to_string();
            let lookup = move |hash: &str| -> AppResult<Option<IdcCredentials>> {
                store.read_idc_credentials(&backup, hash)
            };
            let refreshed = self.ctx.tokens.refresh(&token, &hashed, &lookup).await?;

            let expires_at = refreshed.expires_at_string();
            self.ctx
                .store
                .write_token(name, &refreshed.access_token, &expires_at)
                .map_err(|e| {
                    logger::log_error(&format!(
                        "[Service] Refreshed token for {} could not be saved: {}",
                        name, e
                    ));
                    AppError::PersistFailed(e.to_string())
                })?;
            token.access_token = refreshed.access_token;
            token.expires_at = expires_at;
            token_refreshed = true;
        }

        let reading = self
            .ctx
            .usage_api
            .fetch_usage(&token, &hashed)
            .await
            .map_err(|e| match e {
                AppError::ApiCallFailed(_) => e,
                other => AppError::ApiCallFailed(other.to_string()),
            })?;
        if reading.subscription_title.trim().is_empty() {
            return Err(AppError::EmptyUsageResponse);
        }

        let view = self.usage_cache.write(name, &reading)?;
        logger::log_info(&format!(
            "[Service] Usage refreshed for {}: {:.2} of {:.2} left",
            name, view.balance, view.usage_limit
        ));
        Ok(UsageRefresh {
            subscription_title: view.subscription_title,
            usage_limit: view.usage_limit,
            current_usage: view.current_usage,
            balance: view.balance,
            is_low_balance: view.is_low_balance,
            is_token_expired: false,
            cached_at: view.cached_at.unwrap_or_default(),
            token_refreshed,
        })
    }

    /// Check, terminate, re-check. Runs on the blocking pool since process
    /// enumeration and the settle delay are synchronous.
    async fn stop_app(&self) -> AppResult<usize> {
        let process = self.ctx.process.clone();
        tokio::task::spawn_blocking(move || -> AppResult<usize> {
            if !process.is_running() {
                return Ok(0);
            }
            let killed = process
                .terminate()
                .map_err(|e| AppError::ProcessTerminationFailed(e.to_string()))?;
            if killed == 0 && process.is_running() {
                return Err(AppError::ProcessTerminationFailed(
                    "Kiro is still running".to_string(),
                ));
            }
            Ok(killed)
        })
        .await
        .map_err(|e| AppError::ProcessTerminationFailed(e.to_string()))?
    }

    /// Makes `name` the live credential. The machine identity is left as is.
    pub async fn switch_identity(&self, name: &str) -> AppResult<SwitchOutcome> {
        self.require_backup(name)?;
        let processes_killed = self.stop_app().await?;
        self.ctx.store.restore(name)?;
        logger::log_info(&format!("[Service] Switched to backup: {}", name));
        Ok(SwitchOutcome {
            backup: Some(name.to_string()),
            processes_killed,
        })
    }

    /// Drops the machine id override and restores the first backup (in
    /// listing order) taken on the raw system id.
    pub async fn restore_baseline_identity(&self) -> AppResult<SwitchOutcome> {
        let processes_killed = self.stop_app().await?;
        self.ctx.resolver.clear_override()?;

        let raw_id = match self.ctx.resolver.raw_machine_id() {
            Ok(id) => id,
            Err(e) => {
                logger::log_warn(&format!(
                    "[Service] Override cleared but system machine id is unavailable: {}",
                    e
                ));
                return Ok(SwitchOutcome {
                    backup: None,
                    processes_killed,
                });
            }
        };

        for entry in self.ctx.store.list()? {
            if !entry.has_token {
                continue;
            }
            match self.ctx.store.read_machine_id(&entry.name) {
                Ok(id) if id == raw_id => {
                    self.ctx.store.restore(&entry.name)?;
                    logger::log_info(&format!(
                        "[Service] Restored baseline identity from backup: {}",
                        entry.name
                    ));
                    return Ok(SwitchOutcome {
                        backup: Some(entry.name),
                        processes_killed,
                    });
                }
                Ok(_) => {}
                Err(e) => tracing::debug!("Skipping backup {}: {}", entry.name, e),
            }
        }

        logger::log_info("[Service] Override cleared, no backup matches the system machine id");
        Ok(SwitchOutcome {
            backup: None,
            processes_killed,
        })
    }

    /// Closes Kiro and activates a freshly generated machine id override.
    /// The live credential is left in place.
    pub async fn new_machine_identity(&self) -> AppResult<NewMachineOutcome> {
        let processes_killed = self.stop_app().await?;
        let machine_id = uuid::Uuid::new_v4().to_string();
        self.ctx.resolver.set_override(&machine_id)?;
        logger::log_info(&format!(
            "[Service] New machine identity active: {}...",
            &machine_id[..8]
        ));
        Ok(NewMachineOutcome {
            machine_id,
            processes_killed,
        })
    }

    pub fn override_status(&self) -> AppResult<OverrideStatus> {
        self.ctx.resolver.override_status()
    }

    pub async fn kiro_processes(&self) -> AppResult<Vec<ProcessInfo>> {
        let process = self.ctx.process.clone();
        tokio::task::spawn_blocking(move || process.list())
            .await
            .map_err(|e| AppError::Config(format!("process listing task failed: {}", e)))
    }

    pub fn list_backups(&self) -> AppResult<Vec<BackupItem>> {
        let store = &self.ctx.store;
        let current_id = self.ctx.resolver.current_machine_id().ok();
        let original_id = store.read_machine_id(BASELINE_BACKUP_NAME).ok();

        let mut items = Vec::new();
        for entry in store.list()? {
            if validation::is_baseline_name(&entry.name) {
                continue;
            }

            let mut item = BackupItem {
                name: entry.name.clone(),
                backup_time: entry.created_at.map(format_timestamp).unwrap_or_default(),
                has_token: entry.has_token,
                has_machine_id: entry.has_machine_id,
                ..Default::default()
            };

            if entry.has_machine_id {
                if let Ok(id) = store.read_machine_id(&entry.name) {
                    item.is_current = current_id.as_deref() == Some(id.as_str());
                    item.is_original_machine = original_id.as_deref() == Some(id.as_str());
                    item.machine_id = id;
                }
            }

            if entry.has_token {
                match store.read_token(&entry.name) {
                    Ok(token) => {
                        item.provider = token.provider.clone();
                        item.is_token_expired = is_expired(&token);
                    }
                    Err(e) => logger::log_warn(&format!(
                        "[Service] Unreadable token in backup {}: {}",
                        entry.name, e
                    )),
                }
            }

            if entry.has_usage_cache {
                if let Ok(Some(view)) = self.usage_cache.read(&entry.name) {
                    item.subscription_title = view.subscription_title;
                    item.usage_limit = view.usage_limit;
                    item.current_usage = view.current_usage;
                    item.balance = view.balance;
                    item.is_low_balance = view.is_low_balance;
                    item.cached_at = view.cached_at.unwrap_or_default();
                }
            }

            items.push(item);
        }
        Ok(items)
    }

    /// Snapshots the live credential under the effective machine id.
    pub fn create_backup(&self, name: &str) -> AppResult<BackupEntry> {
        validation::validate_backup_name(name)?;
        let machine_id = self.ctx.resolver.current_machine_id()?;
        self.ctx.store.create(name, &machine_id)
    }

    pub fn delete_backup(&self, name: &str) -> AppResult<()> {
        self.ctx.store.delete(name)
    }

    pub fn ensure_baseline(&self) -> AppResult<bool> {
        let raw_id = self.ctx.resolver.raw_machine_id()?;
        self.ctx.store.ensure_baseline(&raw_id)
    }

    pub fn current_machine_id(&self) -> AppResult<String> {
        self.ctx.resolver.current_machine_id()
    }

    pub fn current_provider(&self) -> AppResult<Option<String>> {
        Ok(self
            .ctx
            .store
            .read_live_token()?
            .map(|token| token.provider)
            .filter(|provider| !provider.trim().is_empty()))
    }

    /// First non-baseline backup recorded under `machine_id`.
    fn find_backup_by_machine_id(&self, machine_id: &str) -> AppResult<Option<String>> {
        for entry in self.ctx.store.list()? {
            if validation::is_baseline_name(&entry.name) || !entry.has_machine_id {
                continue;
            }
            if let Ok(id) = self.ctx.store.read_machine_id(&entry.name) {
                if id == machine_id {
                    return Ok(Some(entry.name));
                }
            }
        }
        Ok(None)
    }

    /// Usage for the identity Kiro is running as. Cached figures win; the API
    /// is called when the matching backup has none or its cache is unreadable.
    pub async fn current_usage(&self) -> AppResult<Option<UsageView>> {
        let machine_id = self.ctx.resolver.current_machine_id()?;
        let backup = self.find_backup_by_machine_id(&machine_id)?;

        if let Some(name) = backup.as_deref() {
            match self.usage_cache.read(name) {
                Ok(Some(view)) => return Ok(Some(view)),
                Ok(None) => {}
                Err(e) => logger::log_warn(&format!(
                    "[Service] Ignoring unreadable usage cache for {}: {}",
                    name, e
                )),
            }
        }

        let Some(token) = self.ctx.store.read_live_token()? else {
            return Ok(None);
        };
        let reading = match self
            .ctx
            .usage_api
            .fetch_usage(&token, &hash_machine_id(&machine_id))
            .await
        {
            Ok(reading) if !reading.subscription_title.trim().is_empty() => reading,
            Ok(_) => return Ok(None),
            Err(e) => {
                logger::log_warn(&format!("[Service] Current usage unavailable: {}", e));
                return Ok(None);
            }
        };

        if let Some(name) = backup.as_deref() {
            match self.usage_cache.write(name, &reading) {
                Ok(view) => return Ok(Some(view)),
                Err(e) => logger::log_warn(&format!(
                    "[Service] Failed to cache usage for {}: {}",
                    name, e
                )),
            }
        }
        Ok(Some(UsageView::from_reading(
            &reading,
            self.ctx.settings.low_balance_threshold(),
        )))
    }

    pub fn settings(&self) -> AppResult<AppSettings> {
        self.ctx.settings.load()
    }

    pub fn save_settings(&self, settings: &AppSettings) -> AppResult<()> {
        self.ctx.settings.save(settings)
    }

    pub fn is_app_running(&self) -> bool {
        self.ctx.process.is_running()
    }
}
