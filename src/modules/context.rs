use crate::constants::HTTP_TIMEOUT_SECS;
use crate::error::AppResult;
use crate::modules::auth::{IdcRefreshClient, SocialRefreshClient, TokenLifecycleManager};
use crate::modules::persistence::backup_store::BackupStore;
use crate::modules::system::config::SettingsStore;
use crate::modules::system::machine_id::{
    FileOverrideSource, MachineIdentityResolver, SystemMachineIdSource,
};
use crate::modules::system::paths;
use crate::modules::system::process::{KiroProcessController, ProcessController};
use crate::modules::system::quota::{KiroUsageClient, UsageApi};
use crate::utils::http;
use std::sync::Arc;
use std::time::Duration;

/// Every collaborator the identity service needs, built once at startup
/// and handed over explicitly.
pub struct AppContext {
    pub settings: SettingsStore,
    pub store: Arc<BackupStore>,
    pub resolver: MachineIdentityResolver,
    pub tokens: TokenLifecycleManager,
    pub usage_api: Arc<dyn UsageApi>,
    pub process: Arc<dyn ProcessController>,
}

impl AppContext {
    pub fn from_environment() -> AppResult<Self> {
        let data_dir = paths::get_data_dir()?;
        let settings = SettingsStore::new(&data_dir);
        let store = Arc::new(BackupStore::from_environment()?);
        let resolver = MachineIdentityResolver::new(
            Arc::new(SystemMachineIdSource),
            Arc::new(FileOverrideSource::new(&paths::get_kiro_home_dir()?)),
        );

        let client = http::build_client(Duration::from_secs(HTTP_TIMEOUT_SECS))?;
        let tokens = TokenLifecycleManager::new()
            .with_strategy(Arc::new(SocialRefreshClient::new(
                client.clone(),
                settings.clone(),
            )))
            .with_strategy(Arc::new(IdcRefreshClient::new(
                client.clone(),
                settings.clone(),
            )));
        let usage_api = Arc::new(KiroUsageClient::new(client, settings.clone()));

        tracing::debug!(
            "Context ready (data dir: {}, backups: {})",
            data_dir.display(),
            store.backups_dir().display()
        );
        Ok(Self {
            settings,
            store,
            resolver,
            tokens,
            usage_api,
            process: Arc::new(KiroProcessController::new()),
        })
    }
}
