use super::backup_store::BackupStore;
use crate::error::AppResult;
use crate::models::{UsageReading, UsageView};
use crate::modules::system::config::SettingsStore;
use std::sync::Arc;

/// Per-backup usage cache. The low-balance flag is derived from the
/// threshold in force at read time, never from what was stored.
pub struct UsageCacheManager {
    store: Arc<BackupStore>,
    settings: SettingsStore,
}

impl UsageCacheManager {
    pub fn new(store: Arc<BackupStore>, settings: SettingsStore) -> Self {
        Self { store, settings }
    }

    pub fn read(&self, name: &str) -> AppResult<Option<UsageView>> {
        let threshold = self.settings.low_balance_threshold();
        Ok(self
            .store
            .read_usage_cache(name)?
            .map(|snapshot| UsageView::from_snapshot(&snapshot, threshold)))
    }

    pub fn write(&self, name: &str, reading: &UsageReading) -> AppResult<UsageView> {
        let snapshot = self.store.write_usage_cache(name, reading)?;
        Ok(UsageView::from_snapshot(
            &snapshot,
            self.settings.low_balance_threshold(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::TOKEN_FILE;
    use crate::models::AppSettings;
    use crate::test_utils::unique_temp_dir;
    use std::fs;

    fn setup() -> (UsageCacheManager, SettingsStore, std::path::PathBuf) {
        let root = unique_temp_dir("kiro-switch-usage");
        let sso = root.join("sso");
        fs::create_dir_all(&sso).unwrap();
        fs::write(sso.join(TOKEN_FILE), r#"{"accessToken":"atk"}"#).unwrap();

        let store = Arc::new(BackupStore::new(root.join("backups"), sso));
        store.create("work", "mid").unwrap();
        let settings = SettingsStore::new(&root);
        (
            UsageCacheManager::new(store, settings.clone()),
            settings,
            root,
        )
    }

    fn reading() -> UsageReading {
        UsageReading {
            subscription_title: "KIRO PRO".to_string(),
            usage_limit: 100.0,
            current_usage: 85.0,
            balance: 15.0,
        }
    }

    #[test]
    fn missing_cache_reads_as_none() {
        let (cache, _, root) = setup();
        assert_eq!(cache.read("work").unwrap(), None);
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn low_balance_follows_live_threshold() {
        let (cache, settings, root) = setup();
        let written = cache.write("work", &reading()).unwrap();
        assert!(written.is_low_balance);
        let stored = fs::read(root.join("backups/work/usage-cache.json")).unwrap();

        let mut lowered = AppSettings::default();
        lowered.low_balance_threshold = 0.1;
        settings.save(&lowered).unwrap();

        let view = cache.read("work").unwrap().unwrap();
        assert!(!view.is_low_balance);
        assert_eq!(view.balance, 15.0);
        assert_eq!(
            fs::read(root.join("backups/work/usage-cache.json")).unwrap(),
            stored
        );
        let _ = fs::remove_dir_all(root);
    }
}
