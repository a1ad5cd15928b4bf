pub mod backup_store;
pub mod usage_cache;
