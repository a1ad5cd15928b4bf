pub mod backup;
pub mod config;
pub mod token;
pub mod usage;

pub use backup::{
    BackupEntry, BackupInfo, BackupItem, MachineIdRecord, NewMachineOutcome, OverrideStatus,
    SwitchOutcome,
};
pub use config::AppSettings;
pub use token::{AuthType, IdcCredentials, KiroToken, RefreshedToken};
pub use usage::{UsageReading, UsageRefresh, UsageSnapshot, UsageView};
