use crate::error::{AppError, AppResult};
use crate::models::OverrideStatus;
use crate::modules::system::logger;
use crate::utils::files;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const CUSTOM_ID_FILE: &str = "custom-machine-id";
const ACTIVE_MARKER_FILE: &str = "custom-machine-id.active";

/// Platform machine identifier, no format guarantee.
pub trait MachineIdSource: Send + Sync {
    fn raw_id(&self) -> AppResult<String>;
}

pub struct SystemMachineIdSource;

impl MachineIdSource for SystemMachineIdSource {
    fn raw_id(&self) -> AppResult<String> {
        let id = machine_uid::get()
            .map_err(|e| AppError::Read(format!("machine_uid_unavailable: {}", e)))?;
        let id = id.trim().to_lowercase();
        if id.is_empty() {
            return Err(AppError::Read("machine_uid_empty".to_string()));
        }
        Ok(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineIdentityOverride {
    pub machine_id: String,
    pub active: bool,
}

pub trait OverrideSource: Send + Sync {
    fn load(&self) -> AppResult<Option<MachineIdentityOverride>>;
    /// Stores `machine_id` and marks it active.
    fn set(&self, machine_id: &str) -> AppResult<()>;
    fn clear(&self) -> AppResult<()>;
}

/// Override kept in Kiro's home directory: the id itself plus a marker
/// file written once Kiro has been patched to honour it.
pub struct FileOverrideSource {
    dir: PathBuf,
}

impl FileOverrideSource {
    pub fn new(kiro_home: &Path) -> Self {
        Self {
            dir: kiro_home.to_path_buf(),
        }
    }

    fn id_path(&self) -> PathBuf {
        self.dir.join(CUSTOM_ID_FILE)
    }

    fn marker_path(&self) -> PathBuf {
        self.dir.join(ACTIVE_MARKER_FILE)
    }
}

impl OverrideSource for FileOverrideSource {
    fn load(&self) -> AppResult<Option<MachineIdentityOverride>> {
        let id_path = self.id_path();
        if !id_path.exists() {
            return Ok(None);
        }
        let machine_id = fs::read_to_string(&id_path)?.trim().to_string();
        if machine_id.is_empty() {
            return Ok(None);
        }
        Ok(Some(MachineIdentityOverride {
            machine_id,
            active: self.marker_path().exists(),
        }))
    }

    fn set(&self, machine_id: &str) -> AppResult<()> {
        let machine_id = machine_id.trim();
        if machine_id.is_empty() {
            return Err(AppError::Validation(
                "machine id override cannot be empty".to_string(),
            ));
        }
        files::write_bytes_atomic(&self.id_path(), machine_id.as_bytes())?;
        fs::write(self.marker_path(), b"")?;
        Ok(())
    }

    fn clear(&self) -> AppResult<()> {
        for path in [self.id_path(), self.marker_path()] {
            if path.exists() {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}

pub fn hash_machine_id(machine_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(machine_id.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Clone)]
pub struct MachineIdentityResolver {
    source: Arc<dyn MachineIdSource>,
    overrides: Arc<dyn OverrideSource>,
}

impl MachineIdentityResolver {
    pub fn new(source: Arc<dyn MachineIdSource>, overrides: Arc<dyn OverrideSource>) -> Self {
        Self { source, overrides }
    }

    pub fn raw_machine_id(&self) -> AppResult<String> {
        self.source.raw_id()
    }

    /// Active override if any, otherwise the raw system id. The override is
    /// re-read on every call.
    pub fn current_machine_id(&self) -> AppResult<String> {
        match self.overrides.load() {
            Ok(Some(ov)) if ov.active => return Ok(ov.machine_id),
            Ok(_) => {}
            Err(e) => {
                logger::log_warn(&format!(
                    "Failed to read machine id override, using system id: {}",
                    e
                ));
            }
        }
        self.source.raw_id()
    }

    pub fn set_override(&self, machine_id: &str) -> AppResult<()> {
        self.overrides.set(machine_id)
    }

    pub fn clear_override(&self) -> AppResult<()> {
        self.overrides.clear()
    }

    pub fn override_status(&self) -> AppResult<OverrideStatus> {
        let custom = self.overrides.load()?;
        Ok(OverrideStatus {
            active: custom.as_ref().is_some_and(|ov| ov.active),
            custom_machine_id: custom.map(|ov| ov.machine_id),
            raw_machine_id: self.source.raw_id().ok(),
        })
    }
}
