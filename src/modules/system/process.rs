use crate::error::AppResult;
use crate::modules::system::logger;
use serde::Serialize;
use std::time::Duration;
use sysinfo::{Pid, System};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    pub exe: String,
}

/// Start/stop view of the managed application.
pub trait ProcessController: Send + Sync {
    fn is_running(&self) -> bool;
    /// Running Kiro processes, ordered by pid.
    fn list(&self) -> Vec<ProcessInfo>;
    /// Returns how many processes were signalled successfully.
    fn terminate(&self) -> AppResult<usize>;
}

fn get_current_exe_path() -> Option<std::path::PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.canonicalize().ok())
}

/// Kiro main process or one of its helpers. Our own binary name also
/// starts with "kiro", so matching is on exact names and bundle paths.
pub fn is_kiro_process(name: &str, exe_path: &str) -> bool {
    let name = name.to_lowercase();
    let exe_path = exe_path.to_lowercase().replace('\\', "/");

    if name == "kiro" || name == "kiro.exe" || name.starts_with("kiro helper") {
        return true;
    }
    if exe_path.contains("kiro.app/contents/") {
        return true;
    }
    exe_path.ends_with("/kiro/kiro.exe") || exe_path.ends_with("/kiro/kiro")
}

fn find_kiro_pids(system: &System) -> Vec<Pid> {
    let current_exe = get_current_exe_path();
    let current_pid = std::process::id();

    let mut pids = Vec::new();
    for (pid, process) in system.processes() {
        if pid.as_u32() == current_pid {
            continue;
        }
        if let (Some(ref my_path), Some(p_exe)) = (&current_exe, process.exe()) {
            if let Ok(p_path) = p_exe.canonicalize() {
                if my_path == &p_path {
                    continue;
                }
            }
        }

        let name = process.name().to_string_lossy();
        let exe_path = process
            .exe()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default();
        if is_kiro_process(&name, &exe_path) {
            pids.push(*pid);
        }
    }
    pids
}

pub struct KiroProcessController {
    settle: Duration,
}

impl KiroProcessController {
    pub fn new() -> Self {
        Self {
            settle: Duration::from_millis(800),
        }
    }
}

impl Default for KiroProcessController {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessController for KiroProcessController {
    fn is_running(&self) -> bool {
        let mut system = System::new_all();
        system.refresh_all();
        !find_kiro_pids(&system).is_empty()
    }

    fn list(&self) -> Vec<ProcessInfo> {
        let mut system = System::new_all();
        system.refresh_all();

        let mut processes: Vec<ProcessInfo> = find_kiro_pids(&system)
            .into_iter()
            .filter_map(|pid| {
                let process = system.process(pid)?;
                Some(ProcessInfo {
                    pid: pid.as_u32(),
                    name: process.name().to_string_lossy().into_owned(),
                    exe: process
                        .exe()
                        .map(|p| p.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                })
            })
            .collect();
        processes.sort_by_key(|p| p.pid);
        processes
    }

    fn terminate(&self) -> AppResult<usize> {
        let mut system = System::new_all();
        system.refresh_all();

        let pids = find_kiro_pids(&system);
        let mut killed = 0;
        for pid in &pids {
            if let Some(process) = system.process(*pid) {
                if process.kill() {
                    killed += 1;
                } else {
                    logger::log_warn(&format!("Failed to kill Kiro process {}", pid));
                }
            }
        }
        logger::log_info(&format!(
            "Terminated {} of {} Kiro processes",
            killed,
            pids.len()
        ));

        if killed > 0 {
            std::thread::sleep(self.settle);
        }
        Ok(killed)
    }
}
