use super::print_json;
use crate::error::AppResult;
use crate::modules::IdentityService;

pub async fn new_machine(service: &IdentityService, json: bool) -> AppResult<()> {
    let outcome = service.new_machine_identity().await?;
    if json {
        return print_json(&outcome);
    }
    if outcome.processes_killed > 0 {
        println!("Closed {} Kiro process(es)", outcome.processes_killed);
    }
    println!("New machine id: {}", outcome.machine_id);
    Ok(())
}

pub fn status(service: &IdentityService, json: bool) -> AppResult<()> {
    let status = service.override_status()?;
    if json {
        return print_json(&status);
    }
    println!(
        "System id: {}",
        status.raw_machine_id.as_deref().unwrap_or("unavailable")
    );
    match &status.custom_machine_id {
        Some(id) if status.active => println!("Override:  {} (active)", id),
        Some(id) => println!("Override:  {} (inactive)", id),
        None => println!("Override:  none"),
    }
    Ok(())
}

pub async fn processes(service: &IdentityService, json: bool) -> AppResult<()> {
    let processes = service.kiro_processes().await?;
    if json {
        return print_json(&processes);
    }
    if processes.is_empty() {
        println!("Kiro is not running");
    }
    for process in &processes {
        println!("{:>8}  {:<24} {}", process.pid, process.name, process.exe);
    }
    Ok(())
}
