use super::print_json;
use crate::error::AppResult;
use crate::models::{BackupItem, SwitchOutcome};
use crate::modules::IdentityService;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct DeleteReport<'a> {
    deleted: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BaselineReport {
    baseline_created: bool,
}

fn usage_column(item: &BackupItem) -> String {
    if item.subscription_title.is_empty() {
        return "-".to_string();
    }
    format!(
        "{} {:.1}/{:.1}{}",
        item.subscription_title,
        item.balance,
        item.usage_limit,
        if item.is_low_balance { " LOW" } else { "" }
    )
}

fn print_item(item: &BackupItem) {
    let marker = if item.is_current { "*" } else { " " };
    let expired = if item.is_token_expired { " (expired)" } else { "" };
    println!(
        "{} {:<20} {:<10} {}{}",
        marker,
        item.name,
        if item.provider.is_empty() { "-" } else { item.provider.as_str() },
        usage_column(item),
        expired
    );
}

pub fn list(service: &IdentityService, json: bool) -> AppResult<()> {
    let items = service.list_backups()?;
    if json {
        return print_json(&items);
    }
    if items.is_empty() {
        println!("No backups yet. Create one with `kiro-switch create <name>`.");
    }
    for item in &items {
        print_item(item);
    }
    Ok(())
}

pub fn create(service: &IdentityService, name: &str, json: bool) -> AppResult<()> {
    let entry = service.create_backup(name)?;
    if json {
        return print_json(&entry);
    }
    println!("Backup '{}' created", entry.name);
    Ok(())
}

pub fn delete(service: &IdentityService, name: &str, json: bool) -> AppResult<()> {
    service.delete_backup(name)?;
    if json {
        return print_json(&DeleteReport { deleted: name });
    }
    println!("Backup '{}' deleted", name);
    Ok(())
}

fn report_outcome(outcome: &SwitchOutcome, json: bool) -> AppResult<()> {
    if json {
        return print_json(outcome);
    }
    if outcome.processes_killed > 0 {
        println!("Closed {} Kiro process(es)", outcome.processes_killed);
    }
    match &outcome.backup {
        Some(name) => println!("Live credential restored from '{}'", name),
        None => println!("No backup matches the system machine id; credential left as is"),
    }
    Ok(())
}

pub async fn switch(service: &IdentityService, name: &str, json: bool) -> AppResult<()> {
    let outcome = service.switch_identity(name).await?;
    report_outcome(&outcome, json)
}

pub async fn restore_baseline(service: &IdentityService, json: bool) -> AppResult<()> {
    let outcome = service.restore_baseline_identity().await?;
    report_outcome(&outcome, json)
}

pub fn ensure_baseline(service: &IdentityService, json: bool) -> AppResult<()> {
    let baseline_created = service.ensure_baseline()?;
    if json {
        return print_json(&BaselineReport { baseline_created });
    }
    if baseline_created {
        println!("Baseline backup created");
    } else {
        println!("Baseline backup already exists");
    }
    Ok(())
}
