use super::print_json;
use crate::error::AppResult;
use crate::modules::IdentityService;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusReport {
    machine_id: String,
    provider: Option<String>,
    kiro_running: bool,
}

pub async fn refresh(service: &IdentityService, name: &str, json: bool) -> AppResult<()> {
    let result = service.refresh_usage(name).await?;
    if json {
        return print_json(&result);
    }
    if result.token_refreshed {
        println!("Token for '{}' was expired and has been refreshed", name);
    }
    println!(
        "{}: {} used {:.1} of {:.1}, balance {:.1}{}",
        name,
        result.subscription_title,
        result.current_usage,
        result.usage_limit,
        result.balance,
        if result.is_low_balance { " (low)" } else { "" }
    );
    Ok(())
}

pub async fn current(service: &IdentityService, json: bool) -> AppResult<()> {
    let usage = service.current_usage().await?;
    if json {
        return print_json(&usage);
    }
    match usage {
        Some(view) => println!(
            "{}: used {:.1} of {:.1}, balance {:.1}{}",
            view.subscription_title,
            view.current_usage,
            view.usage_limit,
            view.balance,
            if view.is_low_balance { " (low)" } else { "" }
        ),
        None => println!("Usage unavailable"),
    }
    Ok(())
}

pub fn status(service: &IdentityService, json: bool) -> AppResult<()> {
    let report = StatusReport {
        machine_id: service.current_machine_id()?,
        provider: service.current_provider()?,
        kiro_running: service.is_app_running(),
    };
    if json {
        return print_json(&report);
    }
    println!("Machine id: {}", report.machine_id);
    println!("Provider:   {}", report.provider.as_deref().unwrap_or("-"));
    println!("Kiro:       {}", if report.kiro_running { "running" } else { "stopped" });
    Ok(())
}
