mod commands;
pub mod constants;
pub mod error;
pub mod models;
pub mod modules;
mod utils;

#[cfg(test)]
mod test_utils;

use clap::Parser;
use modules::system::logger;
use std::process::ExitCode;
use tracing::error;

pub use modules::{AppContext, IdentityService};

pub fn run() -> ExitCode {
    let cli = commands::Cli::parse();
    logger::init_logger();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create Tokio runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(async {
        let ctx = AppContext::from_environment()?;
        let service = IdentityService::new(ctx);
        commands::execute(&service, cli).await
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("[{}] {}", e.kind(), e);
            ExitCode::FAILURE
        }
    }
}
