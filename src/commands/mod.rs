//! Command-line surface over [`IdentityService`].

pub mod backup;
pub mod machine;
pub mod settings;
pub mod usage;

use crate::error::AppResult;
use crate::modules::IdentityService;
use clap::{Parser, Subcommand};
use serde::Serialize;

/// kiro-switch - keep several Kiro identities and swap between them
#[derive(Parser, Debug)]
#[command(name = "kiro-switch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List backups with their cached usage
    List,

    /// Snapshot the live credential under a new name
    Create {
        /// Backup name
        name: String,
    },

    /// Delete a backup
    Delete {
        /// Backup name
        name: String,
    },

    /// Close Kiro and make a backup's credential the live one
    Switch {
        /// Backup name
        name: String,
    },

    /// Refresh a backup's usage figures (and its token, if expired)
    Refresh {
        /// Backup name
        name: String,
    },

    /// Clear the machine id override and restore the matching backup
    RestoreBaseline,

    /// Create the baseline backup if it does not exist yet
    EnsureBaseline,

    /// Usage of the identity Kiro is currently running as
    Usage,

    /// Effective machine id, live provider and whether Kiro is running
    Status,

    /// Close Kiro and switch to a freshly generated machine id
    NewMachine,

    /// Show the system machine id and any override
    MachineStatus,

    /// List running Kiro processes
    Processes,

    /// Show or change settings
    #[command(subcommand)]
    Settings(SettingsCommands),
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommands {
    /// Print the current settings
    Show,

    /// Update one or more settings
    Set {
        /// Balance/limit ratio under which a backup is flagged low (0.0 - 1.0)
        #[arg(long)]
        low_balance_threshold: Option<f64>,

        /// Kiro version reported to the remote endpoints
        #[arg(long)]
        kiro_version: Option<String>,
    },
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn execute(service: &IdentityService, cli: Cli) -> AppResult<()> {
    let json = cli.json;
    match cli.command {
        Commands::List => backup::list(service, json),
        Commands::Create { name } => backup::create(service, &name, json),
        Commands::Delete { name } => backup::delete(service, &name, json),
        Commands::Switch { name } => backup::switch(service, &name, json).await,
        Commands::Refresh { name } => usage::refresh(service, &name, json).await,
        Commands::RestoreBaseline => backup::restore_baseline(service, json).await,
        Commands::EnsureBaseline => backup::ensure_baseline(service, json),
        Commands::Usage => usage::current(service, json).await,
        Commands::Status => usage::status(service, json),
        Commands::NewMachine => machine::new_machine(service, json).await,
        Commands::MachineStatus => machine::status(service, json),
        Commands::Processes => machine::processes(service, json).await,
        Commands::Settings(SettingsCommands::Show) => settings::show(service, json),
        Commands::Settings(SettingsCommands::Set {
            low_balance_threshold,
            kiro_version,
        }) => settings::set(service, low_balance_threshold, kiro_version, json),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_settings_command() {
        let cli = Cli::try_parse_from([
            "kiro-switch",
            "settings",
            "set",
            "--low-balance-threshold",
            "0.3",
        ])
        .unwrap();
        match cli.command {
            Commands::Settings(SettingsCommands::Set {
                low_balance_threshold,
                kiro_version,
            }) => {
                assert_eq!(low_balance_threshold, Some(0.3));
                assert_eq!(kiro_version, None);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn json_flag_is_global() {
        let cli = Cli::try_parse_from(["kiro-switch", "switch", "work", "--json"]).unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Switch { ref name } if name == "work"));
    }

    #[test]
    fn machine_commands_use_kebab_case() {
        let cli = Cli::try_parse_from(["kiro-switch", "new-machine", "--json"]).unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::NewMachine));
        let cli = Cli::try_parse_from(["kiro-switch", "machine-status"]).unwrap();
        assert!(matches!(cli.command, Commands::MachineStatus));
    }

    #[test]
    fn backup_name_is_required() {
        assert!(Cli::try_parse_from(["kiro-switch", "create"]).is_err());
    }
}
