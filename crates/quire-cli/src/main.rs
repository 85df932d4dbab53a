//! Quire CLI - notebooks, folders, and documents from the terminal
//!
//! Edits land in a local workspace file; `quire sync` reconciles it with the
//! configured remotes.

mod cli;
mod commands;
mod error;

#[cfg(test)]
mod tests;

use clap::Parser;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::add::run_add;
use crate::commands::changes::run_changes;
use crate::commands::common::{resolve_settings_path, resolve_workspace_path};
use crate::commands::completions::run_completions;
use crate::commands::conflicts::run_conflicts;
use crate::commands::delete::run_delete;
use crate::commands::edit::{run_edit, FieldEdits};
use crate::commands::list::{run_list, run_show};
use crate::commands::remote::run_remote;
use crate::commands::sync::run_sync;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let directive = "quire=info"
        .parse::<Directive>()
        .map_err(|error| CliError::Config(format!("Invalid log directive: {error}")))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let workspace_path = resolve_workspace_path(cli.workspace)?;

    match cli.command {
        Commands::Add {
            kind,
            title,
            parent,
        } => run_add(kind.into(), &title, parent.as_deref(), &workspace_path)?,
        Commands::List { json } => run_list(json, &workspace_path)?,
        Commands::Show { id, json } => run_show(&id, json, &workspace_path)?,
        Commands::Edit {
            id,
            title,
            content,
            tags,
            parent,
            order,
        } => {
            let edits = FieldEdits {
                title,
                content,
                tags,
                parent,
                order,
            };
            run_edit(&id, edits, &workspace_path)?;
        }
        Commands::Delete { id } => run_delete(&id, &workspace_path)?,
        Commands::Changes { json } => run_changes(json, &workspace_path)?,
        Commands::Conflicts { json } => run_conflicts(json, &workspace_path)?,
        Commands::Remote { command } => {
            let settings_path = resolve_settings_path(cli.config)?;
            run_remote(command, &settings_path, &workspace_path)?;
        }
        Commands::Sync { mode, remote, json } => {
            let settings_path = resolve_settings_path(cli.config)?;
            run_sync(
                mode.into(),
                remote.as_deref(),
                json,
                &settings_path,
                &workspace_path,
            )
            .await?;
        }
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref())?,
    }

    Ok(())
}
