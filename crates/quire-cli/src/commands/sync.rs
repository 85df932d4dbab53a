use std::path::Path;

use quire_core::config::SyncSettings;
use quire_core::{SyncDirection, SyncReport, SyncState};

use crate::commands::common::LocalState;
use crate::error::CliError;

pub async fn run_sync(
    direction: SyncDirection,
    remote: Option<&str>,
    as_json: bool,
    settings_path: &Path,
    workspace_path: &Path,
) -> Result<(), CliError> {
    let settings = SyncSettings::load_from_path(settings_path)?;
    if settings.remotes.is_empty() {
        return Err(CliError::NoRemotes);
    }

    let mut state = LocalState::load(workspace_path)?;
    let mut service = settings.build_service(&state.remotes)?;
    service.connect_all().await?;

    let result = service.run(&mut state.workspace, direction, remote).await;

    // Cursors move even when a later step of the cycle fails.
    state.remotes = service.remote_infos();
    state.save(workspace_path)?;
    let report = result?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", format_report(&report));
    }
    Ok(())
}

pub fn format_report(report: &SyncReport) -> String {
    let mut actions = Vec::new();
    if report.pulled {
        actions.push("pulled");
    }
    if report.pushed {
        actions.push("pushed");
    }
    let actions = if actions.is_empty() {
        "nothing to transfer".to_string()
    } else {
        actions.join(" and ")
    };

    match report.state {
        SyncState::Offline => format!("{}: remote unreachable, working offline", report.direction),
        SyncState::Synced => format!("{}: {actions}; up to date", report.direction),
        SyncState::Pending => format!(
            "{}: {actions}; local changes still pending",
            report.direction
        ),
        SyncState::Conflicts => format!(
            "{}: {actions}; {} conflict(s) need attention (see `quire conflicts`)",
            report.direction, report.conflicts
        ),
    }
}
