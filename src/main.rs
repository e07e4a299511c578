// ==========================================
// Transformer Dispatch - command-line entry
// ==========================================
// Read-only views over an existing database, printed as JSON.
//
// Usage:
//   transformer-dispatch [command] [team_id]
//
// Commands:
//   outstanding   outstanding units with reasons (default)
//   totals        naive dashboard totals
//   incomplete    OFFICIAL intake batches not fully returned
//   pending-lab   lab RETURN documents still out for testing
//   failed-lab    lab units received back with a FAIL result
//   teams         registered teams
//
// Without team_id the administrative (all teams) scope is used.
// The database path comes from TRANSFORMER_DISPATCH_DB_PATH or the user
// data directory.
// ==========================================

use transformer_dispatch::app::{get_default_db_path, AppState};
use transformer_dispatch::domain::TeamScope;

fn main() {
    transformer_dispatch::logging::init();

    tracing::info!(
        "{} {} starting",
        transformer_dispatch::APP_NAME,
        transformer_dispatch::VERSION
    );

    if let Err(e) = run() {
        tracing::error!("command failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let command = args.next().unwrap_or_else(|| "outstanding".to_string());
    let scope = match args
        .next()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
    {
        Some(team_id) => TeamScope::Team(team_id),
        None => TeamScope::All,
    };

    let db_path = get_default_db_path();
    tracing::info!("using database: {}", db_path);
    let state = AppState::new(db_path)?;

    let output = match command.as_str() {
        "outstanding" => {
            serde_json::to_string_pretty(&state.dashboard_api.resolve_unreturned_units(&scope)?)?
        }
        "totals" => {
            serde_json::to_string_pretty(&state.dashboard_api.get_dashboard_totals(&scope, None)?)?
        }
        "incomplete" => serde_json::to_string_pretty(
            &state.dashboard_api.list_incomplete_intake_batches(&scope)?,
        )?,
        "pending-lab" => {
            serde_json::to_string_pretty(&state.dashboard_api.list_pending_lab_returns(&scope)?)?
        }
        "failed-lab" => {
            serde_json::to_string_pretty(&state.dashboard_api.list_failed_lab_units(&scope)?)?
        }
        "teams" => serde_json::to_string_pretty(&state.team_repo.list()?)?,
        other => return Err(format!("unknown command: {}", other).into()),
    };

    println!("{}", output);
    Ok(())
}
