//! CLI probe for the tab groups core.
//!
//! # Responsibility
//! - Print the linked core version.
//! - Dump a persisted forest from a state database for inspection.
//!
//! Usage: `tabgroup_cli [DB_PATH [STATE_KEY]]`

use std::process::ExitCode;
use tabgroup_core::{open_db, SqliteStateStore, StateStore};

fn main() -> ExitCode {
    println!("tabgroup_core version={}", tabgroup_core::core_version());

    let mut args = std::env::args().skip(1);
    let Some(db_path) = args.next() else {
        return ExitCode::SUCCESS;
    };
    let state_key = args
        .next()
        .unwrap_or_else(|| tabgroup_core::CoreConfig::default().state_key);

    match dump_forest(&db_path, &state_key) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("event=cli_dump module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn dump_forest(db_path: &str, state_key: &str) -> Result<(), Box<dyn std::error::Error>> {
    let conn = open_db(db_path)?;
    let store = SqliteStateStore::new(&conn, state_key);
    match store.load()? {
        Some(forest) => println!("{}", serde_json::to_string_pretty(&forest)?),
        None => println!("no persisted forest for state key `{state_key}`"),
    }
    Ok(())
}
