//! ql init command implementation
//!
//! Creates the data directory and a default `questlog.toml`.

use std::path::PathBuf;

use crate::config::Config;
use crate::error::Result;
use crate::output::{emit_success, OutputMode, Report};
use crate::storage::Storage;

#[derive(serde::Serialize)]
struct InitReport {
    data_dir: PathBuf,
    created: InitCreated,
}

#[derive(serde::Serialize)]
struct InitCreated {
    data_dir: bool,
    config: bool,
}

pub fn run(data_dir: Option<PathBuf>, json: bool, quiet: bool) -> Result<()> {
    let storage = Storage::resolve(data_dir.as_deref());

    let created_data_dir = !storage.is_initialized();
    storage.init()?;
    let created_config = ensure_config(&storage)?;

    let outcome = InitReport {
        data_dir: storage.data_dir().to_path_buf(),
        created: InitCreated {
            data_dir: created_data_dir,
            config: created_config,
        },
    };

    let mut created_items = Vec::new();
    if created_data_dir {
        created_items.push("data dir");
    }
    if created_config {
        created_items.push("questlog.toml");
    }

    let header = if created_items.is_empty() {
        "ql init: nothing to do".to_string()
    } else {
        "ql init: initialized data dir".to_string()
    };

    let mut report = Report::new(header);
    report.field("data dir", storage.data_dir().display().to_string());
    report.field(
        "created",
        if created_items.is_empty() {
            "none".to_string()
        } else {
            created_items.join(", ")
        },
    );
    report.hint("ql user set <name>");
    report.hint("ql task new \"<title>\"");

    emit_success(
        OutputMode::from_flags(json, quiet),
        "init",
        &outcome,
        &report,
    )?;

    Ok(())
}

fn ensure_config(storage: &Storage) -> Result<bool> {
    let path = storage.config_file();
    if path.exists() {
        return Ok(false);
    }
    Config::default().save(&path)?;
    Ok(true)
}
