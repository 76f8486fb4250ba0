//! ql user command implementation
//!
//! Provides user identity helpers (set/show).

use std::path::PathBuf;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::output::{emit_success, OutputMode, Report};
use crate::storage::Storage;
use crate::user;

/// Options for `ql user set`
pub struct SetOptions {
    pub name: String,
    pub data_dir: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

/// Options for `ql user show`
pub struct ShowOptions {
    pub data_dir: Option<PathBuf>,
    pub user: Option<String>,
    pub json: bool,
    pub quiet: bool,
}

#[derive(serde::Serialize)]
struct UserSetReport {
    user: String,
    path: PathBuf,
}

#[derive(serde::Serialize)]
struct UserShowReport {
    user: Option<String>,
}

pub fn run_set(options: SetOptions) -> Result<()> {
    let storage = Storage::resolve(options.data_dir.as_deref());
    let user_name = user::persist_user(&storage, &options.name)?;
    let user_path = storage.user_file();

    let outcome = UserSetReport {
        user: user_name.clone(),
        path: user_path.clone(),
    };

    let mut report = Report::new(format!("ql user set: {user_name}"));
    report.field("user", user_name);
    report.field("path", user_path.display().to_string());
    report.hint("ql task new \"<title>\"");

    emit_success(
        OutputMode::from_flags(options.json, options.quiet),
        "user set",
        &outcome,
        &report,
    )?;

    Ok(())
}

pub fn run_show(options: ShowOptions) -> Result<()> {
    let storage = Storage::resolve(options.data_dir.as_deref());
    let config = Config::load_from_dir(storage.data_dir())?;

    let user_name = match user::resolve_user(&storage, &config, options.user.as_deref()) {
        Ok(name) => Some(name),
        Err(Error::UserRequired) => None,
        Err(err) => return Err(err),
    };

    let header = match user_name.as_deref() {
        Some(name) => format!("ql user: {name}"),
        None => "ql user: not set".to_string(),
    };

    let mut report = Report::new(header);
    match user_name.as_deref() {
        Some(name) => report.field("user", name),
        None => {
            report.warn("no user identity configured");
            report.hint("ql user set <name>");
        }
    }

    emit_success(
        OutputMode::from_flags(options.json, options.quiet),
        "user show",
        &UserShowReport { user: user_name },
        &report,
    )?;

    Ok(())
}
