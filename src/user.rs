//! User identity management.
//!
//! User resolution order:
//! 1) CLI --user (or QUESTLOG_USER, which clap folds into the flag)
//! 2) Persisted value in `<data_dir>/user`
//! 3) Config default (`user.default`)
//!
//! With none of these set, commands that touch tasks fail with
//! [`Error::UserRequired`].

use crate::config::Config;
use crate::error::{Error, Result};
use crate::storage::Storage;

/// Resolve the current user from the CLI, the persisted value, and config.
pub fn resolve_user(storage: &Storage, config: &Config, cli_user: Option<&str>) -> Result<String> {
    if let Some(user) = non_empty(cli_user) {
        return validate_user(user);
    }

    if let Some(user) = storage.read_user()? {
        return validate_user(&user);
    }

    match non_empty(config.user.default.as_deref()) {
        Some(user) => validate_user(user),
        None => Err(Error::UserRequired),
    }
}

/// Persist the user identity for later invocations.
pub fn persist_user(storage: &Storage, user: &str) -> Result<String> {
    let user = non_empty(Some(user))
        .ok_or_else(|| Error::InvalidArgument("user name cannot be empty".to_string()))?;
    let user = validate_user(user)?;
    storage.write_user(&user)?;
    Ok(user)
}

fn validate_user(user: &str) -> Result<String> {
    if user.chars().any(char::is_control) {
        return Err(Error::InvalidArgument(format!(
            "user name contains control characters: {user:?}"
        )));
    }
    Ok(user.to_string())
}

fn non_empty(input: Option<&str>) -> Option<&str> {
    input.map(str::trim).filter(|value| !value.is_empty())
}
