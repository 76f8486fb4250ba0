//! Rendering of command results for people and for scripts.
//!
//! Every command fills in a [`Report`]. With `--json` the report's warnings
//! and hints travel in the `questlog.v1` envelope next to the serialized
//! data; otherwise the report itself is printed.

use serde::Serialize;

use crate::error::{exit_codes, Error, Result};

pub const SCHEMA_VERSION: &str = "questlog.v1";

/// Global flags whose value is a separate argument.
const GLOBAL_VALUE_FLAGS: [&str; 3] = ["--data-dir", "--user", "--events"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
    Quiet,
}

impl OutputMode {
    /// `--json` wins over `--quiet`.
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if json {
            OutputMode::Json
        } else if quiet {
            OutputMode::Quiet
        } else {
            OutputMode::Human
        }
    }
}

/// Human-facing result of one command.
#[derive(Debug, Clone, Default)]
pub struct Report {
    title: String,
    fields: Vec<(String, String)>,
    lines: Vec<String>,
    warnings: Vec<String>,
    hints: Vec<String>,
}

impl Report {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn field(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.push((key.into(), value.into()));
    }

    /// Free-form body line, printed after the fields.
    pub fn line(&mut self, text: impl Into<String>) {
        self.lines.push(text.into());
    }

    pub fn warn(&mut self, text: impl Into<String>) {
        self.warnings.push(text.into());
    }

    /// A command worth running next.
    pub fn hint(&mut self, command: impl Into<String>) {
        self.hints.push(command.into());
    }

    pub fn render(&self) -> String {
        let mut out = self.title.clone();
        for (key, value) in &self.fields {
            out.push_str(&format!("\n  {key}: {value}"));
        }
        if !self.lines.is_empty() {
            out.push('\n');
            for line in &self.lines {
                out.push_str(&format!("\n  {line}"));
            }
        }
        for warning in &self.warnings {
            out.push_str(&format!("\nwarning: {warning}"));
        }
        for hint in &self.hints {
            out.push_str(&format!("\nnext: {hint}"));
        }
        out
    }
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    schema_version: &'static str,
    command: &'a str,
    #[serde(flatten)]
    outcome: Outcome<'a, T>,
    #[serde(skip_serializing_if = "no_items")]
    warnings: &'a [String],
    #[serde(skip_serializing_if = "no_items")]
    next_steps: &'a [String],
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum Outcome<'a, T: Serialize> {
    Success { data: &'a T },
    Error { error: ErrorBody },
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    code: i32,
    kind: &'static str,
}

fn no_items(items: &&[String]) -> bool {
    items.is_empty()
}

fn print_envelope<T: Serialize>(envelope: &Envelope<'_, T>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(envelope)?);
    Ok(())
}

pub fn emit_success<T: Serialize>(
    mode: OutputMode,
    command: &str,
    data: &T,
    report: &Report,
) -> Result<()> {
    match mode {
        OutputMode::Json => print_envelope(&Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            outcome: Outcome::Success { data },
            warnings: &report.warnings,
            next_steps: &report.hints,
        }),
        OutputMode::Human => {
            println!("{}", report.render());
            Ok(())
        }
        OutputMode::Quiet => Ok(()),
    }
}

/// Errors always surface: as an envelope on stdout in JSON mode, otherwise
/// on stderr with a recovery hint when one exists.
pub fn emit_error(mode: OutputMode, command: &str, err: &Error) -> Result<()> {
    let hint = recovery_hint(err);
    if mode == OutputMode::Json {
        let next_steps: Vec<String> = hint.iter().map(|step| step.to_string()).collect();
        return print_envelope::<()>(&Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            outcome: Outcome::Error {
                error: ErrorBody {
                    message: err.to_string(),
                    code: err.exit_code(),
                    kind: error_kind(err),
                },
            },
            warnings: &[],
            next_steps: &next_steps,
        });
    }

    eprintln!("error: {err}");
    if let Some(hint) = hint {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

fn error_kind(err: &Error) -> &'static str {
    if err.exit_code() == exit_codes::USER_ERROR {
        "user_error"
    } else {
        "operation_failed"
    }
}

fn recovery_hint(err: &Error) -> Option<&'static str> {
    match err {
        Error::UserRequired => Some("ql user set <name>"),
        Error::TaskNotFound(_) => Some("ql task list"),
        Error::InvalidConfig(_) => Some("fix questlog.toml then retry"),
        Error::LockFailed(_) => Some("retry once other ql commands finish"),
        _ => None,
    }
}

/// Command path (`stats`, `task done`) from raw arguments, usable before
/// clap has parsed them.
pub fn command_name<I, S>(args: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut words: Vec<String> = Vec::with_capacity(2);
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        let arg = arg.as_ref();
        if GLOBAL_VALUE_FLAGS.contains(&arg) {
            args.next();
            continue;
        }
        if arg.starts_with('-') {
            continue;
        }
        words.push(arg.to_string());
        let grouped = matches!(words[0].as_str(), "task" | "user");
        if !grouped || words.len() == 2 {
            break;
        }
    }

    if words.is_empty() {
        "ql".to_string()
    } else {
        words.join(" ")
    }
}
