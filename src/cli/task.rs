//! ql task and stats command implementations.

use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use crate::accounting::UserStats;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::events::{Event, EventDestination, EventKind, EventSink};
use crate::format::{format_relative_time, truncate_text};
use crate::output::{emit_success, OutputMode, Report};
use crate::points::{Priority, ALL_PRIORITIES};
use crate::storage::Storage;
use crate::task::{CompletionTransition, NewTask, TaskRecord, TaskStore, TaskUpdate};
use crate::user;

const LIST_TITLE_WIDTH: usize = 60;

pub struct NewOptions {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub due: Option<String>,
    pub category: Option<String>,
    pub user: Option<String>,
    pub events: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct ListOptions {
    pub page: usize,
    pub limit: Option<usize>,
    pub user: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct ShowOptions {
    pub id: String,
    pub user: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct EditOptions {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub due: Option<String>,
    pub category: Option<String>,
    pub user: Option<String>,
    pub events: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct DoneOptions {
    pub id: String,
    pub at: Option<String>,
    pub user: Option<String>,
    pub events: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

/// Shared by `ql task reopen` and `ql task rm`.
pub struct TargetOptions {
    pub id: String,
    pub user: Option<String>,
    pub events: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct StatsOptions {
    pub user: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

#[derive(Serialize)]
struct TaskCompletedOutput {
    task: TaskRecord,
    completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    points_earned: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<UserStats>,
}

#[derive(Serialize)]
struct TaskReopenedOutput {
    task: TaskRecord,
    reopened: bool,
}

#[derive(Serialize)]
struct TaskDeletedOutput {
    id: String,
    title: String,
}

#[derive(Serialize)]
struct TaskEventData<'a> {
    id: &'a str,
    title: &'a str,
    priority: Priority,
    points: u32,
    is_completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<UserStats>,
}

struct TaskContext {
    store: TaskStore,
    user: String,
}

pub fn run_new(options: NewOptions) -> Result<()> {
    let ctx = load_context(options.data_dir, options.user)?;
    let (mut event_sink, events_to_stdout) = open_task_event_sink(options.events.as_deref())?;
    let offset = ctx.store.streaks().offset();

    let new = NewTask {
        title: options.title,
        description: options.description,
        priority: parse_priority(options.priority.as_deref())?,
        due_at: parse_due(options.due.as_deref(), offset)?,
        category: options.category,
    };
    let task = ctx.store.create_task(&ctx.user, new, Utc::now())?;

    let event_warning =
        emit_task_event(&mut event_sink, EventKind::TaskCreated, &ctx.user, &task, None);

    let mut report = Report::new(format!("ql task new: {}", task.title));
    if let Some(warning) = event_warning {
        report.warn(warning);
    }
    report.field("id", task.id.clone());
    report.field("priority", task.priority.to_string());
    report.field("points", task.points.to_string());
    if let Some(due_at) = task.due_at {
        report.field("due", due_at.to_rfc3339());
    }
    report.hint(format!("ql task done {}", task.id));

    emit_success(
        output_mode(options.json, options.quiet, events_to_stdout),
        "task new",
        &task,
        &report,
    )
}

pub fn run_list(options: ListOptions) -> Result<()> {
    let ctx = load_context(options.data_dir, options.user)?;
    let limit = options.limit.unwrap_or(ctx.store.config().page_size);
    let page = ctx.store.list_tasks(&ctx.user, options.page, limit)?;
    let now = Utc::now();

    let pagination = &page.pagination;
    let mut report = Report::new(format!("Tasks for {}", ctx.user));
    report.field("Total", pagination.total_tasks.to_string());
    report.field(
        "Page",
        format!("{}/{}", pagination.current_page, pagination.total_pages.max(1)),
    );
    for task in &page.tasks {
        let mark = if task.is_completed { "x" } else { " " };
        let mut line = format!(
            "[{mark}][{}] {} {}",
            task.priority,
            task.id,
            truncate_text(&task.title, LIST_TITLE_WIDTH)
        );
        if let Some(category) = task.category.as_deref() {
            line.push_str(&format!(" ({category})"));
        }
        let age = format_relative_time(task.created_at, now);
        line.push_str(&format!(", created {age}"));
        report.line(line);
    }
    if page.tasks.is_empty() && pagination.total_tasks == 0 {
        report.hint("ql task new \"<title>\"");
    }
    if pagination.has_next_page {
        report.hint(format!("ql task list --page {}", pagination.current_page + 1));
    }

    emit_success(
        OutputMode::from_flags(options.json, options.quiet),
        "task list",
        &page,
        &report,
    )
}

pub fn run_show(options: ShowOptions) -> Result<()> {
    let ctx = load_context(options.data_dir, options.user)?;
    let task = ctx.store.get_task(&ctx.user, &options.id)?;

    let mut report = Report::new(format!("Task {}", task.id));
    describe_task(&mut report, &task);

    emit_success(
        OutputMode::from_flags(options.json, options.quiet),
        "task show",
        &task,
        &report,
    )
}

pub fn run_edit(options: EditOptions) -> Result<()> {
    let ctx = load_context(options.data_dir, options.user)?;
    let (mut event_sink, events_to_stdout) = open_task_event_sink(options.events.as_deref())?;
    let offset = ctx.store.streaks().offset();

    let update = TaskUpdate {
        title: options.title,
        description: options.description,
        priority: parse_priority(options.priority.as_deref())?,
        due_at: parse_due(options.due.as_deref(), offset)?,
        category: options.category,
        ..TaskUpdate::default()
    };
    let outcome = ctx.store.update_task(&ctx.user, &options.id, update, Utc::now())?;
    let task = outcome.task;

    let event_warning =
        emit_task_event(&mut event_sink, EventKind::TaskUpdated, &ctx.user, &task, None);

    let mut report = Report::new("Task updated");
    if let Some(warning) = event_warning {
        report.warn(warning);
    }
    describe_task(&mut report, &task);

    emit_success(
        output_mode(options.json, options.quiet, events_to_stdout),
        "task edit",
        &task,
        &report,
    )
}

pub fn run_done(options: DoneOptions) -> Result<()> {
    let ctx = load_context(options.data_dir, options.user)?;
    let (mut event_sink, events_to_stdout) = open_task_event_sink(options.events.as_deref())?;
    let update = TaskUpdate {
        completed: Some(true),
        completed_at: parse_timestamp("at", options.at.as_deref())?,
        ..TaskUpdate::default()
    };
    let outcome = ctx.store.update_task(&ctx.user, &options.id, update, Utc::now())?;
    let completed = outcome.transition == CompletionTransition::Completed;

    let event_warning = if completed {
        emit_task_event(
            &mut event_sink,
            EventKind::TaskCompleted,
            &ctx.user,
            &outcome.task,
            outcome.stats,
        )
    } else {
        None
    };

    // `done` never touches priority, so the stored points are the accrued points.
    let points_earned = completed.then_some(outcome.task.points);

    let mut report = if completed {
        Report::new(format!("Completed: {}", outcome.task.title))
    } else {
        Report::new(format!("Already completed: {}", outcome.task.title))
    };
    if let Some(warning) = event_warning {
        report.warn(warning);
    }
    if let Some(points) = points_earned {
        report.field("points earned", format!("+{points}"));
    }
    if let Some(stats) = outcome.stats.as_ref() {
        describe_stats(&mut report, stats);
    }
    if !completed {
        report.warn("task was already completed; no points awarded");
    }
    report.hint("ql stats");

    let output = TaskCompletedOutput {
        task: outcome.task,
        completed,
        points_earned,
        stats: outcome.stats,
    };

    emit_success(
        output_mode(options.json, options.quiet, events_to_stdout),
        "task done",
        &output,
        &report,
    )
}

pub fn run_reopen(options: TargetOptions) -> Result<()> {
    let ctx = load_context(options.data_dir, options.user)?;
    let (mut event_sink, events_to_stdout) = open_task_event_sink(options.events.as_deref())?;

    let update = TaskUpdate {
        completed: Some(false),
        ..TaskUpdate::default()
    };
    let outcome = ctx.store.update_task(&ctx.user, &options.id, update, Utc::now())?;
    let reopened = outcome.transition == CompletionTransition::Reopened;

    let event_warning = if reopened {
        emit_task_event(&mut event_sink, EventKind::TaskReopened, &ctx.user, &outcome.task, None)
    } else {
        None
    };

    let mut report = Report::new(format!("Reopened: {}", outcome.task.title));
    if let Some(warning) = event_warning {
        report.warn(warning);
    }
    if !reopened {
        report.warn("task was not completed");
    }
    report.field("id", outcome.task.id.clone());

    emit_success(
        output_mode(options.json, options.quiet, events_to_stdout),
        "task reopen",
        &TaskReopenedOutput {
            task: outcome.task,
            reopened,
        },
        &report,
    )
}

pub fn run_rm(options: TargetOptions) -> Result<()> {
    let ctx = load_context(options.data_dir, options.user)?;
    let (mut event_sink, events_to_stdout) = open_task_event_sink(options.events.as_deref())?;

    let removed = ctx.store.delete_task(&ctx.user, &options.id)?;
    let event_warning =
        emit_task_event(&mut event_sink, EventKind::TaskDeleted, &ctx.user, &removed, None);

    let mut report = Report::new(format!("Deleted: {}", removed.title));
    if let Some(warning) = event_warning {
        report.warn(warning);
    }
    report.field("id", removed.id.clone());

    emit_success(
        output_mode(options.json, options.quiet, events_to_stdout),
        "task rm",
        &TaskDeletedOutput {
            id: removed.id,
            title: removed.title,
        },
        &report,
    )
}

pub fn run_stats(options: StatsOptions) -> Result<()> {
    let ctx = load_context(options.data_dir, options.user)?;
    let summary = ctx.store.summary(&ctx.user, Utc::now())?;

    let mut report = Report::new(format!("Stats for {}", ctx.user));
    describe_stats(&mut report, &summary.user_stats);
    report.field(
        "Tasks",
        format!(
            "{} total, {} completed, {} pending",
            summary.total_tasks, summary.completed_tasks, summary.pending_tasks
        ),
    );
    report.field(
        "Today",
        format!("{} created, {} completed", summary.today_tasks, summary.today_completed),
    );
    report.field("Completion rate", format!("{}%", summary.completion_rate));
    if summary.pending_tasks > 0 {
        report.hint("ql task list");
    }

    emit_success(
        OutputMode::from_flags(options.json, options.quiet),
        "stats",
        &summary,
        &report,
    )
}

/// JSONL on stdout leaves no room for the envelope or the report.
fn output_mode(json: bool, quiet: bool, events_to_stdout: bool) -> OutputMode {
    if events_to_stdout {
        OutputMode::Quiet
    } else {
        OutputMode::from_flags(json, quiet)
    }
}

fn load_context(data_dir: Option<PathBuf>, user: Option<String>) -> Result<TaskContext> {
    let storage = Storage::resolve(data_dir.as_deref());
    let config = Config::load_from_dir(storage.data_dir())?;
    let user = user::resolve_user(&storage, &config, user.as_deref())?;
    let store = TaskStore::new(storage, &config)?;
    Ok(TaskContext { store, user })
}

fn parse_priority(value: Option<&str>) -> Result<Option<Priority>> {
    let Some(value) = value else {
        return Ok(None);
    };
    Priority::parse(value).map(Some).ok_or_else(|| {
        let known: Vec<&str> = ALL_PRIORITIES.iter().map(|p| p.as_str()).collect();
        Error::InvalidArgument(format!(
            "unknown priority '{value}' (expected one of {})",
            known.join(", ")
        ))
    })
}

fn parse_timestamp(label: &str, value: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let parsed = DateTime::parse_from_rfc3339(value).map_err(|err| {
        Error::InvalidArgument(format!("invalid {label} timestamp '{value}': {err}"))
    })?;
    Ok(Some(parsed.with_timezone(&Utc)))
}

/// Accepts RFC 3339 or a bare `YYYY-MM-DD` (midnight at the configured offset).
fn parse_due(value: Option<&str>, offset: FixedOffset) -> Result<Option<DateTime<Utc>>> {
    let Some(value) = value.map(str::trim) else {
        return Ok(None);
    };
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .and_then(|naive| offset.from_local_datetime(&naive).single())
            .ok_or_else(|| Error::InvalidArgument(format!("invalid due date '{value}'")))?;
        return Ok(Some(midnight.with_timezone(&Utc)));
    }
    parse_timestamp("due", Some(value))
}

fn open_task_event_sink(events: Option<&str>) -> Result<(Option<EventSink>, bool)> {
    let destination = EventDestination::parse(events);
    let sink = destination.as_ref().map(|dest| dest.open()).transpose()?;
    let events_to_stdout = matches!(destination, Some(EventDestination::Stdout));
    Ok((sink, events_to_stdout))
}

fn emit_task_event(
    sink: &mut Option<EventSink>,
    kind: EventKind,
    user: &str,
    task: &TaskRecord,
    stats: Option<UserStats>,
) -> Option<String> {
    let sink = sink.as_mut()?;

    let data = TaskEventData {
        id: &task.id,
        title: &task.title,
        priority: task.priority,
        points: task.points,
        is_completed: task.is_completed,
        completed_at: task.completed_at,
        stats,
    };
    let mut event = Event::new(kind, user);
    event.timestamp = task.updated_at;
    let event = match event.with_data(data) {
        Ok(event) => event,
        Err(err) => return Some(format!("event output failed: {err}")),
    };

    if let Err(err) = sink.emit(&event) {
        return Some(format!("event output failed: {err}"));
    }

    None
}

fn describe_task(report: &mut Report, task: &TaskRecord) {
    report.field("Title", task.title.clone());
    report.field("Priority", task.priority.to_string());
    report.field("Points", task.points.to_string());
    report.field(
        "Status",
        if task.is_completed { "completed" } else { "pending" },
    );
    if let Some(completed_at) = task.completed_at {
        report.field("Completed", completed_at.to_rfc3339());
    }
    if let Some(due_at) = task.due_at {
        report.field("Due", due_at.to_rfc3339());
    }
    if let Some(category) = task.category.as_ref() {
        report.field("Category", category.clone());
    }
    report.field("Created", task.created_at.to_rfc3339());
    report.field("Updated", task.updated_at.to_rfc3339());
    if let Some(description) = task.description.as_ref() {
        report.line(description.clone());
    }
}

fn describe_stats(report: &mut Report, stats: &UserStats) {
    report.field("Total points", stats.total_points.to_string());
    report.field("Current streak", days(stats.current_streak));
    report.field("Best streak", days(stats.best_streak));
    report.field("Tasks completed", stats.tasks_completed.to_string());
}

fn days(count: u32) -> String {
    if count == 1 {
        "1 day".to_string()
    } else {
        format!("{count} days")
    }
}
