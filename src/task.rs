//! Task management for questlog.
//!
//! Tasks and per-user aggregates live together in `store.json`. Every
//! mutation runs inside [`TaskStore::transaction`], which holds the store
//! lock from the first read to the last write. A completion therefore
//! updates the task, reads completion timestamps, and writes stats as one
//! single-writer step, persisted with a single rename.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use ulid::Ulid;

use crate::accounting::{CompletionAccountant, StatsStore, StatsUpdate, UserStats};
use crate::config::{Config, TasksConfig};
use crate::error::{Error, Result};
use crate::lock::{StoreLock, DEFAULT_LOCK_TIMEOUT};
use crate::points::{points_for, Priority};
use crate::storage::Storage;
use crate::streak::StreakCalculator;

const STORE_SCHEMA_VERSION: &str = "questlog.store.v1";
const MIN_TITLE_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub owner: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub priority: Priority,
    pub points: u32,
    pub is_completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything persisted in `store.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub tasks: Vec<TaskRecord>,
    /// Per-user aggregates, keyed by user id.
    #[serde(default)]
    pub stats: BTreeMap<String, UserStats>,
}

impl StoreSnapshot {
    pub fn empty() -> Self {
        Self {
            schema_version: STORE_SCHEMA_VERSION.to_string(),
            generated_at: Utc::now(),
            tasks: Vec::new(),
            stats: BTreeMap::new(),
        }
    }
}

/// Fields accepted when creating a task.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub due_at: Option<DateTime<Utc>>,
    pub category: Option<String>,
}

/// The complete set of fields an update may touch. Anything not listed here
/// is never written by [`TaskStore::update_task`].
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub due_at: Option<DateTime<Utc>>,
    pub category: Option<String>,
    pub completed: Option<bool>,
    /// Completion instant for a completion transition; defaults to `now`.
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.due_at.is_none()
            && self.category.is_none()
            && self.completed.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionTransition {
    Unchanged,
    Completed,
    Reopened,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskUpdateOutcome {
    pub task: TaskRecord,
    pub transition: CompletionTransition,
    /// Stats after accounting; present only for a completion transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<UserStats>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub current_page: usize,
    pub total_pages: usize,
    pub total_tasks: usize,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskPage {
    pub tasks: Vec<TaskRecord>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub user_stats: UserStats,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub pending_tasks: usize,
    pub today_tasks: usize,
    pub today_completed: usize,
    pub completion_rate: u32,
}

#[derive(Debug, Clone)]
pub struct TaskStore {
    storage: Storage,
    config: TasksConfig,
    accountant: CompletionAccountant,
}

impl TaskStore {
    pub fn new(storage: Storage, config: &Config) -> Result<Self> {
        let streaks = StreakCalculator::new(config.streaks.offset()?);
        Ok(Self {
            storage,
            config: config.tasks.clone(),
            accountant: CompletionAccountant::new(streaks),
        })
    }

    /// Open the store with the configuration found in its data directory.
    pub fn open(storage: Storage) -> Result<Self> {
        let config = Config::load_from_dir(storage.data_dir())?;
        Self::new(storage, &config)
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn config(&self) -> &TasksConfig {
        &self.config
    }

    pub fn streaks(&self) -> &StreakCalculator {
        self.accountant.streaks()
    }

    /// Run `f` against the store snapshot while holding the store lock.
    ///
    /// Changes are written only if `f` succeeds.
    pub fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut StoreTransaction) -> Result<T>,
    {
        self.storage.init()?;
        let _lock = StoreLock::acquire(self.storage.lock_file(), DEFAULT_LOCK_TIMEOUT)?;

        let mut tx = StoreTransaction {
            snapshot: self.load()?,
            dirty: false,
        };
        let result = f(&mut tx)?;

        if tx.dirty {
            tx.snapshot.generated_at = Utc::now();
            sort_tasks(&mut tx.snapshot.tasks);
            self.storage.write_json(&self.storage.store_file(), &tx.snapshot)?;
        }
        Ok(result)
    }

    pub fn create_task(
        &self,
        user: &str,
        new: NewTask,
        now: DateTime<Utc>,
    ) -> Result<TaskRecord> {
        let title = normalize_title(&new.title)?;
        let priority = new
            .priority
            .unwrap_or_else(|| self.config.default_priority());

        let task = TaskRecord {
            id: Ulid::new().to_string().to_ascii_lowercase(),
            owner: user.to_string(),
            title,
            description: normalize_text(new.description.as_deref()),
            priority,
            points: points_for(priority),
            is_completed: false,
            completed_at: None,
            due_at: new.due_at,
            category: normalize_text(new.category.as_deref()),
            created_at: now,
            updated_at: now,
        };

        self.transaction(|tx| {
            tx.insert(task.clone());
            Ok(())
        })?;
        info!(user, task_id = %task.id, priority = %task.priority, "task created");
        Ok(task)
    }

    /// The user's tasks, newest first, one page at a time (pages start at 1).
    pub fn list_tasks(&self, user: &str, page: usize, limit: usize) -> Result<TaskPage> {
        if page == 0 {
            return Err(Error::InvalidArgument("page must be >= 1".to_string()));
        }
        if limit == 0 {
            return Err(Error::InvalidArgument("limit must be >= 1".to_string()));
        }

        let mut tasks = self.user_tasks(user)?;
        sort_tasks(&mut tasks);

        let total_tasks = tasks.len();
        let total_pages = total_tasks.div_ceil(limit);
        let tasks = tasks
            .into_iter()
            .skip((page - 1).saturating_mul(limit))
            .take(limit)
            .collect();

        Ok(TaskPage {
            tasks,
            pagination: Pagination {
                current_page: page,
                total_pages,
                total_tasks,
                has_next_page: page < total_pages,
                has_prev_page: page > 1,
            },
        })
    }

    pub fn get_task(&self, user: &str, id: &str) -> Result<TaskRecord> {
        let tasks = self.user_tasks(user)?;
        let resolved = resolve_task_id(&tasks, id)?;
        tasks
            .into_iter()
            .find(|task| task.id == resolved)
            .ok_or_else(|| Error::TaskNotFound(id.trim().to_string()))
    }

    pub fn update_task(
        &self,
        user: &str,
        id: &str,
        update: TaskUpdate,
        now: DateTime<Utc>,
    ) -> Result<TaskUpdateOutcome> {
        if update.is_empty() {
            return Err(Error::InvalidArgument("no fields to update".to_string()));
        }
        let title = update.title.as_deref().map(normalize_title).transpose()?;

        let outcome = self.transaction(|tx| {
            let resolved = tx.resolve_task_id(user, id)?;
            let task = tx.task_mut(&resolved)?;

            // Accrual uses the point value as of the last save.
            let accrued_points = task.points;
            let was_completed = task.is_completed;

            if let Some(title) = title {
                task.title = title;
            }
            if let Some(description) = update.description.as_deref() {
                task.description = normalize_text(Some(description));
            }
            if let Some(category) = update.category.as_deref() {
                task.category = normalize_text(Some(category));
            }
            if let Some(due_at) = update.due_at {
                task.due_at = Some(due_at);
            }
            if let Some(priority) = update.priority {
                if priority != task.priority {
                    task.priority = priority;
                    task.points = points_for(priority);
                }
            }

            let transition = match update.completed {
                Some(true) if !was_completed => {
                    task.is_completed = true;
                    task.completed_at = Some(update.completed_at.unwrap_or(now));
                    CompletionTransition::Completed
                }
                Some(false) => {
                    task.is_completed = false;
                    task.completed_at = None;
                    if was_completed {
                        CompletionTransition::Reopened
                    } else {
                        CompletionTransition::Unchanged
                    }
                }
                _ => CompletionTransition::Unchanged,
            };
            task.updated_at = now;
            let task = task.clone();

            let stats = if transition == CompletionTransition::Completed {
                Some(self.accountant.on_task_completed(tx, user, accrued_points)?)
            } else {
                None
            };

            Ok(TaskUpdateOutcome {
                task,
                transition,
                stats,
            })
        })?;

        info!(
            user,
            task_id = %outcome.task.id,
            transition = ?outcome.transition,
            "task updated"
        );
        Ok(outcome)
    }

    pub fn delete_task(&self, user: &str, id: &str) -> Result<TaskRecord> {
        let removed = self.transaction(|tx| {
            let resolved = tx.resolve_task_id(user, id)?;
            tx.remove(&resolved)
        })?;
        info!(user, task_id = %removed.id, "task deleted");
        Ok(removed)
    }

    /// Stored aggregate for `user`, or zeros if nothing was completed yet.
    pub fn user_stats(&self, user: &str) -> Result<UserStats> {
        Ok(self.load()?.stats.get(user).copied().unwrap_or_default())
    }

    pub fn summary(&self, user: &str, now: DateTime<Utc>) -> Result<DashboardSummary> {
        let snapshot = self.load()?;
        let user_stats = snapshot.stats.get(user).copied().unwrap_or_default();
        let tasks: Vec<TaskRecord> = snapshot
            .tasks
            .into_iter()
            .filter(|task| task.owner == user)
            .collect();
        let streaks = self.streaks();
        let today = streaks.calendar_date(now);

        let total_tasks = tasks.len();
        let completed_tasks = tasks.iter().filter(|task| task.is_completed).count();
        let today_tasks = tasks
            .iter()
            .filter(|task| streaks.calendar_date(task.created_at) == today)
            .count();
        let today_completed = tasks
            .iter()
            .filter(|task| task.is_completed)
            .filter_map(|task| task.completed_at)
            .filter(|completed_at| streaks.calendar_date(*completed_at) == today)
            .count();
        let completion_rate = if total_tasks > 0 {
            ((completed_tasks as f64 / total_tasks as f64) * 100.0).round() as u32
        } else {
            0
        };

        Ok(DashboardSummary {
            user_stats,
            total_tasks,
            completed_tasks,
            pending_tasks: total_tasks - completed_tasks,
            today_tasks,
            today_completed,
            completion_rate,
        })
    }

    fn user_tasks(&self, user: &str) -> Result<Vec<TaskRecord>> {
        Ok(self
            .load()?
            .tasks
            .into_iter()
            .filter(|task| task.owner == user)
            .collect())
    }

    fn load(&self) -> Result<StoreSnapshot> {
        Ok(self
            .storage
            .read_json_opt(&self.storage.store_file())?
            .unwrap_or_else(StoreSnapshot::empty))
    }
}

/// The store snapshot as seen under the store lock.
pub struct StoreTransaction {
    snapshot: StoreSnapshot,
    dirty: bool,
}

impl StoreTransaction {
    pub fn resolve_task_id(&self, user: &str, input: &str) -> Result<String> {
        let owned: Vec<&TaskRecord> = self
            .snapshot
            .tasks
            .iter()
            .filter(|task| task.owner == user)
            .collect();
        resolve_task_id(owned, input)
    }

    pub fn task_mut(&mut self, id: &str) -> Result<&mut TaskRecord> {
        self.dirty = true;
        self.snapshot
            .tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))
    }

    pub fn insert(&mut self, task: TaskRecord) {
        self.dirty = true;
        self.snapshot.tasks.push(task);
    }

    pub fn remove(&mut self, id: &str) -> Result<TaskRecord> {
        let index = self
            .snapshot
            .tasks
            .iter()
            .position(|task| task.id == id)
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;
        self.dirty = true;
        Ok(self.snapshot.tasks.remove(index))
    }
}

impl StatsStore for StoreTransaction {
    fn completion_timestamps(&self, user: &str) -> Result<Vec<DateTime<Utc>>> {
        Ok(self
            .snapshot
            .tasks
            .iter()
            .filter(|task| task.owner == user && task.is_completed)
            .filter_map(|task| task.completed_at)
            .collect())
    }

    fn get_or_create_user_stats(&mut self, user: &str) -> Result<UserStats> {
        if let Some(stats) = self.snapshot.stats.get(user) {
            return Ok(*stats);
        }
        debug!(user, "creating user stats");
        self.dirty = true;
        self.snapshot.stats.insert(user.to_string(), UserStats::default());
        Ok(UserStats::default())
    }

    fn apply_stats_update(&mut self, user: &str, update: &StatsUpdate) -> Result<()> {
        self.dirty = true;
        self.snapshot
            .stats
            .entry(user.to_string())
            .or_default()
            .apply(update);
        Ok(())
    }
}

/// Trim and check the minimum title length.
pub fn normalize_title(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.chars().count() < MIN_TITLE_LEN {
        return Err(Error::InvalidArgument(format!(
            "title must be at least {MIN_TITLE_LEN} characters long"
        )));
    }
    Ok(trimmed.to_string())
}

fn normalize_text(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn sort_tasks(tasks: &mut [TaskRecord]) {
    tasks.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

/// Resolve a full id or a unique id prefix among `tasks`.
fn resolve_task_id<'a, I>(tasks: I, input: &str) -> Result<String>
where
    I: IntoIterator<Item = &'a TaskRecord>,
{
    let needle = input.trim().to_ascii_lowercase();
    if needle.is_empty() {
        return Err(Error::InvalidArgument("task id cannot be empty".to_string()));
    }

    let mut matches: Vec<String> = Vec::new();
    for task in tasks {
        if task.id == needle {
            return Ok(task.id.clone());
        }
        if task.id.starts_with(&needle) {
            matches.push(task.id.clone());
        }
    }

    match matches.len() {
        0 => Err(Error::TaskNotFound(input.trim().to_string())),
        1 => Ok(matches.remove(0)),
        _ => {
            matches.sort();
            Err(Error::InvalidArgument(format!(
                "ambiguous task id '{}': {}",
                input.trim(),
                matches.join(", ")
            )))
        }
    }
}
