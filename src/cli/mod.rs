//! Command-line interface for ql
//!
//! This module defines the CLI structure using clap derive macros.
//! Each command family is implemented in its own submodule.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::error::Result;

mod init;
mod task;
mod user;

/// ql - a gamified to-do list
///
/// Tasks earn points by priority when completed; completing something every
/// day builds a streak.
#[derive(Parser, Debug)]
#[command(name = "ql")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data directory (defaults to the platform data dir)
    #[arg(long, global = true, env = "QUESTLOG_DIR")]
    pub data_dir: Option<PathBuf>,

    /// User identity owning the tasks
    #[arg(long, global = true, env = "QUESTLOG_USER")]
    pub user: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit JSONL events for mutations to a file, or `-` for stdout
    #[arg(long, global = true)]
    pub events: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the data directory
    Init,

    /// Task management
    #[command(subcommand)]
    Task(TaskCommands),

    /// Show points, streaks and today's progress
    Stats,

    /// Set or show user identity
    #[command(subcommand)]
    User(UserCommands),
}

/// Task subcommands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a new task
    New {
        /// Task title (at least 3 characters)
        title: String,

        /// Longer description
        #[arg(long)]
        description: Option<String>,

        /// Priority: LOW, MEDIUM, HIGH, URGENT
        #[arg(long)]
        priority: Option<String>,

        /// Due date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        due: Option<String>,

        /// Free-form category
        #[arg(long)]
        category: Option<String>,
    },

    /// List tasks, newest first
    List {
        /// Page number (starting at 1)
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Tasks per page (defaults to tasks.page_size)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show task details
    Show {
        /// Task ID or unique prefix
        id: String,
    },

    /// Edit task fields
    Edit {
        /// Task ID or unique prefix
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// Priority: LOW, MEDIUM, HIGH, URGENT
        #[arg(long)]
        priority: Option<String>,

        /// Due date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        due: Option<String>,

        #[arg(long)]
        category: Option<String>,
    },

    /// Complete a task and collect its points
    Done {
        /// Task ID or unique prefix
        id: String,

        /// Completion time (RFC 3339); defaults to now
        #[arg(long)]
        at: Option<String>,
    },

    /// Mark a completed task as pending again
    Reopen {
        /// Task ID or unique prefix
        id: String,
    },

    /// Delete a task
    Rm {
        /// Task ID or unique prefix
        id: String,
    },
}

/// User subcommands
#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// Persist the user identity for this data directory
    Set {
        /// User name
        name: String,
    },

    /// Show the resolved user identity
    Show,
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Init => init::run(self.data_dir, self.json, self.quiet),
            Commands::Task(cmd) => match cmd {
                TaskCommands::New { title, description, priority, due, category } => {
                    task::run_new(task::NewOptions {
                        title,
                        description,
                        priority,
                        due,
                        category,
                        user: self.user,
                        events: self.events,
                        data_dir: self.data_dir,
                        json: self.json,
                        quiet: self.quiet,
                    })
                }
                TaskCommands::List { page, limit } => task::run_list(task::ListOptions {
                    page,
                    limit,
                    user: self.user,
                    data_dir: self.data_dir,
                    json: self.json,
                    quiet: self.quiet,
                }),
                TaskCommands::Show { id } => task::run_show(task::ShowOptions {
                    id,
                    user: self.user,
                    data_dir: self.data_dir,
                    json: self.json,
                    quiet: self.quiet,
                }),
                TaskCommands::Edit { id, title, description, priority, due, category } => {
                    task::run_edit(task::EditOptions {
                        id,
                        title,
                        description,
                        priority,
                        due,
                        category,
                        user: self.user,
                        events: self.events,
                        data_dir: self.data_dir,
                        json: self.json,
                        quiet: self.quiet,
                    })
                }
                TaskCommands::Done { id, at } => task::run_done(task::DoneOptions {
                    id,
                    at,
                    user: self.user,
                    events: self.events,
                    data_dir: self.data_dir,
                    json: self.json,
                    quiet: self.quiet,
                }),
                TaskCommands::Reopen { id } => task::run_reopen(task::TargetOptions {
                    id,
                    user: self.user,
                    events: self.events,
                    data_dir: self.data_dir,
                    json: self.json,
                    quiet: self.quiet,
                }),
                TaskCommands::Rm { id } => task::run_rm(task::TargetOptions {
                    id,
                    user: self.user,
                    events: self.events,
                    data_dir: self.data_dir,
                    json: self.json,
                    quiet: self.quiet,
                }),
            },
            Commands::Stats => task::run_stats(task::StatsOptions {
                user: self.user,
                data_dir: self.data_dir,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::User(cmd) => match cmd {
                UserCommands::Set { name } => user::run_set(user::SetOptions {
                    name,
                    data_dir: self.data_dir,
                    json: self.json,
                    quiet: self.quiet,
                }),
                UserCommands::Show => user::run_show(user::ShowOptions {
                    data_dir: self.data_dir,
                    user: self.user,
                    json: self.json,
                    quiet: self.quiet,
                }),
            },
        }
    }
}
