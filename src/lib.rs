//! questlog - Gamified To-Do Library
//!
//! This library provides the core functionality for the `ql` CLI: tasks
//! that earn points by priority, and daily streaks for consistent work.
//!
//! # Core Concepts
//!
//! - **Points**: Each priority maps to a fixed reward (LOW 5 .. URGENT 25)
//! - **Streaks**: Consecutive calendar days with at least one completion
//! - **Accounting**: One stats update per completion transition
//!
//! # Module Organization
//!
//! - `points`: Priority labels and their point values
//! - `streak`: Current-streak calculation over completion dates
//! - `accounting`: Completion accounting against a `StatsStore`
//! - `task`: Task records, the locked store, pagination and summaries
//! - `user`: User identity resolution
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `questlog.toml`
//! - `error`: Error types and result aliases
//! - `events`: JSONL lifecycle events
//! - `format`: Human-readable formatting helpers
//! - `output`: Human and JSON output envelopes
//! - `storage`: Data directory layout and file I/O
//! - `lock`: File locking and atomic writes for concurrency safety

pub mod accounting;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod format;
pub mod lock;
pub mod output;
pub mod points;
pub mod storage;
pub mod streak;
pub mod task;
pub mod user;

pub use error::{Error, Result};
