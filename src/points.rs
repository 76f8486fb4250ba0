//! Priority levels and the points each one is worth.
//!
//! The table is fixed. Unknown priority labels never fail: they fall back
//! to the default priority (`MEDIUM`, 10 points).

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

pub const ALL_PRIORITIES: [Priority; 4] = [
    Priority::Low,
    Priority::Medium,
    Priority::High,
    Priority::Urgent,
];

/// Points awarded for an unrecognized priority label.
pub const DEFAULT_POINTS: u32 = 10;

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
            Priority::Urgent => "URGENT",
        }
    }

    /// Strict parse; `None` for labels outside the table.
    pub fn parse(label: &str) -> Option<Self> {
        let trimmed = label.trim();
        ALL_PRIORITIES
            .iter()
            .copied()
            .find(|priority| priority.as_str().eq_ignore_ascii_case(trimmed))
    }

    /// Lenient parse; unknown labels become the default.
    pub fn parse_or_default(label: &str) -> Self {
        Self::parse(label).unwrap_or_default()
    }

    pub fn points(&self) -> u32 {
        points_for(*self)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn points_for(priority: Priority) -> u32 {
    match priority {
        Priority::Low => 5,
        Priority::Medium => 10,
        Priority::High => 15,
        Priority::Urgent => 25,
    }
}

/// Points for a raw priority label. Total: unknown labels yield [`DEFAULT_POINTS`].
pub fn points_for_label(label: &str) -> u32 {
    Priority::parse(label)
        .map(points_for)
        .unwrap_or(DEFAULT_POINTS)
}
