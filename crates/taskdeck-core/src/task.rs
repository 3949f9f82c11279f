use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Urgency rank for a task. Variant order is the ordinal rank used when
/// sorting by priority: `Low < Medium < High`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    /// Case-insensitive parse of a priority label. Anything outside the
    /// three levels is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        Self::ALL
            .into_iter()
            .find(|priority| trimmed.eq_ignore_ascii_case(priority.as_str()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single to-do record. `id` is assigned once, on creation, and never
/// changes; every other field may be replaced by an edit-submit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: i64,

    pub name: String,

    pub due: NaiveDate,

    pub priority: Priority,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub completed: bool,
}

impl Task {
    pub fn new(
        id: i64,
        name: String,
        due: NaiveDate,
        priority: Priority,
        description: String,
        completed: bool,
    ) -> Self {
        Self {
            id,
            name,
            due,
            priority,
            description,
            completed,
        }
    }
}
