use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A to-do item as returned by the server.
#[derive(Debug, Eq, PartialEq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub text: String,
    pub completed: bool,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Formats the scheduled date for display, e.g. `Jan 2, 2025 09:00 AM`.
    pub fn display_date(&self) -> String {
        self.date.format("%b %-d, %Y %I:%M %p").to_string()
    }
}

/// Which tasks a view shows.
#[derive(Debug, Default, Eq, PartialEq, Clone, Copy, clap::ValueEnum)]
pub enum TaskFilter {
    #[default]
    All,
    Active,
    Completed,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            TaskFilter::All => true,
            TaskFilter::Active => !task.completed,
            TaskFilter::Completed => task.completed,
        }
    }
}
