use chrono::{DateTime, Utc};

use crate::entities::task;

pub mod api;

#[derive(Debug, PartialEq, Clone, Eq)]
pub struct Task {
    id: String,
    text: String,
    completed: bool,
    date: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(
        id: String,
        text: String,
        completed: bool,
        date: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            text,
            completed,
            date,
            created_at,
        }
    }

    /// Returns the ID of the task.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the text of the task.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns whether the task is completed.
    pub fn completed(&self) -> bool {
        self.completed
    }

    /// Returns the scheduled time of the task.
    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    /// Returns when the task was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl From<task::Model> for Task {
    fn from(model: task::Model) -> Self {
        Task::new(
            model.id,
            model.text,
            model.completed,
            model.date,
            model.created_at,
        )
    }
}

/// Fields accepted when creating a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub text: String,
    /// Defaults to the creation time when absent.
    pub date: Option<DateTime<Utc>>,
}

/// Partial update of a task. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskChanges {
    pub text: Option<String>,
    pub completed: Option<bool>,
}
