use chrono::{DateTime, Utc};

use crate::api::{TaskApi, TaskUpdate};
use crate::retry::RetryPolicy;
use crate::task::{Task, TaskFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

/// A message for the user describing how an action turned out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            message: message.into(),
        }
    }
}

/// Keeps a local copy of the server's tasks in step with every write.
///
/// All requests go through the same [`RetryPolicy`], so a briefly
/// disconnected server store is retried the same way for every action.
pub struct SyncController<A: TaskApi> {
    api: A,
    retry: RetryPolicy,
    tasks: Vec<Task>,
    filter: TaskFilter,
}

impl<A: TaskApi> SyncController<A> {
    pub fn new(api: A, retry: RetryPolicy) -> Self {
        Self {
            api,
            retry,
            tasks: Vec::new(),
            filter: TaskFilter::default(),
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn filter(&self) -> TaskFilter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: TaskFilter) {
        self.filter = filter;
    }

    /// Tasks matching the current filter, earliest date first.
    pub fn view(&self) -> Vec<&Task> {
        let mut visible: Vec<&Task> = self
            .tasks
            .iter()
            .filter(|task| self.filter.matches(task))
            .collect();
        visible.sort_by_key(|task| task.date);
        visible
    }

    pub fn active_count(&self) -> usize {
        self.tasks.iter().filter(|task| !task.completed).count()
    }

    pub fn tasks_left_label(&self) -> String {
        match self.active_count() {
            1 => "1 task left".to_string(),
            count => format!("{} tasks left", count),
        }
    }

    /// Replaces the cache with the server's current list.
    #[tracing::instrument(skip(self))]
    pub async fn load(&mut self) -> Option<Notification> {
        match self.retry.run("load tasks", || self.api.list_tasks()).await {
            Ok(tasks) => {
                tracing::debug!("Loaded {} tasks", tasks.len());
                self.tasks = tasks;
                None
            }
            Err(err) => {
                tracing::error!("Failed to load tasks: {}", err);
                Some(Notification::error(format!("Error loading tasks: {}", err)))
            }
        }
    }

    /// Creates a task and reloads so server-assigned fields are reflected.
    #[tracing::instrument(skip(self))]
    pub async fn add(&mut self, text: &str, date: Option<DateTime<Utc>>) -> Notification {
        let text = text.trim();
        if text.is_empty() {
            return Notification::error("Task text is required");
        }

        match self
            .retry
            .run("add task", || self.api.create_task(text, date))
            .await
        {
            Ok(task) => {
                tracing::info!("Added task {}", task.id);
                match self.load().await {
                    Some(failure) => failure,
                    None => Notification::success("Task added successfully!"),
                }
            }
            Err(err) => Notification::error(format!("Failed to add task: {}", err)),
        }
    }

    /// Flips the completed flag of a cached task.
    #[tracing::instrument(skip(self))]
    pub async fn toggle(&mut self, id: &str) -> Notification {
        let Some(task) = self.tasks.iter().find(|task| task.id == id) else {
            return Notification::error("Failed to update task: Task not found");
        };
        let update = TaskUpdate {
            text: None,
            completed: Some(!task.completed),
        };

        match self
            .retry
            .run("update task", || self.api.update_task(id, update.clone()))
            .await
        {
            Ok(updated) => {
                let state = if updated.completed {
                    "completed"
                } else {
                    "uncompleted"
                };
                self.replace(updated);
                Notification::success(format!("Task marked as {}!", state))
            }
            Err(err) => Notification::error(format!("Failed to update task: {}", err)),
        }
    }

    /// Changes the text of a task.
    #[tracing::instrument(skip(self))]
    pub async fn edit(&mut self, id: &str, text: &str) -> Notification {
        let text = text.trim();
        if text.is_empty() {
            return Notification::error("Task text is required");
        }
        let update = TaskUpdate {
            text: Some(text.to_string()),
            completed: None,
        };

        match self
            .retry
            .run("update task", || self.api.update_task(id, update.clone()))
            .await
        {
            Ok(updated) => {
                self.replace(updated);
                Notification::success("Task updated successfully!")
            }
            Err(err) => Notification::error(format!("Failed to update task: {}", err)),
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&mut self, id: &str) -> Notification {
        let text = self
            .tasks
            .iter()
            .find(|task| task.id == id)
            .map(|task| task.text.clone());

        match self
            .retry
            .run("delete task", || self.api.delete_task(id))
            .await
        {
            Ok(()) => {
                self.tasks.retain(|task| task.id != id);
                match text {
                    Some(text) => {
                        Notification::success(format!("Task \"{}\" deleted successfully!", text))
                    }
                    None => Notification::success("Task deleted successfully!"),
                }
            }
            Err(err) => Notification::error(format!("Failed to delete task: {}", err)),
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn clear_completed(&mut self) -> Notification {
        match self
            .retry
            .run("clear completed tasks", || self.api.clear_completed())
            .await
        {
            Ok(count) => {
                self.tasks.retain(|task| !task.completed);
                Notification::success(format!("{} completed task(s) cleared!", count))
            }
            Err(err) => {
                Notification::error(format!("Failed to clear completed tasks: {}", err))
            }
        }
    }

    fn replace(&mut self, updated: Task) {
        match self.tasks.iter_mut().find(|task| task.id == updated.id) {
            Some(existing) => *existing = updated,
            None => self.tasks.push(updated),
        }
    }
}
