use chrono::{DateTime, Utc};

use crate::api::TaskApi;
use crate::controller::{Notification, SyncController};
use crate::task::TaskFilter;

/// Something the user asked the front end to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Reload,
    Add {
        text: String,
        date: Option<DateTime<Utc>>,
    },
    Toggle {
        id: String,
    },
    Edit {
        id: String,
        text: String,
    },
    Delete {
        id: String,
    },
    Filter(TaskFilter),
    ClearCompleted,
}

impl Command {
    /// Whether the action reads the cache, so it has to be loaded first.
    pub fn needs_cache(&self) -> bool {
        matches!(self, Command::Toggle { .. })
    }

    /// Whether the cache is current with the server once the action is done.
    pub fn refreshes_cache(&self) -> bool {
        matches!(
            self,
            Command::Reload | Command::Add { .. } | Command::Toggle { .. }
        )
    }
}

impl<A: TaskApi> SyncController<A> {
    /// Runs a single command and leaves the cache ready to display.
    ///
    /// The cache is only loaded up front when the command reads it, so writes
    /// still go out while listing tasks fails.
    pub async fn run_once(&mut self, command: Command) -> Vec<Notification> {
        let mut notifications = Vec::new();
        if command.needs_cache() {
            if let Some(failure) = self.load().await {
                notifications.push(failure);
                return notifications;
            }
        }

        let refreshes_cache = command.refreshes_cache();
        notifications.extend(self.dispatch(command).await);
        if !refreshes_cache {
            notifications.extend(self.load().await);
        }
        notifications
    }

    /// Routes a command to the controller action that handles it.
    ///
    /// Returns the notification to show, if the action produced one.
    pub async fn dispatch(&mut self, command: Command) -> Option<Notification> {
        tracing::debug!("Dispatching {:?}", command);
        match command {
            Command::Reload => self.load().await,
            Command::Add { text, date } => Some(self.add(&text, date).await),
            Command::Toggle { id } => Some(self.toggle(&id).await),
            Command::Edit { id, text } => Some(self.edit(&id, &text).await),
            Command::Delete { id } => Some(self.delete(&id).await),
            Command::Filter(filter) => {
                self.set_filter(filter);
                None
            }
            Command::ClearCompleted => Some(self.clear_completed().await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, MockTaskApi};
    use crate::controller::NotificationKind;
    use crate::retry::RetryPolicy;
    use crate::task::fixtures::task;

    #[tokio::test]
    async fn can_change_filter_without_request() {
        let mut api = MockTaskApi::new();
        api.expect_list_tasks().never();
        let mut controller = SyncController::new(api, RetryPolicy::default());

        let notification = controller
            .dispatch(Command::Filter(TaskFilter::Completed))
            .await;

        assert_eq!(notification, None);
        assert_eq!(controller.filter(), TaskFilter::Completed);
    }

    #[tokio::test]
    async fn can_route_each_write_to_its_request() {
        let mut api = MockTaskApi::new();
        api.expect_list_tasks()
            .times(1)
            .returning(|| Ok(vec![task("a", "one", true, 1)]));
        api.expect_update_task()
            .times(1)
            .returning(|_, _| Ok(task("a", "one", false, 1)));
        api.expect_clear_completed().times(1).returning(|| Ok(0));
        api.expect_delete_task().times(1).returning(|_| Ok(()));
        let mut controller = SyncController::new(api, RetryPolicy::default());

        let reload = controller.dispatch(Command::Reload).await;
        let toggle = controller
            .dispatch(Command::Toggle {
                id: "a".to_string(),
            })
            .await
            .unwrap();
        let clear = controller.dispatch(Command::ClearCompleted).await.unwrap();
        let delete = controller
            .dispatch(Command::Delete {
                id: "a".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(reload, None);
        assert_eq!(toggle.message, "Task marked as uncompleted!");
        assert_eq!(clear.message, "0 completed task(s) cleared!");
        assert_eq!(delete.kind, NotificationKind::Success);
        assert!(controller.tasks().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn can_clear_completed_while_listing_is_unavailable() {
        let mut api = MockTaskApi::new();
        let mut sequence = mockall::Sequence::new();
        api.expect_clear_completed()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|| Ok(1));
        api.expect_list_tasks()
            .times(4)
            .in_sequence(&mut sequence)
            .returning(|| {
                Err(ApiError::Unavailable {
                    message: "Database connection not ready".to_string(),
                })
            });
        let mut controller = SyncController::new(api, RetryPolicy::default());

        let notifications = controller.run_once(Command::ClearCompleted).await;

        assert_eq!(
            notifications,
            vec![
                Notification::success("1 completed task(s) cleared!"),
                Notification::error("Error loading tasks: Database connection not ready"),
            ]
        );
    }

    #[tokio::test]
    async fn can_delete_before_loading_the_cache() {
        let mut api = MockTaskApi::new();
        let mut sequence = mockall::Sequence::new();
        api.expect_delete_task()
            .withf(|id| id == "a")
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Ok(()));
        api.expect_list_tasks()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|| Ok(vec![task("b", "walk", false, 2)]));
        let mut controller = SyncController::new(api, RetryPolicy::default());

        let notifications = controller
            .run_once(Command::Delete {
                id: "a".to_string(),
            })
            .await;

        assert_eq!(
            notifications,
            vec![Notification::success("Task deleted successfully!")]
        );
        assert_eq!(controller.tasks(), &[task("b", "walk", false, 2)]);
    }

    #[tokio::test]
    async fn can_load_cache_before_toggling() {
        let mut api = MockTaskApi::new();
        let mut sequence = mockall::Sequence::new();
        api.expect_list_tasks()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|| Ok(vec![task("a", "one", false, 1)]));
        api.expect_update_task()
            .withf(|id, update| id == "a" && update.completed == Some(true))
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_, _| Ok(task("a", "one", true, 1)));
        let mut controller = SyncController::new(api, RetryPolicy::default());

        let notifications = controller
            .run_once(Command::Toggle {
                id: "a".to_string(),
            })
            .await;

        assert_eq!(
            notifications,
            vec![Notification::success("Task marked as completed!")]
        );
        assert!(controller.tasks()[0].completed);
    }
}
