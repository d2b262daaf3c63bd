use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::time::Duration;
use todo_list::api::HttpTaskApi;
use todo_list::command::Command;
use todo_list::controller::{NotificationKind, SyncController};
use todo_list::retry::RetryPolicy;
use todo_list::task::TaskFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "todo", about = "Manage tasks on a todo-list server")]
struct Cli {
    /// Base URL of the todo-list server.
    #[arg(long, env = "TODO_SERVER_URL", default_value = "http://localhost:3000")]
    server: String,

    /// Times a request is repeated while the server's store is unavailable.
    #[arg(long, default_value_t = 3)]
    max_retries: u32,

    #[arg(long, default_value_t = 2000)]
    retry_delay_ms: u64,

    /// Which tasks to show after the command runs.
    #[arg(long, value_enum, default_value_t = TaskFilter::All)]
    filter: TaskFilter,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone, Subcommand)]
enum Commands {
    /// Show tasks (the default).
    List,
    Add {
        text: String,
        /// When the task is due, as RFC 3339. Defaults to now on the server.
        #[arg(long)]
        date: Option<DateTime<Utc>>,
    },
    /// Mark a task completed, or active again.
    Toggle { id: String },
    Edit { id: String, text: String },
    Delete { id: String },
    /// Delete every completed task.
    ClearCompleted,
}

impl From<Commands> for Command {
    fn from(command: Commands) -> Self {
        match command {
            Commands::List => Command::Reload,
            Commands::Add { text, date } => Command::Add { text, date },
            Commands::Toggle { id } => Command::Toggle { id },
            Commands::Edit { id, text } => Command::Edit { id, text },
            Commands::Delete { id } => Command::Delete { id },
            Commands::ClearCompleted => Command::ClearCompleted,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();
    let args = Cli::parse();

    let retry = RetryPolicy::new(args.max_retries, Duration::from_millis(args.retry_delay_ms));
    let mut controller = SyncController::new(HttpTaskApi::new(args.server), retry);

    controller.set_filter(args.filter);

    let command = args.command.unwrap_or(Commands::List);
    let notifications = controller.run_once(command.into()).await;

    let mut failures = Vec::new();
    for notification in notifications {
        match notification.kind {
            NotificationKind::Success => println!("{}", notification.message),
            NotificationKind::Error => failures.push(notification.message),
        }
    }

    for task in controller.view() {
        println!(
            "[{}] {}  {}  ({})",
            if task.completed { "x" } else { " " },
            task.text,
            task.display_date(),
            task.id
        );
    }
    println!("{}", controller.tasks_left_label());

    if !failures.is_empty() {
        anyhow::bail!(failures.join("; "));
    }
    Ok(())
}
