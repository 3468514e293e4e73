//! CLI entry point for farmboard.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use farmboard_app::SystemClock;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

mod commands;
mod view;

const DEFAULT_STORE_DIR: &str = "farmboard";
const DEFAULT_STORE_FILE: &str = "tasks.json";

/// Farm task board: recurring field work, kanban moves, and shared filtered views.
#[derive(Parser, Debug)]
#[command(name = "farmboard", version, about = "farmboard: plan and track farm field work")]
struct Cli {
    /// Board file (defaults to the user data directory).
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Directory holding `.farmboard/config.toml` (defaults to current).
    #[arg(long, global = true)]
    workdir: Option<PathBuf>,

    /// Override today's date (YYYY-MM-DD).
    #[arg(long, global = true)]
    today: Option<String>,

    #[command(subcommand)]
    cmd: Command,
}

/// Filter and sort flags shared by every listing view.
#[derive(Args, Debug, Clone, Default)]
struct FilterArgs {
    /// Case-insensitive text matched against title and description.
    #[arg(short = 's', long)]
    search: Option<String>,
    /// Priority (low, medium, high, or all).
    #[arg(short = 'p', long)]
    priority: Option<String>,
    /// Assignee name, or all.
    #[arg(short = 'a', long)]
    assignee: Option<String>,
    /// Due bucket (all, today, week, overdue).
    #[arg(long)]
    due: Option<String>,
    /// Task type, or all.
    #[arg(long = "type")]
    task_type: Option<String>,
    /// Earliest due date (YYYY-MM-DD).
    #[arg(long)]
    since: Option<String>,
    /// Latest due date (YYYY-MM-DD).
    #[arg(long)]
    until: Option<String>,
    /// Sort key (date, name, priority, type).
    #[arg(long)]
    sort: Option<String>,
    /// Sort direction (asc, desc).
    #[arg(long)]
    order: Option<String>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
enum LsFormat {
    #[default]
    Table,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a task, optionally repeating until a date.
    New {
        #[arg(long)]
        title: String,
        /// Due date (YYYY-MM-DD).
        #[arg(long)]
        due: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(short = 'p', long)]
        priority: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(short = 'a', long)]
        assignee: Option<String>,
        #[arg(long = "type")]
        task_type: Option<String>,
        /// Initial column (todo, inprogress, review, done).
        #[arg(long)]
        status: Option<String>,
        /// Repeat daily, weekly, or monthly.
        #[arg(long, requires = "until")]
        repeat: Option<String>,
        /// Last date a repetition may fall on (YYYY-MM-DD).
        #[arg(long, requires = "repeat")]
        until: Option<String>,
    },

    /// List tasks through the shared filter pipeline.
    Ls {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, value_enum, default_value_t = LsFormat::Table)]
        format: LsFormat,
    },

    /// Show the kanban board.
    Board {
        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Show tasks grouped by due date.
    Calendar {
        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Show task counts per status and priority.
    Report {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, value_enum, default_value_t = LsFormat::Table)]
        format: LsFormat,
    },

    /// Move a task to another column, like dropping a card on the board.
    Move {
        task: String,
        /// Target column (todo, inprogress, review, done).
        #[arg(long, conflicts_with = "onto", required_unless_present = "onto")]
        to: Option<String>,
        /// Drop onto another card and join its column.
        #[arg(long)]
        onto: Option<String>,
    },

    /// Edit fields of a task.
    Edit {
        task: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, conflicts_with = "clear_description")]
        description: Option<String>,
        #[arg(long)]
        clear_description: bool,
        #[arg(short = 'p', long)]
        priority: Option<String>,
        #[arg(long)]
        due: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(short = 'a', long, conflicts_with = "clear_assignee")]
        assignee: Option<String>,
        #[arg(long)]
        clear_assignee: bool,
        #[arg(long = "type")]
        task_type: Option<String>,
    },

    /// Flip a task between done and to-do.
    Toggle { task: String },

    /// Move a task to another due date.
    Reschedule {
        task: String,
        /// New due date (YYYY-MM-DD).
        due: String,
    },

    /// Delete one or more tasks.
    Rm {
        #[arg(required = true)]
        tasks: Vec<String>,
    },

    /// Export the filtered task list as JSON rows.
    Export {
        #[command(flatten)]
        filters: FilterArgs,
        /// Write to a file instead of stdout.
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },

    /// Record and report farm expenses.
    #[command(subcommand)]
    Expense(ExpenseCommand),
}

#[derive(Subcommand, Debug)]
enum ExpenseCommand {
    /// Record an expense.
    Add {
        #[arg(long)]
        amount: f64,
        #[arg(long)]
        category: String,
        #[arg(long)]
        description: String,
        /// Day of the expense (defaults to today).
        #[arg(long)]
        date: Option<String>,
    },

    /// List expenses with totals.
    Report {
        #[arg(short = 's', long)]
        search: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// Smallest amount; non-numeric values are ignored.
        #[arg(long)]
        min: Option<String>,
        /// Largest amount; non-numeric values are ignored.
        #[arg(long)]
        max: Option<String>,
        #[arg(long)]
        since: Option<String>,
        #[arg(long)]
        until: Option<String>,
        /// Sort key (date, amount, name, category).
        #[arg(long)]
        sort: Option<String>,
        #[arg(long)]
        order: Option<String>,
        #[arg(long, value_enum, default_value_t = LsFormat::Table)]
        format: LsFormat,
    },
}

fn main() -> Result<()> {
    let Cli {
        store,
        workdir,
        today,
        cmd,
    } = Cli::parse();

    // Read before the runtime spawns its worker threads.
    let clock = SystemClock::local();
    install_tracing();

    let settings = commands::Settings {
        store: store.unwrap_or_else(default_store_path),
        workdir: workdir.unwrap_or_else(|| PathBuf::from(".")),
        today,
        clock,
    };
    let runtime = tokio::runtime::Runtime::new().context("Failed to start the async runtime")?;
    runtime.block_on(commands::run(cmd, &settings))
}

fn default_store_path() -> PathBuf {
    dirs::data_dir().map_or_else(
        || PathBuf::from(".farmboard").join(DEFAULT_STORE_FILE),
        |dir| dir.join(DEFAULT_STORE_DIR).join(DEFAULT_STORE_FILE),
    )
}

fn install_tracing() {
    // RUST_LOG overrides the filter; INFO by default.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(tracing::Level::INFO.as_str()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_new_recurring_command() {
        let cli = Cli::parse_from([
            "farmboard",
            "--store",
            "/tmp/board.json",
            "new",
            "--title",
            "Water field",
            "--due",
            "2024-03-01",
            "--priority",
            "medium",
            "--repeat",
            "weekly",
            "--until",
            "2024-03-22",
        ]);

        assert_eq!(cli.store, Some(PathBuf::from("/tmp/board.json")));
        match cli.cmd {
            Command::New {
                title,
                due,
                priority,
                repeat,
                until,
                ..
            } => {
                assert_eq!(title, "Water field");
                assert_eq!(due, "2024-03-01");
                assert_eq!(priority.as_deref(), Some("medium"));
                assert_eq!(repeat.as_deref(), Some("weekly"));
                assert_eq!(until.as_deref(), Some("2024-03-22"));
            }
            _ => panic!("expected new command"),
        }
    }

    #[test]
    fn repeat_requires_until() {
        let parsed = Cli::try_parse_from([
            "farmboard",
            "new",
            "--title",
            "Water field",
            "--due",
            "2024-03-01",
            "--repeat",
            "weekly",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn parse_ls_with_filters() {
        let cli = Cli::parse_from([
            "farmboard",
            "ls",
            "--priority",
            "high",
            "--due",
            "overdue",
            "--sort",
            "priority",
            "--order",
            "desc",
            "--format",
            "json",
        ]);

        match cli.cmd {
            Command::Ls { filters, format } => {
                assert_eq!(filters.priority.as_deref(), Some("high"));
                assert_eq!(filters.due.as_deref(), Some("overdue"));
                assert_eq!(filters.sort.as_deref(), Some("priority"));
                assert_eq!(filters.order.as_deref(), Some("desc"));
                assert_eq!(format, LsFormat::Json);
            }
            _ => panic!("expected ls command"),
        }
    }

    #[test]
    fn move_needs_exactly_one_target() {
        let cli = Cli::parse_from(["farmboard", "move", "7", "--to", "done"]);
        match cli.cmd {
            Command::Move { task, to, onto } => {
                assert_eq!(task, "7");
                assert_eq!(to.as_deref(), Some("done"));
                assert_eq!(onto, None);
            }
            _ => panic!("expected move command"),
        }

        assert!(Cli::try_parse_from(["farmboard", "move", "7"]).is_err());
        assert!(Cli::try_parse_from(["farmboard", "move", "7", "--to", "done", "--onto", "3"]).is_err());
    }

    #[test]
    fn parse_rm_with_several_ids() {
        let cli = Cli::parse_from(["farmboard", "rm", "1", "2", "3"]);
        match cli.cmd {
            Command::Rm { tasks } => assert_eq!(tasks, vec!["1", "2", "3"]),
            _ => panic!("expected rm command"),
        }
        assert!(Cli::try_parse_from(["farmboard", "rm"]).is_err());
    }

    #[test]
    fn parse_expense_report() {
        let cli = Cli::parse_from([
            "farmboard",
            "expense",
            "report",
            "--min",
            "abc",
            "--sort",
            "amount",
        ]);
        match cli.cmd {
            Command::Expense(ExpenseCommand::Report { min, sort, .. }) => {
                assert_eq!(min.as_deref(), Some("abc"));
                assert_eq!(sort.as_deref(), Some("amount"));
            }
            _ => panic!("expected expense report"),
        }
    }
}
