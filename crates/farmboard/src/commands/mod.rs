use std::path::PathBuf;

use anyhow::{Context, Result};
use farmboard_app::{
    BoardConfig, FixedClock, Level, Notification, Notifier, ProjectConfig, SystemClock, TransitionController,
    parse_optional_date,
};
use farmboard_core::{TaskId, date::parse_date};
use farmboard_store_file::FileStore;
use tracing::debug;

use crate::Command;

mod handlers;

/// Locations resolved from the global flags.
#[derive(Debug, Clone)]
pub struct Settings {
    pub store: PathBuf,
    pub workdir: PathBuf,
    pub today: Option<String>,
    pub clock: SystemClock,
}

/// Prints notifications for the person at the terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            Level::Success => println!("{notification}"),
            Level::Error => eprintln!("{notification}"),
        }
    }
}

/// Controller type driven by the CLI.
pub type BoardController = TransitionController<FileStore, ConsoleNotifier>;

/// One CLI invocation: the loaded board plus project configuration.
pub struct Session {
    controller: BoardController,
    config: BoardConfig,
}

impl Session {
    /// Open the board file, apply configuration, and load every task.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid, `--today` is not a
    /// date, or the board cannot be read.
    pub async fn open(settings: &Settings) -> Result<Self> {
        let config = ProjectConfig::from_workdir(&settings.workdir)?;
        let store = FileStore::open(&settings.store)?;
        let controller = TransitionController::new(store, ConsoleNotifier);
        let controller = match parse_optional_date("today", settings.today.as_deref())? {
            Some(today) => controller.with_clock(FixedClock(today)),
            None => controller.with_clock(settings.clock),
        };
        let count = controller.load().await?;
        debug!(count, store = %settings.store.display(), "Session opened");
        Ok(Self {
            controller,
            config: config.board,
        })
    }

    pub const fn controller(&self) -> &BoardController {
        &self.controller
    }

    pub const fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub const fn store(&self) -> &FileStore {
        self.controller.store()
    }
}

pub async fn run(command: Command, settings: &Settings) -> Result<()> {
    let session = Session::open(settings).await?;
    handlers::run(command, &session).await
}

fn parse_task_id(raw: &str) -> Result<TaskId> {
    raw.trim()
        .parse()
        .with_context(|| format!("Invalid task id: {raw}"))
}

fn parse_required_date(field: &str, raw: &str) -> Result<time::Date> {
    parse_date(raw.trim()).with_context(|| format!("Invalid {field} date: {raw} (expected YYYY-MM-DD)"))
}
