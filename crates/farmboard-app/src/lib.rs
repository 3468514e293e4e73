//! Application layer for farmboard.
//!
//! This crate owns the board session: the transition controller, the remote
//! store contract and its in-memory double, notifications, configuration,
//! and the adapters shared by every view.

pub mod clock;
pub mod config;
pub mod controller;
pub mod filter_util;
pub mod memory_store;
pub mod notify;
pub mod remote;
pub mod task_edit;
pub mod views;

// Re-exports for convenience
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{BoardConfig, ProjectConfig};
pub use controller::{BatchFailure, BatchReport, ControllerError, DropTarget, MoveOutcome, TransitionController};
pub use filter_util::{CriteriaBuilder, FilterBuildError, parse_optional_date, parse_sort};
pub use memory_store::{CallCounts, MemoryStoreError, MemoryTaskStore};
pub use notify::{Level, Notification, NotificationLog, Notifier};
pub use remote::RemoteTaskStore;
pub use task_edit::{TaskEdit, TextPatch};
pub use views::{CalendarDay, ExpenseSummary, ExportRow, KanbanBoard, KanbanColumn, TaskReport, calendar, export_rows};
