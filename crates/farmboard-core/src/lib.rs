//! Domain types and pure logic for the farm task board.
//!
//! Nothing in this crate performs I/O: tasks are expanded, filtered and sorted
//! here, while persistence and the optimistic board controller live in the
//! application crate.

/// Calendar helpers.
pub mod date;
/// Expense read model.
pub mod expense;
/// Filter-sort pipeline.
pub mod filter;
/// Identifier types.
pub mod id;
/// Recurrence expansion.
pub mod recurrence;
/// Accessors shared by filterable records.
pub mod record;
/// Task model.
pub mod task;
/// Free-text search.
pub mod text_matcher;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

pub use crate::expense::Expense;
pub use crate::filter::{
    AmountRange, DateWindow, DueBucket, FilterCriteria, Selection, SortKey, SortOrder, SortSpec, view,
};
pub use crate::id::TaskId;
pub use crate::recurrence::{Frequency, Recurrence, expand};
pub use crate::record::ViewRecord;
pub use crate::task::{Priority, Task, TaskDefaults, TaskStatus, TaskTemplate, TaskType, ValidationError};
