//! Read-only adapters that shape pipeline output for the board, calendar and reports.
//!
//! Every adapter takes the already filtered and ordered list and never
//! mutates it. Order inside a column, day or export is the input order.

use std::collections::BTreeMap;

use farmboard_core::date::format_date;
use farmboard_core::{Expense, Priority, Task, TaskStatus};
use serde::Serialize;
use time::Date;

/// One kanban column.
#[derive(Debug, Clone)]
pub struct KanbanColumn<'a> {
    /// Workflow state shown by this column.
    pub status: TaskStatus,
    /// Cards in view order.
    pub tasks: Vec<&'a Task>,
}

/// The four-column board.
#[derive(Debug, Clone)]
pub struct KanbanBoard<'a> {
    /// Columns in workflow order.
    pub columns: [KanbanColumn<'a>; 4],
}

impl<'a> KanbanBoard<'a> {
    /// Distribute `tasks` over the columns, keeping their relative order.
    pub fn build<I>(tasks: I) -> Self
    where
        I: IntoIterator<Item = &'a Task>,
    {
        let mut columns = TaskStatus::ALL.map(|status| KanbanColumn {
            status,
            tasks: Vec::new(),
        });
        for task in tasks {
            if let Some(column) = columns.iter_mut().find(|column| column.status == task.status()) {
                column.tasks.push(task);
            }
        }
        Self { columns }
    }

    /// Column for `status`.
    #[must_use]
    pub fn column(&self, status: TaskStatus) -> &KanbanColumn<'a> {
        let idx = TaskStatus::ALL
            .iter()
            .position(|candidate| *candidate == status)
            .unwrap_or_default();
        &self.columns[idx]
    }
}

/// Tasks due on one calendar day.
#[derive(Debug, Clone)]
pub struct CalendarDay<'a> {
    /// The day.
    pub date: Date,
    /// Tasks due that day, in view order.
    pub tasks: Vec<&'a Task>,
}

/// Group `tasks` by due date, earliest day first.
pub fn calendar<'a, I>(tasks: I) -> Vec<CalendarDay<'a>>
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut days: BTreeMap<Date, Vec<&'a Task>> = BTreeMap::new();
    for task in tasks {
        days.entry(task.due_date).or_default().push(task);
    }
    days.into_iter()
        .map(|(date, tasks)| CalendarDay { date, tasks })
        .collect()
}

/// Aggregate counts for the task report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskReport {
    /// Tasks in the view.
    pub total: usize,
    /// Tasks in `Done`.
    pub completed: usize,
    /// Open tasks whose due date has passed.
    pub overdue: usize,
    /// Share of completed tasks, `0.0` for an empty view.
    pub completion_rate: f64,
    /// Count per column, in workflow order.
    pub by_status: Vec<(TaskStatus, usize)>,
    /// Count per priority, highest first.
    pub by_priority: Vec<(Priority, usize)>,
}

impl TaskReport {
    /// Summarize `tasks` as of `today`.
    pub fn build<'a, I>(tasks: I, today: Date) -> Self
    where
        I: IntoIterator<Item = &'a Task>,
    {
        let mut by_status = TaskStatus::ALL.map(|status| (status, 0_usize));
        let mut by_priority = Priority::ALL.map(|priority| (priority, 0_usize));
        let (mut total, mut completed, mut overdue) = (0_usize, 0_usize, 0_usize);
        for task in tasks {
            total += 1;
            if task.completed() {
                completed += 1;
            } else if task.due_date < today {
                overdue += 1;
            }
            if let Some(slot) = by_status.iter_mut().find(|(status, _)| *status == task.status()) {
                slot.1 += 1;
            }
            if let Some(slot) = by_priority.iter_mut().find(|(priority, _)| *priority == task.priority) {
                slot.1 += 1;
            }
        }
        by_priority.reverse();
        Self {
            total,
            completed,
            overdue,
            completion_rate: ratio(completed, total),
            by_status: by_status.to_vec(),
            by_priority: by_priority.to_vec(),
        }
    }
}

/// Totals for the expense report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseSummary {
    /// Number of expenses in the view.
    pub count: usize,
    /// Sum of all amounts.
    pub total: f64,
    /// Mean amount, `0.0` for an empty view.
    pub average: f64,
    /// Sum per category, largest first.
    pub by_category: Vec<(String, f64)>,
}

impl ExpenseSummary {
    /// Summarize `expenses`.
    pub fn build<'a, I>(expenses: I) -> Self
    where
        I: IntoIterator<Item = &'a Expense>,
    {
        let mut count = 0_usize;
        let mut total = 0.0_f64;
        let mut by_category: BTreeMap<&str, f64> = BTreeMap::new();
        for expense in expenses {
            count += 1;
            total += expense.amount;
            *by_category.entry(expense.category.as_str()).or_default() += expense.amount;
        }
        let mut by_category: Vec<(String, f64)> = by_category
            .into_iter()
            .map(|(category, sum)| (category.to_owned(), sum))
            .collect();
        by_category.sort_by(|a, b| b.1.total_cmp(&a.1));
        Self {
            count,
            total,
            average: if count == 0 { 0.0 } else { total / count_as_f64(count) },
            by_category,
        }
    }

    /// Category with the largest total.
    #[must_use]
    pub fn top_category(&self) -> Option<&str> {
        self.by_category.first().map(|(category, _)| category.as_str())
    }
}

/// Flat, serializable row handed to export writers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRow {
    /// Task id in textual form.
    pub id: String,
    /// Title.
    pub title: String,
    /// Description, empty when absent.
    pub description: String,
    /// Priority name.
    pub priority: String,
    /// Column label.
    pub status: String,
    /// Whether the task is done.
    pub completed: bool,
    /// `YYYY-MM-DD` due date.
    pub due_date: String,
    /// `YYYY-MM-DD` completion date, empty when open.
    pub completion_date: String,
    /// Field or greenhouse.
    pub location: String,
    /// Assignee, empty when unassigned.
    pub assignee: String,
    /// Task type tag.
    pub task_type: String,
}

impl From<&Task> for ExportRow {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.to_string(),
            title: task.title.clone(),
            description: task.description.clone().unwrap_or_default(),
            priority: task.priority.to_string(),
            status: task.status().label().to_owned(),
            completed: task.completed(),
            due_date: format_date(task.due_date),
            completion_date: task.completion_date().map(format_date).unwrap_or_default(),
            location: task.location.clone(),
            assignee: task.assignee.clone().unwrap_or_default(),
            task_type: task.task_type.to_string(),
        }
    }
}

/// Convert an ordered task list into export rows, preserving order.
pub fn export_rows<'a, I>(tasks: I) -> Vec<ExportRow>
where
    I: IntoIterator<Item = &'a Task>,
{
    tasks.into_iter().map(ExportRow::from).collect()
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    count_as_f64(part) / count_as_f64(whole)
}

#[allow(clippy::cast_precision_loss)]
const fn count_as_f64(count: usize) -> f64 {
    count as f64
}
