//! Plain-text rendering of board views for the terminal.

use std::borrow::Cow;
use std::fmt::Write as _;

use farmboard_app::{CalendarDay, ExpenseSummary, KanbanBoard, TaskReport};
use farmboard_core::date::{days_until, format_date};
use farmboard_core::{Expense, Task};
use time::Date;
use unicode_segmentation::UnicodeSegmentation;

const TITLE_WIDTH: usize = 36;
const ASSIGNEE_WIDTH: usize = 14;
const CATEGORY_WIDTH: usize = 14;

/// Shorten `input` to at most `max_graphemes`, marking the cut with `...`.
pub fn truncate_with_ellipsis(input: &str, max_graphemes: usize) -> Cow<'_, str> {
    const ELLIPSIS: &str = "...";
    const ELLIPSIS_GRAPHEMES: usize = 3;

    if max_graphemes == 0 {
        return Cow::Owned(String::new());
    }

    let grapheme_count = input.graphemes(true).count();
    if grapheme_count <= max_graphemes {
        return Cow::Borrowed(input);
    }

    if max_graphemes <= ELLIPSIS_GRAPHEMES {
        return Cow::Owned(input.graphemes(true).take(max_graphemes).collect());
    }

    let keep = max_graphemes - ELLIPSIS_GRAPHEMES;
    let mut truncated: String = input.graphemes(true).take(keep).collect();
    truncated.push_str(ELLIPSIS);
    Cow::Owned(truncated)
}

/// Truncate and left-align `input` in a cell `width` graphemes wide.
fn cell(input: &str, width: usize) -> String {
    let text = truncate_with_ellipsis(input, width);
    let pad = width.saturating_sub(text.graphemes(true).count());
    format!("{text}{}", " ".repeat(pad))
}

/// Relative wording for a due date.
pub fn due_hint(due: Date, today: Date) -> String {
    match days_until(due, today) {
        0 => "today".to_owned(),
        1 => "tomorrow".to_owned(),
        -1 => "1 day overdue".to_owned(),
        days if days < 0 => format!("{} days overdue", -days),
        days => format!("in {days} days"),
    }
}

/// Table of tasks in view order.
pub fn render_table(tasks: &[Task], today: Date) -> String {
    if tasks.is_empty() {
        return "No tasks match.\n".to_owned();
    }
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<6} {:<10} {:<8} {:<11} {} {}",
        "ID",
        "DUE",
        "PRIORITY",
        "STATUS",
        cell("TITLE", TITLE_WIDTH),
        "ASSIGNEE"
    );
    for task in tasks {
        let overdue = if !task.completed() && task.due_date < today { " !" } else { "" };
        let _ = writeln!(
            out,
            "{:<6} {:<10} {:<8} {:<11} {} {}{overdue}",
            task.id.to_string(),
            format_date(task.due_date),
            task.priority.as_str(),
            task.status().label(),
            cell(&task.title, TITLE_WIDTH),
            truncate_with_ellipsis(task.assignee.as_deref().unwrap_or("-"), ASSIGNEE_WIDTH),
        );
    }
    out
}

/// The four columns, one block each, cards in view order.
pub fn render_board(board: &KanbanBoard<'_>, today: Date) -> String {
    let mut out = String::new();
    for column in &board.columns {
        let _ = writeln!(out, "{} ({})", column.status.label(), column.tasks.len());
        if column.tasks.is_empty() {
            out.push_str("  (empty)\n");
        }
        for task in &column.tasks {
            let _ = writeln!(
                out,
                "  #{} {} [{}] {} · {}",
                task.id,
                truncate_with_ellipsis(&task.title, TITLE_WIDTH),
                task.priority,
                due_hint(task.due_date, today),
                task.location,
            );
        }
        out.push('\n');
    }
    out
}

/// Days in date order with their tasks.
pub fn render_calendar(days: &[CalendarDay<'_>], today: Date) -> String {
    if days.is_empty() {
        return "No tasks scheduled.\n".to_owned();
    }
    let mut out = String::new();
    for day in days {
        let _ = writeln!(out, "{} ({})", format_date(day.date), due_hint(day.date, today));
        for task in &day.tasks {
            let mark = if task.completed() { 'x' } else { ' ' };
            let _ = writeln!(
                out,
                "  [{mark}] #{} {} · {}",
                task.id,
                truncate_with_ellipsis(&task.title, TITLE_WIDTH),
                task.location
            );
        }
    }
    out
}

/// Counts per status and priority.
pub fn render_report(report: &TaskReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Total tasks: {}", report.total);
    let _ = writeln!(
        out,
        "Completed:   {} ({:.0}%)",
        report.completed,
        report.completion_rate * 100.0
    );
    let _ = writeln!(out, "Overdue:     {}", report.overdue);
    out.push_str("\nBy status:\n");
    for (status, count) in &report.by_status {
        let _ = writeln!(out, "  {:<12} {count}", status.label());
    }
    out.push_str("\nBy priority:\n");
    for (priority, count) in &report.by_priority {
        let _ = writeln!(out, "  {:<12} {count}", priority.as_str());
    }
    out
}

/// Expense rows followed by their totals.
pub fn render_expenses(expenses: &[&Expense], summary: &ExpenseSummary) -> String {
    if expenses.is_empty() {
        return "No expenses match.\n".to_owned();
    }
    let mut out = String::new();
    for expense in expenses {
        let _ = writeln!(
            out,
            "{} {:>10.2}  {} {}",
            format_date(expense.date),
            expense.amount,
            cell(&expense.category, CATEGORY_WIDTH),
            truncate_with_ellipsis(&expense.description, TITLE_WIDTH),
        );
    }
    let _ = writeln!(
        out,
        "\nTotal: {:.2} across {} expenses (average {:.2})",
        summary.total, summary.count, summary.average
    );
    for (category, sum) in &summary.by_category {
        let _ = writeln!(out, "  {} {sum:>10.2}", cell(category, CATEGORY_WIDTH));
    }
    out
}
