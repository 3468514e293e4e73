use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use farmboard_app::{
    CriteriaBuilder, DropTarget, ExpenseSummary, KanbanBoard, MoveOutcome, TaskEdit, TaskReport, TextPatch, calendar,
    export_rows, parse_optional_date, parse_sort,
};
use farmboard_core::date::format_date;
use farmboard_core::filter::{self, FilterCriteria, SortSpec};
use farmboard_core::{Expense, Frequency, Recurrence, Task, TaskStatus, TaskTemplate};
use tracing::debug;

use super::{Session, parse_required_date, parse_task_id};
use crate::view;
use crate::{Command, ExpenseCommand, FilterArgs, LsFormat};

pub async fn run(command: Command, session: &Session) -> Result<()> {
    match command {
        Command::New {
            title,
            due,
            description,
            priority,
            location,
            assignee,
            task_type,
            status,
            repeat,
            until,
        } => {
            let form = NewTaskForm {
                title,
                due,
                description,
                priority,
                location,
                assignee,
                task_type,
                status,
                repeat,
                until,
            };
            handle_new(session, form).await
        }
        Command::Ls { filters, format } => handle_ls(session, &filters, format).await,
        Command::Board { filters } => handle_board(session, &filters).await,
        Command::Calendar { filters } => handle_calendar(session, &filters).await,
        Command::Report { filters, format } => handle_report(session, &filters, format).await,
        Command::Move { task, to, onto } => handle_move(session, &task, to.as_deref(), onto.as_deref()).await,
        Command::Edit {
            task,
            title,
            description,
            clear_description,
            priority,
            due,
            status,
            location,
            assignee,
            clear_assignee,
            task_type,
        } => {
            let form = EditForm {
                title,
                description: text_patch(description, clear_description),
                priority,
                due,
                status,
                location,
                assignee: text_patch(assignee, clear_assignee),
                task_type,
            };
            handle_edit(session, &task, form).await
        }
        Command::Toggle { task } => handle_toggle(session, &task).await,
        Command::Reschedule { task, due } => handle_reschedule(session, &task, &due).await,
        Command::Rm { tasks } => handle_rm(session, &tasks).await,
        Command::Export { filters, output } => handle_export(session, &filters, output.as_deref()).await,
        Command::Expense(command) => handle_expense(session, command),
    }
}

struct NewTaskForm {
    title: String,
    due: String,
    description: Option<String>,
    priority: Option<String>,
    location: Option<String>,
    assignee: Option<String>,
    task_type: Option<String>,
    status: Option<String>,
    repeat: Option<String>,
    until: Option<String>,
}

struct EditForm {
    title: Option<String>,
    description: Option<TextPatch>,
    priority: Option<String>,
    due: Option<String>,
    status: Option<String>,
    location: Option<String>,
    assignee: Option<TextPatch>,
    task_type: Option<String>,
}

fn text_patch(value: Option<String>, clear: bool) -> Option<TextPatch> {
    if clear {
        Some(TextPatch::Clear)
    } else {
        value.map(TextPatch::Set)
    }
}

fn view_query(filters: &FilterArgs) -> Result<(FilterCriteria, SortSpec)> {
    let criteria = CriteriaBuilder::new()
        .with_search(filters.search.as_deref())
        .with_assignee(filters.assignee.as_deref())
        .with_category(filters.task_type.as_deref())
        .with_priority(filters.priority.as_deref())?
        .with_due(filters.due.as_deref())?
        .with_window(filters.since.as_deref(), filters.until.as_deref())?
        .build();
    let sort = parse_sort(filters.sort.as_deref(), filters.order.as_deref())?;
    Ok((criteria, sort))
}

async fn filtered_tasks(session: &Session, filters: &FilterArgs) -> Result<Vec<Task>> {
    let (criteria, sort) = view_query(filters)?;
    let tasks = session.controller().view(&criteria, sort).await;
    debug!(count = tasks.len(), "Filtered board");
    Ok(tasks)
}

async fn handle_new(session: &Session, form: NewTaskForm) -> Result<()> {
    let controller = session.controller();
    let config = session.config();
    let today = controller.today();

    let mut template = TaskTemplate::new(form.title, &config.defaults()).due(parse_required_date("due", &form.due)?);
    if let Some(priority) = form.priority {
        template = template.priority(priority.parse()?);
    }
    if let Some(description) = form.description {
        template = template.description(description);
    }
    if let Some(location) = form.location {
        config.ensure_location(location.trim())?;
        template = template.location(location);
    }
    if let Some(assignee) = form.assignee {
        config.ensure_assignee(assignee.trim())?;
        template = template.assignee(assignee);
    }
    if let Some(task_type) = form.task_type {
        template = template.task_type(task_type.parse()?);
    }
    if let Some(status) = form.status {
        template = template.status(status.parse()?, today);
    }

    let recurrence = form
        .repeat
        .map(|repeat| -> Result<Recurrence> {
            Ok(Recurrence {
                frequency: repeat.parse::<Frequency>()?,
                until: parse_optional_date("until", form.until.as_deref())?,
            })
        })
        .transpose()?;

    let report = controller.create_recurring(&template, recurrence).await?;
    for task in &report.succeeded {
        println!("#{} {} (due {})", task.id, task.title, format_date(task.due_date));
    }
    if !report.is_complete() {
        bail!("{} of {} tasks were not created", report.failed.len(), report.total());
    }
    Ok(())
}

async fn handle_ls(session: &Session, filters: &FilterArgs, format: LsFormat) -> Result<()> {
    let tasks = filtered_tasks(session, filters).await?;
    match format {
        LsFormat::Table => print!("{}", view::render_table(&tasks, session.controller().today())),
        LsFormat::Json => println!("{}", serde_json::to_string_pretty(&tasks)?),
    }
    Ok(())
}

async fn handle_board(session: &Session, filters: &FilterArgs) -> Result<()> {
    let tasks = filtered_tasks(session, filters).await?;
    let board = KanbanBoard::build(&tasks);
    print!("{}", view::render_board(&board, session.controller().today()));
    Ok(())
}

async fn handle_calendar(session: &Session, filters: &FilterArgs) -> Result<()> {
    let tasks = filtered_tasks(session, filters).await?;
    let days = calendar(&tasks);
    print!("{}", view::render_calendar(&days, session.controller().today()));
    Ok(())
}

async fn handle_report(session: &Session, filters: &FilterArgs, format: LsFormat) -> Result<()> {
    let tasks = filtered_tasks(session, filters).await?;
    let report = TaskReport::build(&tasks, session.controller().today());
    match format {
        LsFormat::Table => print!("{}", view::render_report(&report)),
        LsFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

async fn handle_move(session: &Session, task: &str, to: Option<&str>, onto: Option<&str>) -> Result<()> {
    let id = parse_task_id(task)?;
    let target = match (to, onto) {
        (Some(column), _) => DropTarget::Column(column.parse::<TaskStatus>()?),
        (None, Some(card)) => DropTarget::Card(parse_task_id(card)?),
        (None, None) => bail!("Pass --to <column> or --onto <task>"),
    };

    match session.controller().move_task(id, target).await? {
        MoveOutcome::Confirmed(_) => Ok(()),
        MoveOutcome::Unchanged => {
            println!("Task #{id} is already in that column");
            Ok(())
        }
        MoveOutcome::RolledBack => bail!("Task #{id} was left in its previous column"),
        MoveOutcome::Busy => bail!("Task #{id} is waiting for the store; try again"),
        MoveOutcome::Discarded => bail!("Board closed before the move finished"),
    }
}

async fn handle_edit(session: &Session, task: &str, form: EditForm) -> Result<()> {
    let id = parse_task_id(task)?;
    let config = session.config();
    if let Some(location) = &form.location {
        config.ensure_location(location.trim())?;
    }
    if let Some(TextPatch::Set(assignee)) = &form.assignee {
        config.ensure_assignee(assignee.trim())?;
    }

    let edit = TaskEdit {
        title: form.title,
        description: form.description,
        priority: form.priority.as_deref().map(str::parse).transpose()?,
        due_date: form
            .due
            .as_deref()
            .map(|raw| parse_required_date("due", raw))
            .transpose()?,
        status: form.status.as_deref().map(str::parse).transpose()?,
        location: form.location,
        assignee: form.assignee,
        task_type: form.task_type.as_deref().map(str::parse).transpose()?,
    };
    if edit.is_empty() {
        println!("Nothing to change for task #{id}");
        return Ok(());
    }

    session.controller().update(id, &edit).await?;
    Ok(())
}

async fn handle_toggle(session: &Session, task: &str) -> Result<()> {
    let id = parse_task_id(task)?;
    let updated = session.controller().toggle_completed(id).await?;
    println!("#{} {} is now {}", updated.id, updated.title, updated.status().label());
    Ok(())
}

async fn handle_reschedule(session: &Session, task: &str, due: &str) -> Result<()> {
    let id = parse_task_id(task)?;
    let due = parse_required_date("due", due)?;
    session.controller().reschedule(id, due).await?;
    Ok(())
}

async fn handle_rm(session: &Session, tasks: &[String]) -> Result<()> {
    let ids = tasks
        .iter()
        .map(String::as_str)
        .map(parse_task_id)
        .collect::<Result<Vec<_>>>()?;
    let report = session.controller().delete(&ids).await?;
    if !report.is_complete() {
        bail!("{} of {} tasks were not deleted", report.failed.len(), report.total());
    }
    Ok(())
}

async fn handle_export(session: &Session, filters: &FilterArgs, output: Option<&Path>) -> Result<()> {
    let tasks = filtered_tasks(session, filters).await?;
    let rows = export_rows(&tasks);
    let body = serde_json::to_string_pretty(&rows)?;
    match output {
        Some(path) => {
            fs::write(path, format!("{body}\n")).with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Exported {} tasks to {}", rows.len(), path.display());
        }
        None => println!("{body}"),
    }
    Ok(())
}

fn handle_expense(session: &Session, command: ExpenseCommand) -> Result<()> {
    match command {
        ExpenseCommand::Add {
            amount,
            category,
            description,
            date,
        } => handle_expense_add(session, amount, &category, &description, date.as_deref()),
        ExpenseCommand::Report {
            search,
            category,
            min,
            max,
            since,
            until,
            sort,
            order,
            format,
        } => {
            let criteria = CriteriaBuilder::new()
                .with_search(search.as_deref())
                .with_category(category.as_deref())
                .with_amount(min.as_deref(), max.as_deref())
                .with_window(since.as_deref(), until.as_deref())?
                .build();
            let sort = parse_sort(sort.as_deref(), order.as_deref())?;
            handle_expense_report(session, &criteria, sort, format)
        }
    }
}

fn handle_expense_add(
    session: &Session,
    amount: f64,
    category: &str,
    description: &str,
    date: Option<&str>,
) -> Result<()> {
    if category.trim().is_empty() {
        bail!("Expense category must not be empty");
    }
    if !amount.is_finite() {
        bail!("Expense amount must be a number");
    }
    let date = match date {
        Some(raw) => parse_required_date("expense", raw)?,
        None => session.controller().today(),
    };
    let expense = Expense {
        id: 0,
        date,
        amount,
        category: category.trim().to_owned(),
        description: description.trim().to_owned(),
    };
    let saved = session.store().add_expense(&expense)?;
    println!(
        "Recorded expense #{}: {:.2} for {} on {}",
        saved.id,
        saved.amount,
        saved.category,
        format_date(saved.date)
    );
    Ok(())
}

fn handle_expense_report(session: &Session, criteria: &FilterCriteria, sort: SortSpec, format: LsFormat) -> Result<()> {
    let expenses = session.store().list_expenses()?;
    let shown = filter::view(expenses.as_slice(), criteria, sort, session.controller().today());
    let summary = ExpenseSummary::build(shown.iter().copied());
    match format {
        LsFormat::Table => print!("{}", view::render_expenses(&shown, &summary)),
        LsFormat::Json => {
            let body = serde_json::json!({ "expenses": shown, "summary": summary });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
    }
    Ok(())
}
