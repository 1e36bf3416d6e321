//! Text and JSON views of a task store snapshot.

use smart_todo_core::analytics::Analytics;
use smart_todo_core::error::AppError;
use smart_todo_core::history::HistoryFilter;
use smart_todo_core::model::{Task, format_due_date};
use tabled::settings::Style;
use tabled::{Table, Tabled};
use time::UtcOffset;
use time::macros::format_description;

#[derive(Tabled)]
struct ActiveRow {
    #[tabled(rename = "ID")]
    id: u64,
    #[tabled(rename = "Task")]
    text: String,
    #[tabled(rename = "Due")]
    due: String,
    #[tabled(rename = "Priority")]
    priority: &'static str,
}

#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "ID")]
    id: u64,
    #[tabled(rename = "Task")]
    text: String,
    #[tabled(rename = "Completed")]
    completed_at: String,
}

pub fn active_table(tasks: &[Task]) -> Result<String, AppError> {
    if tasks.is_empty() {
        return Ok("No active tasks. Add a task to get started!".to_string());
    }

    let mut rows = Vec::with_capacity(tasks.len());
    for task in tasks {
        let due = match task.due_date {
            Some(date) => format_due_date(date)?,
            None => "-".to_string(),
        };
        rows.push(ActiveRow {
            id: task.id.value(),
            text: task.text.clone(),
            due,
            priority: task.priority.label(),
        });
    }

    let mut table = Table::new(rows);
    table.with(Style::sharp());
    Ok(table.to_string())
}

pub fn history_table<'a>(
    entries: impl Iterator<Item = &'a Task>,
    filter: HistoryFilter,
    offset: UtcOffset,
) -> Result<String, AppError> {
    let mut rows = Vec::new();
    for task in entries {
        let completed_at = match task.completed_at {
            Some(completed_at) => completed_at
                .to_offset(offset)
                .format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
                .map_err(|err| AppError::invalid_data(err.to_string()))?,
            None => "-".to_string(),
        };
        rows.push(HistoryRow {
            id: task.id.value(),
            text: task.text.clone(),
            completed_at,
        });
    }

    if rows.is_empty() {
        let period = if filter == HistoryFilter::All {
            "yet"
        } else {
            "in this period"
        };
        return Ok(format!("No completed tasks {period}"));
    }

    let mut table = Table::new(rows);
    table.with(Style::sharp());
    Ok(table.to_string())
}

pub fn stats_text(analytics: &Analytics) -> String {
    let best_day = analytics.best_day_label.as_deref().unwrap_or("-");
    format!(
        "Active tasks: {}\nCompleted: {}\nTotal: {}\nToday's progress: {}%\nWeekly progress: {}%\nBest day: {}",
        analytics.active_count,
        analytics.completed_count,
        analytics.total_count,
        analytics.today_progress_percent,
        analytics.weekly_progress_percent,
        best_day
    )
}

pub fn task_json(task: &Task) -> Result<String, AppError> {
    serde_json::to_string(task).map_err(|err| AppError::invalid_data(err.to_string()))
}

pub fn tasks_json<'a>(tasks: impl Iterator<Item = &'a Task>) -> Result<String, AppError> {
    let tasks: Vec<&Task> = tasks.collect();
    serde_json::to_string(&tasks).map_err(|err| AppError::invalid_data(err.to_string()))
}
