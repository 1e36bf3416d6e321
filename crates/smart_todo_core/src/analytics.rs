//! Counts and progress figures derived from the active and history lists.

use crate::model::Task;
use serde::Serialize;
use time::{Duration, OffsetDateTime, UtcOffset};

pub const BEST_DAY_TODAY: &str = "Today";

const WEEKLY_POINTS_PER_TASK: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Analytics {
    pub active_count: usize,
    pub pending_count: usize,
    pub completed_count: usize,
    pub total_count: usize,
    pub today_completed_count: usize,
    pub weekly_completed_count: usize,
    pub today_progress_percent: u8,
    pub weekly_progress_percent: u8,
    pub best_day_label: Option<String>,
}

/// Recomputes every display figure.
///
/// `previous_best_day` is carried through unchanged when history is empty;
/// the best-day figure is a placeholder, not a real per-day maximum.
pub fn compute(
    active: &[Task],
    history: &[Task],
    now: OffsetDateTime,
    offset: UtcOffset,
    previous_best_day: Option<&str>,
) -> Analytics {
    let today_completed_count = history
        .iter()
        .filter(|task| completed_on_local_day(task, now, offset))
        .count();
    let weekly_completed_count = history
        .iter()
        .filter(|task| completed_within_week(task, now))
        .count();

    let best_day_label = if history.is_empty() {
        previous_best_day.map(str::to_string)
    } else {
        Some(BEST_DAY_TODAY.to_string())
    };

    Analytics {
        active_count: active.len(),
        pending_count: active.len(),
        completed_count: history.len(),
        total_count: active.len() + history.len(),
        today_completed_count,
        weekly_completed_count,
        today_progress_percent: today_progress_percent(today_completed_count, active.len()),
        weekly_progress_percent: weekly_progress_percent(weekly_completed_count),
        best_day_label,
    }
}

pub fn today_progress_percent(today_completed: usize, active: usize) -> u8 {
    let denominator = today_completed + active;
    if denominator == 0 {
        return 0;
    }
    let ratio = today_completed as f64 / denominator as f64;
    (ratio * 100.0).round() as u8
}

pub fn weekly_progress_percent(weekly_completed: usize) -> u8 {
    weekly_completed.saturating_mul(WEEKLY_POINTS_PER_TASK).min(100) as u8
}

pub(crate) fn completed_on_local_day(task: &Task, now: OffsetDateTime, offset: UtcOffset) -> bool {
    let today = now.to_offset(offset).date();
    task.completed_at
        .map(|completed_at| completed_at.to_offset(offset).date() == today)
        .unwrap_or(false)
}

pub(crate) fn completed_within_week(task: &Task, now: OffsetDateTime) -> bool {
    let window_start = now - Duration::days(7);
    task.completed_at
        .map(|completed_at| completed_at >= window_start)
        .unwrap_or(false)
}
