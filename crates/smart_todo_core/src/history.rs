use crate::analytics::{completed_on_local_day, completed_within_week};
use crate::error::AppError;
use crate::model::Task;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::{OffsetDateTime, UtcOffset};

/// Number of history entries a view shows unless configured otherwise.
pub const HISTORY_DISPLAY_LIMIT: usize = 10;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryFilter {
    #[default]
    All,
    Today,
    Week,
}

impl HistoryFilter {
    const CYCLE: [HistoryFilter; 3] = [Self::All, Self::Today, Self::Week];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Today => "today",
            Self::Week => "week",
        }
    }

    pub fn next(self) -> Self {
        let index = self.cycle_index();
        Self::CYCLE[(index + 1) % Self::CYCLE.len()]
    }

    pub fn previous(self) -> Self {
        let index = self.cycle_index();
        Self::CYCLE[(index + Self::CYCLE.len() - 1) % Self::CYCLE.len()]
    }

    fn cycle_index(self) -> usize {
        match self {
            Self::All => 0,
            Self::Today => 1,
            Self::Week => 2,
        }
    }

    pub fn matches(self, task: &Task, now: OffsetDateTime, offset: UtcOffset) -> bool {
        match self {
            Self::All => true,
            Self::Today => completed_on_local_day(task, now, offset),
            Self::Week => completed_within_week(task, now),
        }
    }
}

impl fmt::Display for HistoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HistoryFilter {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "today" => Ok(Self::Today),
            "week" => Ok(Self::Week),
            other => Err(AppError::validation(format!(
                "history filter must be all, today or week (got '{other}')"
            ))),
        }
    }
}

/// Lazy view over `history` keeping most-recent-first order.
///
/// The returned iterator is `Clone`, so a caller can restart it without
/// re-filtering the source list.
pub fn filter_history(
    history: &[Task],
    filter: HistoryFilter,
    now: OffsetDateTime,
    offset: UtcOffset,
) -> impl Iterator<Item = &Task> + Clone {
    history
        .iter()
        .filter(move |task| filter.matches(task, now, offset))
}
