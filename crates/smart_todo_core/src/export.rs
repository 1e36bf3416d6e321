use crate::error::AppError;
use crate::model::Task;
use crate::store::TaskStore;
use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::{Date, OffsetDateTime};

pub const EXPORT_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub active_tasks: Vec<Task>,
    pub completed_history: Vec<Task>,
    #[serde(with = "time::serde::rfc3339")]
    pub export_date: OffsetDateTime,
    pub version: String,
}

pub fn export_document(store: &TaskStore, now: OffsetDateTime) -> ExportDocument {
    ExportDocument {
        active_tasks: store.active().to_vec(),
        completed_history: store.history().to_vec(),
        export_date: now,
        version: EXPORT_VERSION.to_string(),
    }
}

/// Pretty-printed backup document with two-space indentation.
pub fn export_json(store: &TaskStore, now: OffsetDateTime) -> Result<String, AppError> {
    serde_json::to_string_pretty(&export_document(store, now))
        .map_err(|err| AppError::invalid_data(err.to_string()))
}

pub fn export_file_name(date: Date) -> Result<String, AppError> {
    let stamp = date
        .format(format_description!("[year]-[month]-[day]"))
        .map_err(|err| AppError::invalid_data(err.to_string()))?;
    Ok(format!("todo-backup-{stamp}.json"))
}
