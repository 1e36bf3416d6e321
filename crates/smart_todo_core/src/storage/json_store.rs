use crate::error::AppError;
use crate::model::Task;
use crate::storage::kv::KeyValueStore;
use crate::store::TaskStore;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::debug;

pub const STATE_KEY: &str = "smartTodoData";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredState {
    #[serde(default)]
    todos: Vec<Task>,
    #[serde(default)]
    completed_history: Vec<Task>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    last_updated: Option<OffsetDateTime>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredStateRef<'a> {
    todos: &'a [Task],
    completed_history: &'a [Task],
    #[serde(with = "time::serde::rfc3339")]
    last_updated: OffsetDateTime,
}

/// Outcome of reading persisted state. On failure `store` is empty and
/// `error` says why; the caller decides how to surface it.
#[derive(Debug, Clone)]
pub struct StateLoad {
    pub store: TaskStore,
    pub last_updated: Option<OffsetDateTime>,
    pub error: Option<AppError>,
}

pub fn load_state<S: KeyValueStore + ?Sized>(kv: &S) -> StateLoad {
    let raw = match kv.get(STATE_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            return StateLoad {
                store: TaskStore::new(),
                last_updated: None,
                error: None,
            };
        }
        Err(err) => return empty_with_error(AppError::load(err.to_string())),
    };

    match decode_state(&raw) {
        Ok((store, last_updated)) => StateLoad {
            store,
            last_updated,
            error: None,
        },
        Err(err) => empty_with_error(err),
    }
}

fn empty_with_error(error: AppError) -> StateLoad {
    debug!(%error, "persisted tasks could not be loaded; starting empty");
    StateLoad {
        store: TaskStore::new(),
        last_updated: None,
        error: Some(error),
    }
}

pub fn decode_state(raw: &str) -> Result<(TaskStore, Option<OffsetDateTime>), AppError> {
    let stored: StoredState =
        serde_json::from_str(raw).map_err(|err| AppError::load(err.to_string()))?;
    let store = TaskStore::from_parts(stored.todos, stored.completed_history)?;
    Ok((store, stored.last_updated))
}

pub fn encode_state(store: &TaskStore, now: OffsetDateTime) -> Result<String, AppError> {
    let stored = StoredStateRef {
        todos: store.active(),
        completed_history: store.history(),
        last_updated: now,
    };
    serde_json::to_string(&stored).map_err(|err| AppError::invalid_data(err.to_string()))
}

pub fn save_state<S: KeyValueStore + ?Sized>(
    kv: &mut S,
    store: &TaskStore,
    now: OffsetDateTime,
) -> Result<(), AppError> {
    let content = encode_state(store, now)?;
    kv.set(STATE_KEY, &content)
}
