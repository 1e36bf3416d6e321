//! Persisting facade over [`TaskStore`].
//!
//! A [`Session`] owns the task lists and the key-value backend; every
//! successful mutation is written back once. A mutation whose write fails is
//! rolled back so memory and storage never disagree.

use crate::analytics::{self, Analytics};
use crate::error::AppError;
use crate::export;
use crate::history::{HistoryFilter, filter_history};
use crate::model::{Priority, Task, TaskId};
use crate::storage::{FileKeyValueStore, KeyValueStore, load_state, save_state, store_dir};
use crate::store::TaskStore;
use time::{Date, OffsetDateTime, UtcOffset};
use tracing::{debug, info};

pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

#[derive(Debug)]
pub struct SessionOpen<S: KeyValueStore> {
    pub session: Session<S>,
    pub load_error: Option<AppError>,
}

#[derive(Debug)]
pub struct Session<S: KeyValueStore> {
    kv: S,
    store: TaskStore,
    offset: UtcOffset,
    best_day: Option<String>,
    last_updated: Option<OffsetDateTime>,
}

impl Session<FileKeyValueStore> {
    pub fn open_default() -> Result<SessionOpen<FileKeyValueStore>, AppError> {
        let dir = store_dir()?;
        debug!(dir = %dir.display(), "opening task store");
        Ok(Self::open(FileKeyValueStore::new(dir)))
    }
}

impl<S: KeyValueStore> Session<S> {
    /// Loads persisted state. A corrupt or unreadable state starts the session
    /// empty and hands the error back for the caller to report.
    pub fn open(kv: S) -> SessionOpen<S> {
        let loaded = load_state(&kv);
        SessionOpen {
            session: Self {
                kv,
                store: loaded.store,
                offset: local_offset(),
                best_day: None,
                last_updated: loaded.last_updated,
            },
            load_error: loaded.error,
        }
    }

    pub fn with_offset(mut self, offset: UtcOffset) -> Self {
        self.offset = offset;
        self
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn backend(&self) -> &S {
        &self.kv
    }

    pub fn offset(&self) -> UtcOffset {
        self.offset
    }

    pub fn last_updated(&self) -> Option<OffsetDateTime> {
        self.last_updated
    }

    pub fn today(&self) -> Date {
        OffsetDateTime::now_utc().to_offset(self.offset).date()
    }

    pub fn add(
        &mut self,
        text: &str,
        due_date: Option<Date>,
        priority: Priority,
    ) -> Result<Task, AppError> {
        let now = OffsetDateTime::now_utc();
        let task = self.mutate(now, |store| store.add_at(text, due_date, priority, now))?;
        info!(id = %task.id, "task added");
        Ok(task)
    }

    pub fn complete(&mut self, id: TaskId) -> Result<Task, AppError> {
        let now = OffsetDateTime::now_utc();
        self.mutate(now, |store| store.complete_at(id, now))
    }

    pub fn complete_all(&mut self) -> Result<usize, AppError> {
        if self.store.active().is_empty() {
            return Ok(0);
        }
        let now = OffsetDateTime::now_utc();
        self.mutate(now, |store| Ok(store.complete_all_at(now)))
    }

    pub fn edit(&mut self, id: TaskId, new_text: &str) -> Result<Task, AppError> {
        self.mutate(OffsetDateTime::now_utc(), |store| store.edit(id, new_text))
    }

    pub fn delete(&mut self, id: TaskId) -> Result<Task, AppError> {
        self.mutate(OffsetDateTime::now_utc(), |store| store.delete(id))
    }

    pub fn restore(&mut self, id: TaskId) -> Result<Task, AppError> {
        self.mutate(OffsetDateTime::now_utc(), |store| store.restore(id))
    }

    pub fn clear_history(&mut self) -> Result<usize, AppError> {
        if self.store.history().is_empty() {
            return Ok(0);
        }
        self.mutate(OffsetDateTime::now_utc(), |store| Ok(store.clear_history()))
    }

    pub fn analytics(&mut self) -> Analytics {
        self.analytics_at(OffsetDateTime::now_utc())
    }

    /// Recomputes analytics and remembers the best-day label for the next call.
    pub fn analytics_at(&mut self, now: OffsetDateTime) -> Analytics {
        let result = analytics::compute(
            self.store.active(),
            self.store.history(),
            now,
            self.offset,
            self.best_day.as_deref(),
        );
        self.best_day = result.best_day_label.clone();
        result
    }

    pub fn history(&self, filter: HistoryFilter) -> impl Iterator<Item = &Task> + Clone {
        filter_history(
            self.store.history(),
            filter,
            OffsetDateTime::now_utc(),
            self.offset,
        )
    }

    pub fn export_json(&self) -> Result<String, AppError> {
        export::export_json(&self.store, OffsetDateTime::now_utc())
    }

    fn mutate<T>(
        &mut self,
        now: OffsetDateTime,
        operation: impl FnOnce(&mut TaskStore) -> Result<T, AppError>,
    ) -> Result<T, AppError> {
        let snapshot = self.store.clone();
        let value = operation(&mut self.store)?;

        if let Err(err) = save_state(&mut self.kv, &self.store, now) {
            self.store = snapshot;
            return Err(err);
        }
        self.last_updated = Some(now);

        Ok(value)
    }
}
