//! Active/history state machine.
//!
//! The active list and the completed history are disjoint partitions of every
//! known task. History is ordered most-recently-completed first.

use crate::error::AppError;
use crate::model::{Priority, Task, TaskId};
use std::collections::HashSet;
use time::{Date, OffsetDateTime};
use tracing::debug;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TaskStore {
    active: Vec<Task>,
    history: Vec<Task>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a store from persisted lists.
    ///
    /// Identifiers must be unique across both lists, active tasks must not
    /// carry a completion time and history entries must. The `completed` flag
    /// is normalised to list membership.
    pub fn from_parts(mut active: Vec<Task>, mut history: Vec<Task>) -> Result<Self, AppError> {
        let mut seen = HashSet::with_capacity(active.len() + history.len());
        for task in active.iter().chain(history.iter()) {
            if !seen.insert(task.id) {
                return Err(AppError::load(format!("duplicate task id {}", task.id)));
            }
            if task.text.trim().is_empty() {
                return Err(AppError::load(format!("task {} has empty text", task.id)));
            }
        }

        for task in &mut active {
            if task.completed_at.is_some() {
                return Err(AppError::load(format!(
                    "active task {} has a completion time",
                    task.id
                )));
            }
            task.completed = false;
        }

        for task in &mut history {
            if task.completed_at.is_none() {
                return Err(AppError::load(format!(
                    "history task {} has no completion time",
                    task.id
                )));
            }
            task.completed = true;
        }

        Ok(Self { active, history })
    }

    pub fn into_parts(self) -> (Vec<Task>, Vec<Task>) {
        (self.active, self.history)
    }

    pub fn active(&self) -> &[Task] {
        &self.active
    }

    pub fn history(&self) -> &[Task] {
        &self.history
    }

    pub fn total_len(&self) -> usize {
        self.active.len() + self.history.len()
    }

    pub fn find_active(&self, id: TaskId) -> Option<&Task> {
        self.active.iter().find(|task| task.id == id)
    }

    pub fn find_history(&self, id: TaskId) -> Option<&Task> {
        self.history.iter().find(|task| task.id == id)
    }

    pub fn add(
        &mut self,
        text: &str,
        due_date: Option<Date>,
        priority: Priority,
    ) -> Result<Task, AppError> {
        self.add_at(text, due_date, priority, OffsetDateTime::now_utc())
    }

    pub fn add_at(
        &mut self,
        text: &str,
        due_date: Option<Date>,
        priority: Priority,
        now: OffsetDateTime,
    ) -> Result<Task, AppError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(AppError::validation("task text is required"));
        }

        let task = Task::new(
            self.next_id(now)?,
            trimmed.to_string(),
            due_date,
            priority,
            now,
        );
        self.active.push(task.clone());
        debug!(id = %task.id, active = self.active.len(), "task added");

        Ok(task)
    }

    pub fn complete(&mut self, id: TaskId) -> Result<Task, AppError> {
        self.complete_at(id, OffsetDateTime::now_utc())
    }

    pub fn complete_at(&mut self, id: TaskId, now: OffsetDateTime) -> Result<Task, AppError> {
        let index = self.active_index(id)?;
        let mut task = self.active.remove(index);
        task.completed = true;
        task.completed_at = Some(now);
        self.history.insert(0, task.clone());
        debug!(%id, history = self.history.len(), "task completed");

        Ok(task)
    }

    pub fn complete_all(&mut self) -> usize {
        self.complete_all_at(OffsetDateTime::now_utc())
    }

    /// Moves every active task to the front of history with one shared
    /// completion time. Tasks are pushed to the front in active-list order,
    /// so the last active task ends up at `history[0]`.
    pub fn complete_all_at(&mut self, now: OffsetDateTime) -> usize {
        let count = self.active.len();
        if count == 0 {
            return 0;
        }

        let mut moved: Vec<Task> = self
            .active
            .drain(..)
            .map(|mut task| {
                task.completed = true;
                task.completed_at = Some(now);
                task
            })
            .collect();
        moved.reverse();
        moved.append(&mut self.history);
        self.history = moved;
        debug!(count, history = self.history.len(), "all tasks completed");

        count
    }

    pub fn edit(&mut self, id: TaskId, new_text: &str) -> Result<Task, AppError> {
        let trimmed = new_text.trim();
        if trimmed.is_empty() {
            return Err(AppError::validation("task text is required"));
        }

        let index = self.active_index(id)?;
        let task = &mut self.active[index];
        task.text = trimmed.to_string();
        debug!(%id, "task edited");

        Ok(task.clone())
    }

    pub fn delete(&mut self, id: TaskId) -> Result<Task, AppError> {
        let index = self.active_index(id)?;
        let removed = self.active.remove(index);
        debug!(%id, active = self.active.len(), "task deleted");

        Ok(removed)
    }

    pub fn restore(&mut self, id: TaskId) -> Result<Task, AppError> {
        let index = self
            .history
            .iter()
            .position(|task| task.id == id)
            .ok_or_else(|| AppError::not_found(format!("task {id} is not in history")))?;

        let mut task = self.history.remove(index);
        task.completed = false;
        task.completed_at = None;
        self.active.push(task.clone());
        debug!(%id, active = self.active.len(), "task restored");

        Ok(task)
    }

    pub fn clear_history(&mut self) -> usize {
        let removed = self.history.len();
        self.history.clear();
        debug!(removed, "history cleared");
        removed
    }

    fn active_index(&self, id: TaskId) -> Result<usize, AppError> {
        self.active
            .iter()
            .position(|task| task.id == id)
            .ok_or_else(|| AppError::not_found(format!("task {id} is not active")))
    }

    // Millisecond clock, bumped past the largest known id so that several
    // adds within one millisecond still get distinct ids.
    fn next_id(&self, now: OffsetDateTime) -> Result<TaskId, AppError> {
        let millis = u64::try_from(now.unix_timestamp_nanos() / 1_000_000).unwrap_or(0);
        let next_after_known = match self
            .active
            .iter()
            .chain(self.history.iter())
            .map(|task| task.id.value())
            .max()
        {
            Some(max) => max
                .checked_add(1)
                .ok_or_else(|| AppError::invalid_data("task id space exhausted"))?,
            None => 0,
        };
        Ok(TaskId(millis.max(next_after_known)))
    }
}

#[cfg(test)]
mod tests {
    use super::TaskStore;
    use crate::model::{Priority, Task, TaskId};
    use proptest::prelude::*;
    use std::collections::HashSet;
    use time::macros::{date, datetime};
    use time::{Duration, OffsetDateTime};

    fn now() -> OffsetDateTime {
        datetime!(2025-03-08 12:00 UTC)
    }

    fn store_with(texts: &[&str]) -> TaskStore {
        let mut store = TaskStore::new();
        for text in texts {
            store.add_at(text, None, Priority::Medium, now()).unwrap();
        }
        store
    }

    fn assert_disjoint(store: &TaskStore) {
        let active: HashSet<TaskId> = store.active().iter().map(|task| task.id).collect();
        let history: HashSet<TaskId> = store.history().iter().map(|task| task.id).collect();
        assert!(active.is_disjoint(&history));
        assert_eq!(active.len(), store.active().len());
        assert_eq!(history.len(), store.history().len());
    }

    #[test]
    fn add_rejects_blank_text() {
        let mut store = TaskStore::new();
        let err = store.add_at("   ", None, Priority::Low, now()).unwrap_err();

        assert_eq!(err.code(), "validation_error");
        assert!(store.active().is_empty());
    }

    #[test]
    fn add_trims_text_and_appends() {
        let mut store = store_with(&["first"]);
        let task = store
            .add_at("  second  ", Some(date!(2025 - 03 - 09)), Priority::High, now())
            .unwrap();

        assert_eq!(task.text, "second");
        assert!(!task.completed);
        assert_eq!(task.completed_at, None);
        assert_eq!(store.active().len(), 2);
        assert_eq!(store.active()[1], task);
    }

    #[test]
    fn ids_stay_unique_within_one_millisecond() {
        let store = store_with(&["a", "b", "c"]);
        let ids: Vec<u64> = store.active().iter().map(|task| task.id.value()).collect();

        assert_eq!(ids[0], 1741435200000);
        assert_eq!(ids[1], ids[0] + 1);
        assert_eq!(ids[2], ids[0] + 2);
    }

    #[test]
    fn buy_milk_lifecycle() {
        let mut store = TaskStore::new();
        let task = store
            .add_at("Buy milk", None, Priority::Medium, now())
            .unwrap();
        assert_eq!(store.active().len(), 1);

        store.complete_at(task.id, now() + Duration::hours(1)).unwrap();
        assert_eq!(store.active().len(), 0);
        assert_eq!(store.history().len(), 1);
        assert_eq!(store.history()[0].text, "Buy milk");
        assert!(store.history()[0].completed_at.is_some());
        assert!(store.history()[0].completed);

        let restored = store.restore(task.id).unwrap();
        assert_eq!(store.active().len(), 1);
        assert_eq!(store.history().len(), 0);
        assert!(!restored.completed);
        assert_eq!(restored, task);
    }

    #[test]
    fn complete_puts_latest_at_front_of_history() {
        let mut store = store_with(&["a", "b"]);
        let first = store.active()[0].id;
        let second = store.active()[1].id;

        store.complete_at(first, now()).unwrap();
        store.complete_at(second, now()).unwrap();

        assert_eq!(store.history()[0].id, second);
        assert_eq!(store.history()[1].id, first);
    }

    #[test]
    fn complete_unknown_id_is_not_found() {
        let mut store = store_with(&["a"]);
        let err = store.complete_at(TaskId(1), now()).unwrap_err();

        assert_eq!(err.code(), "not_found");
        assert_eq!(store.active().len(), 1);
        assert!(store.history().is_empty());
    }

    #[test]
    fn complete_all_moves_everything_with_one_timestamp() {
        let mut store = store_with(&["a", "b", "c"]);
        let earlier = store.active()[0].id;
        store.complete_at(earlier, now()).unwrap();
        let order: Vec<TaskId> = store.active().iter().map(|task| task.id).collect();

        let stamp = now() + Duration::minutes(5);
        let moved = store.complete_all_at(stamp);

        assert_eq!(moved, 2);
        assert!(store.active().is_empty());
        assert_eq!(store.history().len(), 3);
        assert_eq!(store.history()[0].id, order[1]);
        assert_eq!(store.history()[1].id, order[0]);
        assert_eq!(store.history()[2].id, earlier);
        assert!(
            store.history()[..2]
                .iter()
                .all(|task| task.completed_at == Some(stamp))
        );
    }

    #[test]
    fn complete_all_on_empty_store_is_noop() {
        let mut store = TaskStore::new();
        assert_eq!(store.complete_all_at(now()), 0);
        assert!(store.history().is_empty());
    }

    #[test]
    fn edit_rejects_whitespace_and_keeps_task() {
        let mut store = store_with(&["original"]);
        let id = store.active()[0].id;

        let err = store.edit(id, " \t ").unwrap_err();

        assert_eq!(err.code(), "validation_error");
        assert_eq!(store.active()[0].text, "original");
    }

    #[test]
    fn edit_only_applies_to_active_tasks() {
        let mut store = store_with(&["original"]);
        let id = store.active()[0].id;
        store.complete_at(id, now()).unwrap();

        let err = store.edit(id, "changed").unwrap_err();

        assert_eq!(err.code(), "not_found");
        assert_eq!(store.history()[0].text, "original");
    }

    #[test]
    fn edit_replaces_text_in_place() {
        let mut store = store_with(&["a", "b"]);
        let id = store.active()[0].id;

        let edited = store.edit(id, "  renamed ").unwrap();

        assert_eq!(edited.text, "renamed");
        assert_eq!(store.active()[0].text, "renamed");
        assert_eq!(store.active()[1].text, "b");
    }

    #[test]
    fn delete_leaves_history_alone() {
        let mut store = store_with(&["a", "b"]);
        let done = store.active()[0].id;
        let doomed = store.active()[1].id;
        store.complete_at(done, now()).unwrap();

        let removed = store.delete(doomed).unwrap();

        assert_eq!(removed.text, "b");
        assert!(store.active().is_empty());
        assert_eq!(store.history().len(), 1);
        assert_eq!(store.delete(done).unwrap_err().code(), "not_found");
    }

    #[test]
    fn restore_unknown_id_is_not_found() {
        let mut store = store_with(&["a"]);
        let id = store.active()[0].id;

        assert_eq!(store.restore(id).unwrap_err().code(), "not_found");
    }

    #[test]
    fn restore_appends_to_end_of_active() {
        let mut store = store_with(&["a", "b"]);
        let first = store.active()[0].id;
        store.complete_at(first, now()).unwrap();

        store.restore(first).unwrap();

        assert_eq!(store.active()[1].id, first);
    }

    #[test]
    fn clear_history_is_idempotent() {
        let mut store = store_with(&["a", "b"]);
        store.complete_all_at(now());

        assert_eq!(store.clear_history(), 2);
        assert_eq!(store.clear_history(), 0);
        assert_eq!(store.total_len(), 0);
    }

    #[test]
    fn ids_are_not_reused_after_restore() {
        let mut store = store_with(&["a"]);
        let id = store.active()[0].id;
        store.complete_at(id, now()).unwrap();

        let added = store.add_at("b", None, Priority::Low, now()).unwrap();

        assert!(added.id > id);
    }

    #[test]
    fn add_fails_when_largest_id_is_exhausted() {
        let last = Task::new(TaskId(u64::MAX), "last".into(), None, Priority::Low, now());
        let mut store = TaskStore::from_parts(vec![last], Vec::new()).unwrap();

        let err = store.add_at("b", None, Priority::Low, now()).unwrap_err();

        assert_eq!(err.code(), "invalid_data");
        assert_eq!(store.active().len(), 1);
    }

    #[test]
    fn from_parts_rejects_duplicate_ids() {
        let task = Task::new(TaskId(1), "a".into(), None, Priority::Low, now());
        let mut done = task.clone();
        done.completed_at = Some(now());

        let err = TaskStore::from_parts(vec![task], vec![done]).unwrap_err();

        assert_eq!(err.code(), "load_error");
    }

    #[test]
    fn from_parts_requires_completion_time_in_history() {
        let task = Task::new(TaskId(1), "a".into(), None, Priority::Low, now());

        assert!(TaskStore::from_parts(Vec::new(), vec![task.clone()]).is_err());

        let mut stamped = task;
        stamped.completed_at = Some(now());
        assert!(TaskStore::from_parts(vec![stamped], Vec::new()).is_err());
    }

    #[test]
    fn from_parts_normalises_completed_flag() {
        let mut done = Task::new(TaskId(1), "a".into(), None, Priority::Low, now());
        done.completed_at = Some(now());

        let store = TaskStore::from_parts(Vec::new(), vec![done]).unwrap();

        assert!(store.history()[0].completed);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(String),
        Complete(usize),
        CompleteAll,
        Edit(usize, String),
        Delete(usize),
        Restore(usize),
        ClearHistory,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            "[ a-z]{0,8}".prop_map(Op::Add),
            any::<usize>().prop_map(Op::Complete),
            Just(Op::CompleteAll),
            (any::<usize>(), "[ a-z]{0,8}").prop_map(|(index, text)| Op::Edit(index, text)),
            any::<usize>().prop_map(Op::Delete),
            any::<usize>().prop_map(Op::Restore),
            Just(Op::ClearHistory),
        ]
    }

    fn pick(tasks: &[Task], index: usize) -> TaskId {
        if tasks.is_empty() {
            TaskId(0)
        } else {
            tasks[index % tasks.len()].id
        }
    }

    proptest! {
        #[test]
        fn lists_stay_disjoint_and_consistent(ops in prop::collection::vec(op_strategy(), 0..40)) {
            let mut store = TaskStore::new();
            let mut clock = now();

            for op in ops {
                clock += Duration::seconds(1);
                let before_active = store.active().len();
                let before_total = store.total_len();

                match op {
                    Op::Add(text) => {
                        let added = store.add_at(&text, None, Priority::Medium, clock);
                        if text.trim().is_empty() {
                            prop_assert!(added.is_err());
                            prop_assert_eq!(store.active().len(), before_active);
                        } else {
                            prop_assert!(added.is_ok());
                            prop_assert_eq!(store.active().len(), before_active + 1);
                            prop_assert_eq!(store.total_len(), before_total + 1);
                        }
                    }
                    Op::Complete(index) => {
                        let id = pick(store.active(), index);
                        let _ = store.complete_at(id, clock);
                        prop_assert_eq!(store.total_len(), before_total);
                    }
                    Op::CompleteAll => {
                        let before_history = store.history().len();
                        store.complete_all_at(clock);
                        prop_assert!(store.active().is_empty());
                        prop_assert_eq!(store.history().len(), before_history + before_active);
                    }
                    Op::Edit(index, text) => {
                        let id = pick(store.active(), index);
                        let _ = store.edit(id, &text);
                        prop_assert!(store.active().iter().all(|task| !task.text.trim().is_empty()));
                    }
                    Op::Delete(index) => {
                        let id = pick(store.active(), index);
                        let _ = store.delete(id);
                    }
                    Op::Restore(index) => {
                        let id = pick(store.history(), index);
                        let _ = store.restore(id);
                        prop_assert_eq!(store.total_len(), before_total);
                    }
                    Op::ClearHistory => {
                        store.clear_history();
                        prop_assert!(store.history().is_empty());
                    }
                }

                assert_disjoint(&store);
                prop_assert!(store.active().iter().all(|task| task.completed_at.is_none() && !task.completed));
                prop_assert!(store.history().iter().all(|task| task.completed_at.is_some() && task.completed));
                prop_assert_eq!(store.total_len(), store.active().len() + store.history().len());
            }
        }
    }
}
