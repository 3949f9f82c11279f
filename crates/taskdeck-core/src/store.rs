use chrono::{DateTime, Utc};
use tracing::debug;

use crate::task::Task;

/// The single source of truth for the task collection and the editing
/// pointer. All operations are synchronous; callers observe either the
/// pre- or post-state, never anything in between.
#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: Vec<Task>,
    editing: Option<Task>,
    last_id: i64,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tasks in insertion order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// The task currently loaded into the form, if any.
    pub fn editing(&self) -> Option<&Task> {
        self.editing.as_ref()
    }

    pub fn snapshot(&self) -> (&[Task], Option<&Task>) {
        (&self.tasks, self.editing.as_ref())
    }

    pub fn get(&self, id: i64) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// Issue a fresh id. Ids are millisecond timestamps bumped past the
    /// last issued value, so they stay strictly increasing even when two
    /// tasks are created within the same millisecond, and are never
    /// reused after a delete.
    #[tracing::instrument(skip(self, now))]
    pub fn next_id(&mut self, now: DateTime<Utc>) -> i64 {
        let id = now.timestamp_millis().max(self.last_id + 1);
        self.last_id = id;
        debug!(id, "issued task id");
        id
    }

    #[tracing::instrument(skip(self, task), fields(id = task.id))]
    pub fn add(&mut self, task: Task) {
        self.tasks.push(task);
        debug!(count = self.tasks.len(), "task added");
    }

    /// Replace the entry whose id matches. Silent no-op when absent.
    #[tracing::instrument(skip(self, task))]
    pub fn update(&mut self, id: i64, task: Task) {
        match self.tasks.iter_mut().find(|t| t.id == id) {
            Some(slot) => {
                *slot = task;
                debug!("task replaced");
            }
            None => debug!("update target absent; no-op"),
        }
    }

    /// Remove the entry whose id matches, returning how many entries were
    /// removed. Silent no-op (returning 0) when absent.
    #[tracing::instrument(skip(self))]
    pub fn delete(&mut self, id: i64) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        let removed = before - self.tasks.len();
        debug!(removed, count = self.tasks.len(), "delete applied");
        removed
    }

    #[tracing::instrument(skip(self, task), fields(id = ?task.as_ref().map(|t| t.id)))]
    pub fn set_editing(&mut self, task: Option<Task>) {
        self.editing = task;
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::TaskStore;
    use crate::task::{Priority, Task};

    fn task(id: i64, name: &str) -> Task {
        Task::new(
            id,
            name.to_string(),
            NaiveDate::from_ymd_opt(2024, 1, 15).expect("valid date"),
            Priority::Low,
            String::new(),
            false,
        )
    }

    #[test]
    fn add_keeps_insertion_order() {
        let mut store = TaskStore::new();
        store.add(task(2, "second"));
        store.add(task(1, "first"));

        let ids: Vec<i64> = store.tasks().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn update_replaces_only_the_matching_entry() {
        let mut store = TaskStore::new();
        store.add(task(1, "one"));
        store.add(task(2, "two"));

        store.update(2, task(2, "two, renamed"));
        assert_eq!(store.tasks()[0].name, "one");
        assert_eq!(store.tasks()[1].name, "two, renamed");
        assert_eq!(store.tasks().len(), 2);
    }

    #[test]
    fn update_and_delete_on_absent_ids_are_no_ops() {
        let mut store = TaskStore::new();
        store.add(task(1, "only"));

        store.update(99, task(99, "ghost"));
        assert_eq!(store.delete(99), 0);
        assert_eq!(store.tasks().len(), 1);
        assert_eq!(store.tasks()[0].name, "only");
    }

    #[test]
    fn delete_removes_the_matching_entry() {
        let mut store = TaskStore::new();
        store.add(task(1, "one"));
        store.add(task(2, "two"));

        assert_eq!(store.delete(1), 1);
        let ids: Vec<i64> = store.tasks().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn ids_are_strictly_increasing_within_one_tick() {
        let mut store = TaskStore::new();
        let now = Utc
            .with_ymd_and_hms(2024, 1, 10, 12, 0, 0)
            .single()
            .expect("valid instant");

        let first = store.next_id(now);
        let second = store.next_id(now);
        let third = store.next_id(now);
        assert!(first < second && second < third);
    }

    #[test]
    fn ids_are_not_reused_after_deletion() {
        let mut store = TaskStore::new();
        let now = Utc
            .with_ymd_and_hms(2024, 1, 10, 12, 0, 0)
            .single()
            .expect("valid instant");

        let first = store.next_id(now);
        store.add(task(first, "doomed"));
        store.delete(first);

        let second = store.next_id(now);
        assert!(second > first);
    }

    #[test]
    fn editing_pointer_is_set_and_cleared() {
        let mut store = TaskStore::new();
        store.add(task(1, "one"));

        store.set_editing(Some(store.tasks()[0].clone()));
        assert_eq!(store.editing().map(|t| t.id), Some(1));

        store.set_editing(None);
        assert!(store.editing().is_none());

        let (tasks, editing) = store.snapshot();
        assert_eq!(tasks.len(), 1);
        assert!(editing.is_none());
    }
}
