use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info};

use crate::datetime::{self, parse_due_input};
use crate::store::TaskStore;
use crate::task::{Priority, Task};
use crate::validate::{self, Field, ValidationErrors};

/// Transient form state: the task shape minus `id`, with date and
/// priority kept as the raw strings the user typed. Parsing happens in
/// validation and again at submit, never on keystrokes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields {
    pub name: String,
    pub due: String,
    pub priority: String,
    pub description: String,
    pub completed: bool,
}

impl FormFields {
    pub fn from_task(task: &Task) -> Self {
        Self {
            name: task.name.clone(),
            due: datetime::format_date(task.due),
            priority: task.priority.as_str().to_string(),
            description: task.description.clone(),
            completed: task.completed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Create,
    Edit,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Create => f.write_str("create"),
            Mode::Edit => f.write_str("edit"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Created(i64),
    Updated(i64),
    Rejected(ValidationErrors),
}

/// Owns the transient form state and drives the store. Two modes:
/// create (store's editing pointer clear) and edit (pointer set); the
/// pointer itself lives in the store, so the mode is always derived,
/// never duplicated here.
#[derive(Debug, Default)]
pub struct FormController {
    fields: FormFields,
    touched: BTreeSet<Field>,
}

impl FormController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields(&self) -> &FormFields {
        &self.fields
    }

    pub fn is_touched(&self, field: Field) -> bool {
        self.touched.contains(&field)
    }

    pub fn mode(&self, store: &TaskStore) -> Mode {
        if store.editing().is_some() {
            Mode::Edit
        } else {
            Mode::Create
        }
    }

    /// Field change event: updates transient state only.
    pub fn set_field(&mut self, field: Field, value: &str) {
        match field {
            Field::Name => self.fields.name = value.to_string(),
            Field::Due => self.fields.due = value.to_string(),
            Field::Priority => self.fields.priority = value.to_string(),
            Field::Description => self.fields.description = value.to_string(),
            Field::Completed => self.fields.completed = parse_flag(value),
        }
        debug!(field = %field, "form field changed");
    }

    /// Blur event: marks the field touched so its error becomes visible.
    pub fn blur(&mut self, field: Field) {
        self.touched.insert(field);
    }

    /// Load a task into the form and clear the touched set. Used when
    /// entering edit mode.
    pub fn load(&mut self, task: &Task) {
        self.fields = FormFields::from_task(task);
        self.touched.clear();
    }

    /// Reset to empty create-mode defaults.
    pub fn reset(&mut self) {
        self.fields = FormFields::default();
        self.touched.clear();
    }

    /// Set the store's editing pointer to the task with `id` and populate
    /// the form from it. Returns false (leaving everything untouched)
    /// when no such task exists.
    pub fn enter_edit(&mut self, store: &mut TaskStore, id: i64) -> bool {
        let Some(task) = store.get(id).cloned() else {
            return false;
        };
        self.load(&task);
        store.set_editing(Some(task));
        info!(id, "entered edit mode");
        true
    }

    /// Cancel event: clears the editing pointer and resets the form. The
    /// task collection is not mutated.
    pub fn cancel(&mut self, store: &mut TaskStore) {
        store.set_editing(None);
        self.reset();
    }

    /// All current validation errors, whether visible or not.
    pub fn errors(&self, today: NaiveDate) -> ValidationErrors {
        validate::validate(&self.fields, today)
    }

    /// Errors gated for display: only touched fields surface messages.
    /// A submit attempt touches every field, so after one failed submit
    /// this equals `errors`.
    pub fn visible_errors(&self, today: NaiveDate) -> ValidationErrors {
        self.errors(today)
            .into_iter()
            .filter(|(field, _)| self.touched.contains(field))
            .collect()
    }

    pub fn is_valid(&self, today: NaiveDate) -> bool {
        self.errors(today).is_empty()
    }

    /// Submit event. Marks all fields touched and recomputes validity; an
    /// invalid form is rejected with its messages and the store stays
    /// untouched. A valid create adds a task under a fresh id and resets
    /// the form; a valid edit replaces the entry under the original id
    /// and clears the editing pointer.
    #[tracing::instrument(skip(self, store, now))]
    pub fn submit(&mut self, store: &mut TaskStore, now: DateTime<Utc>) -> SubmitOutcome {
        let today = datetime::today(now);
        self.touched.extend(Field::ALL);

        let errors = self.errors(today);
        if !errors.is_empty() {
            debug!(invalid_fields = errors.len(), "submit rejected");
            return SubmitOutcome::Rejected(errors);
        }

        let (Some(due), Some(priority)) = (
            parse_due_input(&self.fields.due, today),
            Priority::parse(&self.fields.priority),
        ) else {
            // Unreachable while the validation rules and these parsers agree.
            return SubmitOutcome::Rejected(self.errors(today));
        };

        match store.editing().map(|task| task.id) {
            Some(id) => {
                let task = Task::new(
                    id,
                    self.fields.name.clone(),
                    due,
                    priority,
                    self.fields.description.clone(),
                    self.fields.completed,
                );
                store.update(id, task);
                store.set_editing(None);
                self.reset();
                info!(id, "task saved");
                SubmitOutcome::Updated(id)
            }
            None => {
                let id = store.next_id(now);
                let task = Task::new(
                    id,
                    self.fields.name.clone(),
                    due,
                    priority,
                    self.fields.description.clone(),
                    self.fields.completed,
                );
                store.add(task);
                self.reset();
                info!(id, "task created");
                SubmitOutcome::Created(id)
            }
        }
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "y" | "yes" | "on" | "true"
    )
}
