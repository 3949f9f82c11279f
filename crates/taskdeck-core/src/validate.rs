use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;

use crate::datetime::parse_due_input;
use crate::form::FormFields;
use crate::task::Priority;

pub const NAME_MIN_CHARS: usize = 3;
pub const DESCRIPTION_MAX_CHARS: usize = 200;

/// A form field. Variant order is the display order of the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Field {
    Name,
    Due,
    Priority,
    Description,
    Completed,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::Name,
        Field::Due,
        Field::Priority,
        Field::Description,
        Field::Completed,
    ];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "name" => Some(Field::Name),
            "due" => Some(Field::Due),
            "priority" => Some(Field::Priority),
            "description" => Some(Field::Description),
            "completed" => Some(Field::Completed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Due => "due",
            Field::Priority => "priority",
            Field::Description => "description",
            Field::Completed => "completed",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field → message for every field that is currently invalid. Empty map
/// means the form is submittable.
pub type ValidationErrors = BTreeMap<Field, String>;

/// Pure validation of the transient form state. No side effects; `today`
/// is an explicit input so the rules stay reproducible, and the function
/// is safe to call on every event.
pub fn validate(fields: &FormFields, today: NaiveDate) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    let name = fields.name.trim();
    if name.is_empty() {
        errors.insert(Field::Name, "Task name is required".to_string());
    } else if name.chars().count() < NAME_MIN_CHARS {
        errors.insert(
            Field::Name,
            "Task name must be at least 3 characters".to_string(),
        );
    }

    let due = fields.due.trim();
    if due.is_empty() {
        errors.insert(Field::Due, "Due date is required".to_string());
    } else {
        match parse_due_input(due, today) {
            Some(date) if date < today => {
                errors.insert(Field::Due, "Due date cannot be in the past".to_string());
            }
            Some(_) => {}
            None => {
                errors.insert(Field::Due, "Due date is not a valid date".to_string());
            }
        }
    }

    if Priority::parse(&fields.priority).is_none() {
        errors.insert(
            Field::Priority,
            "Please select a priority level".to_string(),
        );
    }

    if fields.description.chars().count() > DESCRIPTION_MAX_CHARS {
        errors.insert(
            Field::Description,
            "Description cannot exceed 200 characters".to_string(),
        );
    }

    errors
}
