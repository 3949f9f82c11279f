use std::cmp::Ordering;

use chrono::{Days, NaiveDate};
use tracing::trace;

use crate::task::{Priority, Task};

/// Width of the "Next 7 Days" bucket, inclusive of both endpoints.
pub const DUE_SOON_WINDOW_DAYS: u64 = 7;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PriorityFilter {
    #[default]
    All,
    Exactly(Priority),
}

impl PriorityFilter {
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.trim().eq_ignore_ascii_case("all") {
            return Some(PriorityFilter::All);
        }
        Priority::parse(raw).map(PriorityFilter::Exactly)
    }

    pub fn label(&self) -> String {
        match self {
            PriorityFilter::All => "All".to_string(),
            PriorityFilter::Exactly(priority) => priority.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DueFilter {
    #[default]
    All,
    Overdue,
    NextSevenDays,
}

impl DueFilter {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "all" => Some(DueFilter::All),
            "overdue" => Some(DueFilter::Overdue),
            "week" | "next7" => Some(DueFilter::NextSevenDays),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DueFilter::All => "All",
            DueFilter::Overdue => "Overdue",
            DueFilter::NextSevenDays => "Next 7 Days",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    None,
    Priority,
    DueDate,
}

impl SortKey {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "none" => Some(SortKey::None),
            "priority" => Some(SortKey::Priority),
            "due" | "duedate" => Some(SortKey::DueDate),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortKey::None => "None",
            SortKey::Priority => "Priority",
            SortKey::DueDate => "Due Date",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Some(SortOrder::Ascending),
            "desc" | "descending" => Some(SortOrder::Descending),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "Ascending",
            SortOrder::Descending => "Descending",
        }
    }
}

/// Filter and sort controls for the list view. Both filters compose; the
/// sort applies one key at a time, with the order selectable
/// independently of the key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewOptions {
    pub priority: PriorityFilter,
    pub due: DueFilter,
    pub sort: SortKey,
    pub order: SortOrder,
}

/// Pure derivation of the display view: filter, then sort, returning
/// references into `tasks`. Recomputed from scratch on every call so the
/// result can never go stale; with `SortKey::None` the filtered
/// insertion order is left unchanged.
pub fn derive<'a>(tasks: &'a [Task], options: &ViewOptions, today: NaiveDate) -> Vec<&'a Task> {
    let mut visible: Vec<&Task> = tasks
        .iter()
        .filter(|task| matches_priority(task, options.priority))
        .filter(|task| matches_due(task, options.due, today))
        .collect();

    if options.sort != SortKey::None {
        visible.sort_by(|a, b| {
            let ordering = compare(a, b, options.sort);
            match options.order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            }
        });
    }

    trace!(
        total = tasks.len(),
        visible = visible.len(),
        "derived task view"
    );
    visible
}

fn matches_priority(task: &Task, filter: PriorityFilter) -> bool {
    match filter {
        PriorityFilter::All => true,
        PriorityFilter::Exactly(priority) => task.priority == priority,
    }
}

fn matches_due(task: &Task, filter: DueFilter, today: NaiveDate) -> bool {
    match filter {
        DueFilter::All => true,
        DueFilter::Overdue => task.due < today,
        DueFilter::NextSevenDays => {
            let horizon = today
                .checked_add_days(Days::new(DUE_SOON_WINDOW_DAYS))
                .unwrap_or(today);
            task.due >= today && task.due <= horizon
        }
    }
}

fn compare(a: &Task, b: &Task, key: SortKey) -> Ordering {
    match key {
        SortKey::None => Ordering::Equal,
        SortKey::Priority => a.priority.cmp(&b.priority),
        SortKey::DueDate => a.due.cmp(&b.due),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{DueFilter, PriorityFilter, SortKey, SortOrder, ViewOptions, derive};
    use crate::task::{Priority, Task};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn task(id: i64, priority: Priority, due: NaiveDate) -> Task {
        Task::new(
            id,
            format!("task {id}"),
            due,
            priority,
            String::new(),
            false,
        )
    }

    fn ids(view: &[&Task]) -> Vec<i64> {
        view.iter().map(|task| task.id).collect()
    }

    #[test]
    fn default_options_keep_insertion_order() {
        let today = day(2024, 1, 10);
        let tasks = vec![
            task(3, Priority::High, day(2024, 1, 20)),
            task(1, Priority::Low, day(2024, 1, 12)),
            task(2, Priority::Medium, day(2024, 1, 11)),
        ];

        let view = derive(&tasks, &ViewOptions::default(), today);
        assert_eq!(ids(&view), vec![3, 1, 2]);
    }

    #[test]
    fn overdue_bucket_is_strictly_before_today() {
        let today = day(2024, 1, 10);
        let tasks = vec![
            task(1, Priority::Low, day(2024, 1, 15)),
            task(2, Priority::Low, day(2024, 1, 5)),
            task(3, Priority::Low, day(2024, 1, 10)),
        ];

        let options = ViewOptions {
            due: DueFilter::Overdue,
            ..ViewOptions::default()
        };
        assert_eq!(ids(&derive(&tasks, &options, today)), vec![2]);
    }

    #[test]
    fn next_seven_days_includes_both_endpoints() {
        let today = day(2024, 1, 10);
        let tasks = vec![
            task(1, Priority::Low, day(2024, 1, 9)),
            task(2, Priority::Low, day(2024, 1, 10)),
            task(3, Priority::Low, day(2024, 1, 17)),
            task(4, Priority::Low, day(2024, 1, 18)),
        ];

        let options = ViewOptions {
            due: DueFilter::NextSevenDays,
            ..ViewOptions::default()
        };
        assert_eq!(ids(&derive(&tasks, &options, today)), vec![2, 3]);
    }

    #[test]
    fn priority_filter_is_an_exact_match() {
        let today = day(2024, 1, 10);
        let tasks = vec![
            task(1, Priority::Low, day(2024, 1, 12)),
            task(2, Priority::High, day(2024, 1, 12)),
            task(3, Priority::Low, day(2024, 1, 12)),
        ];

        let options = ViewOptions {
            priority: PriorityFilter::Exactly(Priority::Low),
            ..ViewOptions::default()
        };
        assert_eq!(ids(&derive(&tasks, &options, today)), vec![1, 3]);
    }

    #[test]
    fn filters_compose() {
        let today = day(2024, 1, 10);
        let tasks = vec![
            task(1, Priority::High, day(2024, 1, 5)),
            task(2, Priority::High, day(2024, 1, 12)),
            task(3, Priority::Low, day(2024, 1, 4)),
        ];

        let options = ViewOptions {
            priority: PriorityFilter::Exactly(Priority::High),
            due: DueFilter::Overdue,
            ..ViewOptions::default()
        };
        assert_eq!(ids(&derive(&tasks, &options, today)), vec![1]);
    }

    #[test]
    fn priority_sort_uses_ordinal_rank_both_ways() {
        let today = day(2024, 1, 10);
        let tasks = vec![
            task(1, Priority::High, day(2024, 1, 12)),
            task(2, Priority::Low, day(2024, 1, 12)),
            task(3, Priority::Medium, day(2024, 1, 12)),
        ];

        let ascending = ViewOptions {
            sort: SortKey::Priority,
            ..ViewOptions::default()
        };
        assert_eq!(ids(&derive(&tasks, &ascending, today)), vec![2, 3, 1]);

        let descending = ViewOptions {
            sort: SortKey::Priority,
            order: SortOrder::Descending,
            ..ViewOptions::default()
        };
        assert_eq!(ids(&derive(&tasks, &descending, today)), vec![1, 3, 2]);
    }

    #[test]
    fn due_date_sort_is_chronological() {
        let today = day(2024, 1, 10);
        let tasks = vec![
            task(1, Priority::Low, day(2024, 2, 1)),
            task(2, Priority::Low, day(2024, 1, 11)),
            task(3, Priority::Low, day(2024, 1, 20)),
        ];

        let options = ViewOptions {
            sort: SortKey::DueDate,
            ..ViewOptions::default()
        };
        assert_eq!(ids(&derive(&tasks, &options, today)), vec![2, 3, 1]);
    }

    #[test]
    fn sort_ties_preserve_insertion_order() {
        let today = day(2024, 1, 10);
        let tasks = vec![
            task(1, Priority::Medium, day(2024, 1, 12)),
            task(2, Priority::Low, day(2024, 1, 12)),
            task(3, Priority::Medium, day(2024, 1, 12)),
        ];

        let options = ViewOptions {
            sort: SortKey::Priority,
            ..ViewOptions::default()
        };
        assert_eq!(ids(&derive(&tasks, &options, today)), vec![2, 1, 3]);
    }

    #[test]
    fn control_tokens_parse() {
        assert_eq!(PriorityFilter::parse("all"), Some(PriorityFilter::All));
        assert_eq!(
            PriorityFilter::parse("high"),
            Some(PriorityFilter::Exactly(Priority::High))
        );
        assert_eq!(DueFilter::parse("week"), Some(DueFilter::NextSevenDays));
        assert_eq!(DueFilter::parse("Overdue"), Some(DueFilter::Overdue));
        assert_eq!(SortKey::parse("due"), Some(SortKey::DueDate));
        assert_eq!(SortOrder::parse("desc"), Some(SortOrder::Descending));
        assert_eq!(SortKey::parse("bogus"), None);
    }
}
