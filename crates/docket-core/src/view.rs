use std::fmt;

use chrono::NaiveDate;

use crate::datetime::days_until;
use crate::task::Task;

pub const WARNING_WINDOW_DAYS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Added,
    DateAscending,
    DateDescending,
}

impl SortOrder {
    pub fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "added" => Some(Self::Added),
            "date" | "date+" => Some(Self::DateAscending),
            "date-" => Some(Self::DateDescending),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Done,
    Overdue,
    Remaining(i64),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Done => write!(f, "done"),
            Status::Overdue => write!(f, "overdue"),
            Status::Remaining(1) => write!(f, "1 day remaining"),
            Status::Remaining(days) => write!(f, "{days} days remaining"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Normal,
    Warning,
    Severe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskView {
    pub days_remaining: i64,
    pub status: Status,
    pub urgency: Urgency,
}

// Pure derivation over one task and today's date; completion wins over any
// date arithmetic.
#[must_use]
pub fn task_view(task: &Task, today: NaiveDate) -> TaskView {
    let days_remaining = days_until(task.date, today);

    let (status, urgency) = if task.completed {
        (Status::Done, Urgency::Normal)
    } else if days_remaining < 0 {
        (Status::Overdue, Urgency::Severe)
    } else if days_remaining < WARNING_WINDOW_DAYS {
        (Status::Remaining(days_remaining), Urgency::Warning)
    } else {
        (Status::Remaining(days_remaining), Urgency::Normal)
    };

    TaskView {
        days_remaining,
        status,
        urgency,
    }
}

// Always a derived copy; the authoritative collection keeps insertion order.
#[must_use]
pub fn sorted(tasks: &[Task], order: SortOrder) -> Vec<Task> {
    let mut rows = tasks.to_vec();
    match order {
        SortOrder::Added => {}
        SortOrder::DateAscending => rows.sort_by(|a, b| a.date.cmp(&b.date)),
        SortOrder::DateDescending => rows.sort_by(|a, b| b.date.cmp(&a.date)),
    }
    rows
}
