use chrono::{Duration, NaiveDate};

use crate::model::filter::{DueBucket, FilterState};
use crate::model::task::TaskEntry;

/// Whether `task` passes every active filter
pub fn is_visible(task: &TaskEntry, filters: &FilterState, today: NaiveDate) -> bool {
    if filters.filter_done && task.checked {
        return false;
    }
    if !filters.tags.is_empty() && !filters.tags.iter().any(|tag| task.has_tag(tag)) {
        return false;
    }
    if !filters.priorities.is_empty() && !filters.priorities.contains(&task.priority) {
        return false;
    }
    if filters.due != DueBucket::None {
        match task.due {
            Some(due) if due_in_bucket(due, filters.due, today) => {}
            _ => return false,
        }
    }
    true
}

/// Whether a due date falls in `bucket`. `DueBucket::None` accepts any date.
pub fn due_in_bucket(due: NaiveDate, bucket: DueBucket, today: NaiveDate) -> bool {
    match bucket {
        DueBucket::None | DueBucket::All => true,
        DueBucket::Overdue => due < today,
        DueBucket::Today => due == today,
        DueBucket::Week => today <= due && due < today + Duration::days(7),
    }
}
