use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Due-date filter bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DueBucket {
    #[default]
    None,
    /// Due strictly before today
    Overdue,
    Today,
    /// Today through the next six days
    Week,
    /// Any task with a due date
    All,
}

impl DueBucket {
    pub fn parse(s: &str) -> Option<DueBucket> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Some(DueBucket::None),
            "overdue" => Some(DueBucket::Overdue),
            "today" => Some(DueBucket::Today),
            "week" => Some(DueBucket::Week),
            "all" => Some(DueBucket::All),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DueBucket::None => "none",
            DueBucket::Overdue => "overdue",
            DueBucket::Today => "today",
            DueBucket::Week => "week",
            DueBucket::All => "all",
        }
    }
}

impl fmt::Display for DueBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Active visibility filters. Toggling a filter never touches task order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub filter_done: bool,
    /// Lowercased tag names; empty = no tag filter
    pub tags: BTreeSet<String>,
    /// Priority numbers; empty = no priority filter
    pub priorities: BTreeSet<u32>,
    pub due: DueBucket,
}

impl FilterState {
    pub fn is_active(&self) -> bool {
        self.filter_done
            || !self.tags.is_empty()
            || !self.priorities.is_empty()
            || self.due != DueBucket::None
    }

    /// Add the tag if absent, remove it if present
    pub fn toggle_tag(&mut self, tag: &str) {
        let tag = tag.trim_start_matches('#').to_lowercase();
        if !self.tags.remove(&tag) {
            self.tags.insert(tag);
        }
    }

    pub fn toggle_priority(&mut self, priority: u32) {
        if !self.priorities.remove(&priority) {
            self.priorities.insert(priority);
        }
    }

    /// Selecting the active bucket again clears it
    pub fn toggle_due(&mut self, bucket: DueBucket) {
        self.due = if self.due == bucket {
            DueBucket::None
        } else {
            bucket
        };
    }

    /// Clear tag, priority and due filters; the done filter is a display
    /// preference and survives
    pub fn clear(&mut self) {
        self.tags.clear();
        self.priorities.clear();
        self.due = DueBucket::None;
    }
}

/// Distinct filter values currently present across all tasks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterUniverse {
    pub tags: Vec<String>,
    pub priorities: Vec<u32>,
    pub due_buckets: Vec<DueBucket>,
}
