use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::model::document::Document;
use crate::model::filter::{DueBucket, FilterUniverse};
use crate::view::visibility::due_in_bucket;

/// Distinct tags, priorities and due buckets present across all tasks,
/// hidden ones included
pub fn filter_universe(doc: &Document, today: NaiveDate) -> FilterUniverse {
    let mut tags = BTreeSet::new();
    let mut priorities = BTreeSet::new();
    let mut dues = Vec::new();

    for task in doc.tasks() {
        tags.extend(task.tags.iter().cloned());
        if task.priority > 0 {
            priorities.insert(task.priority);
        }
        if let Some(due) = task.due {
            dues.push(due);
        }
    }

    let due_buckets = [
        DueBucket::Overdue,
        DueBucket::Today,
        DueBucket::Week,
        DueBucket::All,
    ]
    .into_iter()
    .filter(|&bucket| dues.iter().any(|&d| due_in_bucket(d, bucket, today)))
    .collect();

    FilterUniverse {
        tags: tags.into_iter().collect(),
        priorities: priorities.into_iter().collect(),
        due_buckets,
    }
}
