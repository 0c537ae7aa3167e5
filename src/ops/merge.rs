use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::model::document::Document;

/// What a checkbox merge did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Texts whose local checkbox value was applied over disk
    pub applied: Vec<String>,
    /// Local task texts that no longer exist on disk
    pub dropped: Vec<String>,
    /// Disk task texts that did not exist locally
    pub added: Vec<String>,
}

/// Merge local checkbox edits into the on-disk document.
///
/// The disk document is the new base. A base task takes the local checkbox
/// value only when its text is in `locally_modified` and a local task with
/// the same text exists; repeated texts pair up by occurrence. Everything
/// else keeps disk's state: tasks only present locally are dropped, tasks
/// only present on disk are kept.
pub fn merge_checkboxes(
    local: &Document,
    mut disk: Document,
    locally_modified: &HashSet<String>,
) -> (Document, MergeReport) {
    let mut local_by_text: HashMap<&str, Vec<bool>> = HashMap::new();
    for task in local.tasks() {
        local_by_text.entry(task.text.as_str()).or_default().push(task.checked);
    }

    let mut report = MergeReport::default();
    let mut seen: HashMap<String, usize> = HashMap::new();
    for task in disk.tasks_mut() {
        let occurrence = seen.entry(task.text.clone()).or_insert(0);
        let local_checked = local_by_text
            .get(task.text.as_str())
            .and_then(|values| values.get(*occurrence).copied());
        *occurrence += 1;

        match local_checked {
            None => report.added.push(task.text.clone()),
            Some(checked) if locally_modified.contains(&task.text) => {
                task.set_checked(checked);
                report.applied.push(task.text.clone());
            }
            Some(_) => {}
        }
    }

    for (text, values) in &local_by_text {
        let on_disk = seen.get(*text).copied().unwrap_or(0);
        for _ in on_disk..values.len() {
            report.dropped.push(text.to_string());
        }
    }
    report.dropped.sort();

    debug!(
        applied = report.applied.len(),
        dropped = report.dropped.len(),
        added = report.added.len(),
        "merged external change"
    );
    (disk, report)
}
