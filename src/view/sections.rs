use crate::model::task::{Heading, HeadingAnchor};

/// Headings grouped by the task index they precede
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionAnchors {
    /// `before[i]` lists heading indices anchored before task `i`, in
    /// document order
    pub before: Vec<Vec<usize>>,
    /// Headings after the last task
    pub trailing: Vec<usize>,
}

impl SectionAnchors {
    pub fn new(headings: &[Heading], task_count: usize) -> Self {
        let mut before = vec![Vec::new(); task_count];
        let mut trailing = Vec::new();
        for (h, heading) in headings.iter().enumerate() {
            match heading.anchor {
                HeadingAnchor::Before(i) if i < task_count => before[i].push(h),
                _ => trailing.push(h),
            }
        }
        SectionAnchors { before, trailing }
    }
}

/// The innermost heading each task falls under (`None` before the first
/// heading)
pub fn section_of_tasks(headings: &[Heading], task_count: usize) -> Vec<Option<usize>> {
    let anchors = SectionAnchors::new(headings, task_count);
    let mut current = None;
    anchors
        .before
        .iter()
        .map(|hs| {
            if let Some(&last) = hs.last() {
                current = Some(last);
            }
            current
        })
        .collect()
}
