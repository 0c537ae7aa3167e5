use std::cmp::Ordering;
use std::ops::Range;

use crate::model::document::{Block, Document};
use crate::model::task::TaskEntry;

/// Ordering applied by the sort commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Unchecked before checked
    Done,
    /// Earliest due date first, undated last
    Due,
    /// Lowest priority number first, no priority last
    Priority,
}

impl SortKey {
    fn compare(self, a: &TaskEntry, b: &TaskEntry) -> Ordering {
        match self {
            SortKey::Done => a.checked.cmp(&b.checked),
            SortKey::Due => match (a.due, b.due) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            SortKey::Priority => match (a.priority, b.priority) {
                (0, 0) => Ordering::Equal,
                (0, _) => Ordering::Greater,
                (_, 0) => Ordering::Less,
                (x, y) => x.cmp(&y),
            },
        }
    }
}

/// Stable-sort the top-level tasks of every heading section independently.
/// Subtasks travel with their parent; headings and the lines between task
/// groups stay where they are. Returns whether anything moved.
pub fn sort_tasks(doc: &mut Document, key: SortKey) -> bool {
    let mut changed = false;
    let mut out = Vec::with_capacity(doc.blocks.len());
    let mut segment: Vec<Block> = Vec::new();

    for block in std::mem::take(&mut doc.blocks) {
        if matches!(block, Block::Heading { .. }) {
            changed |= sort_segment(&mut segment, key);
            out.append(&mut segment);
            out.push(block);
        } else {
            segment.push(block);
        }
    }
    changed |= sort_segment(&mut segment, key);
    out.append(&mut segment);

    doc.blocks = out;
    changed
}

fn sort_segment(blocks: &mut Vec<Block>, key: SortKey) -> bool {
    let Some(root_depth) = blocks.iter().filter_map(Block::as_task).map(|t| t.depth).min() else {
        return false;
    };

    // Each unit is a root task plus its descendants (and lines between them)
    let mut units: Vec<Range<usize>> = Vec::new();
    for (pos, block) in blocks.iter().enumerate() {
        if let Block::Task(task) = block {
            if task.depth <= root_depth {
                units.push(pos..pos + 1);
            } else if let Some(last) = units.last_mut() {
                last.end = pos + 1;
            }
        }
    }
    if units.len() < 2 {
        return false;
    }

    let root = |unit: &Range<usize>| blocks[unit.start].as_task();
    let mut order: Vec<usize> = (0..units.len()).collect();
    order.sort_by(|&a, &b| match (root(&units[a]), root(&units[b])) {
        (Some(x), Some(y)) => key.compare(x, y),
        _ => Ordering::Equal,
    });
    if order.iter().enumerate().all(|(i, &o)| i == o) {
        return false;
    }

    let mut source: Vec<Option<Block>> = blocks.drain(..).map(Some).collect();
    let unit_blocks: Vec<Vec<Block>> = units
        .iter()
        .map(|r| source[r.clone()].iter_mut().filter_map(Option::take).collect())
        .collect();
    let mut unit_blocks: Vec<Option<Vec<Block>>> = unit_blocks.into_iter().map(Some).collect();

    let mut pos = 0;
    let mut next_unit = 0;
    while pos < source.len() {
        if next_unit < units.len() && units[next_unit].start == pos {
            if let Some(sorted) = unit_blocks[order[next_unit]].take() {
                blocks.extend(sorted);
            }
            pos = units[next_unit].end;
            next_unit += 1;
        } else {
            if let Some(block) = source[pos].take() {
                blocks.push(block);
            }
            pos += 1;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{parse_document, serialize_document};
    use pretty_assertions::assert_eq;

    #[test]
    fn sort_done_moves_checked_last_within_section() {
        let mut doc = parse_document(
            "# A\n- [x] a1\n- [ ] a2\n\n# B\n- [x] b1\n  - [ ] b1 child\n- [ ] b2\n",
        )
        .unwrap();
        assert!(sort_tasks(&mut doc, SortKey::Done));
        assert_eq!(
            serialize_document(&doc),
            "# A\n- [ ] a2\n- [x] a1\n\n# B\n- [ ] b2\n- [x] b1\n  - [ ] b1 child\n"
        );
    }

    #[test]
    fn sort_due_puts_undated_last_and_is_stable() {
        let mut doc = parse_document(
            "- [ ] none1\n- [ ] late @due(2025-06-01)\n- [ ] none2\n- [ ] early @due(2025-01-01)\n",
        )
        .unwrap();
        sort_tasks(&mut doc, SortKey::Due);
        let texts: Vec<&str> = doc.tasks().map(|t| t.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["early @due(2025-01-01)", "late @due(2025-06-01)", "none1", "none2"]
        );
    }

    #[test]
    fn sort_priority_puts_none_last() {
        let mut doc = parse_document("- [ ] x\n- [ ] y !p3\n- [ ] z !p1\n").unwrap();
        sort_tasks(&mut doc, SortKey::Priority);
        let texts: Vec<&str> = doc.tasks().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["z !p1", "y !p3", "x"]);
    }

    #[test]
    fn already_sorted_reports_no_change() {
        let mut doc = parse_document("- [ ] a\n- [x] b\n").unwrap();
        assert!(!sort_tasks(&mut doc, SortKey::Done));
        assert_eq!(serialize_document(&doc), "- [ ] a\n- [x] b\n");
    }
}
