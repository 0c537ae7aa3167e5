use std::ops::Range;

use crate::model::document::Document;
use crate::view::navigate::Direction;
use crate::view::tree::{Tree, VisibleNode};

/// What a one-step move resolves to in the underlying order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Reposition `source` next to `target`
    Applied {
        source: usize,
        target: usize,
        insert_after: bool,
    },
    /// Nothing to move past in that direction
    Boundary,
}

/// Translates "move the selected task one visible step" into an insertion
/// relative to a neighbor task.
///
/// The neighbor is the nearest visible task in the requested direction; any
/// hidden tasks in between keep their relative order. Moving straight onto a
/// task inserts on its far side (after when moving down, before when moving
/// up). When one or more headings sit in between, the move crosses into the
/// neighboring section and lands on the near side of the first visible task
/// there instead.
pub struct MoveEngine<'a> {
    tree: &'a Tree,
    doc: &'a Document,
}

impl<'a> MoveEngine<'a> {
    pub fn new(tree: &'a Tree, doc: &'a Document) -> Self {
        MoveEngine { tree, doc }
    }

    pub fn plan(&self, source: usize, dir: Direction) -> MoveOutcome {
        let Some(pos) = self.tree.position_of_task(source) else {
            return MoveOutcome::Boundary;
        };
        // The moved task carries its subtasks; never target one of them
        let own: Range<usize> = source..self.doc.subtree_end(source);

        let positions: Box<dyn Iterator<Item = usize>> = match dir {
            Direction::Down => Box::new(pos + 1..self.tree.len()),
            Direction::Up => Box::new((0..pos).rev()),
        };

        let mut crossed_heading = false;
        for p in positions {
            match self.tree.node(p) {
                Some(VisibleNode::Heading { .. }) => crossed_heading = true,
                Some(VisibleNode::Task { index }) if own.contains(index) => {}
                Some(VisibleNode::Task { index }) => {
                    let far_side = !crossed_heading;
                    let insert_after = match dir {
                        Direction::Down => far_side,
                        Direction::Up => !far_side,
                    };
                    return MoveOutcome::Applied {
                        source,
                        target: *index,
                        insert_after,
                    };
                }
                None => break,
            }
        }
        MoveOutcome::Boundary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::filter::FilterState;
    use crate::model::task::TaskEntry;
    use crate::ops::task_ops::reposition_task;
    use crate::parse::{parse_document, serialize_document};
    use crate::view::{TreeBuilder, ViewContext};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn build(doc: &Document, filters: &FilterState) -> Tree {
        let tasks: Vec<&TaskEntry> = doc.tasks().collect();
        TreeBuilder::new(ViewContext::new(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()))
            .build(&tasks, &doc.headings(), filters)
    }

    fn done_filter() -> FilterState {
        FilterState {
            filter_done: true,
            ..Default::default()
        }
    }

    /// Plan and apply one move of the task with `text`; returns whether it moved
    fn step(doc: &mut Document, filters: &FilterState, text: &str, dir: Direction) -> bool {
        let tree = build(doc, filters);
        let source = doc.tasks().position(|t| t.text == text).unwrap();
        let outcome = MoveEngine::new(&tree, doc).plan(source, dir);
        match outcome {
            MoveOutcome::Applied {
                source,
                target,
                insert_after,
            } => {
                reposition_task(doc, source, target, insert_after).unwrap();
                true
            }
            MoveOutcome::Boundary => false,
        }
    }

    fn order(doc: &Document) -> Vec<String> {
        doc.tasks().map(|t| t.text.clone()).collect()
    }

    #[test]
    fn move_down_inserts_after_next_visible_past_hidden() {
        let mut doc = parse_document("- [ ] A\n- [x] B\n- [ ] C\n").unwrap();
        assert!(step(&mut doc, &done_filter(), "A", Direction::Down));
        assert_eq!(order(&doc), vec!["B", "C", "A"]);
    }

    #[test]
    fn plan_is_an_insertion_not_a_swap() {
        let doc = parse_document("- [ ] A\n- [x] B\n- [ ] C\n").unwrap();
        let tree = build(&doc, &done_filter());
        assert_eq!(
            MoveEngine::new(&tree, &doc).plan(0, Direction::Down),
            MoveOutcome::Applied {
                source: 0,
                target: 2,
                insert_after: true
            }
        );
        assert_eq!(
            MoveEngine::new(&tree, &doc).plan(2, Direction::Up),
            MoveOutcome::Applied {
                source: 2,
                target: 0,
                insert_after: false
            }
        );
    }

    #[test]
    fn round_trip_without_hidden_tasks_restores_order() {
        let mut doc = parse_document("- [ ] A\n- [ ] B\n- [ ] C\n").unwrap();
        let filters = FilterState::default();
        assert!(step(&mut doc, &filters, "A", Direction::Down));
        assert_eq!(order(&doc), vec!["B", "A", "C"]);
        assert!(step(&mut doc, &filters, "A", Direction::Up));
        assert_eq!(order(&doc), vec!["A", "B", "C"]);
    }

    #[test]
    fn round_trip_across_hidden_tasks_is_not_restored() {
        let mut doc = parse_document("- [ ] A\n- [x] B\n- [ ] C\n").unwrap();
        let filters = done_filter();
        assert!(step(&mut doc, &filters, "A", Direction::Down));
        assert!(step(&mut doc, &filters, "A", Direction::Up));
        assert_eq!(order(&doc), vec!["B", "A", "C"]);
    }

    #[test]
    fn edges_are_boundaries() {
        let mut doc = parse_document("- [ ] A\n- [ ] B\n").unwrap();
        let filters = FilterState::default();
        assert!(!step(&mut doc, &filters, "A", Direction::Up));
        assert!(!step(&mut doc, &filters, "B", Direction::Down));
        assert_eq!(order(&doc), vec!["A", "B"]);
    }

    #[test]
    fn hidden_tasks_beyond_last_visible_are_a_boundary() {
        let mut doc = parse_document("- [ ] A\n- [x] B\n").unwrap();
        assert!(!step(&mut doc, &done_filter(), "A", Direction::Down));
    }

    #[test]
    fn crossing_heading_down_lands_at_top_of_next_section() {
        let mut doc = parse_document(
            "# One\n- [ ] A\n- [x] A done\n# Two\n- [x] B done\n- [ ] B\n",
        )
        .unwrap();
        assert!(step(&mut doc, &done_filter(), "A", Direction::Down));
        assert_eq!(
            serialize_document(&doc),
            "# One\n- [x] A done\n# Two\n- [x] B done\n- [ ] A\n- [ ] B\n"
        );
    }

    #[test]
    fn crossing_heading_up_lands_below_last_visible_of_previous_section() {
        let mut doc = parse_document("# One\n- [ ] A\n- [x] A done\n# Two\n- [ ] B\n").unwrap();
        assert!(step(&mut doc, &done_filter(), "B", Direction::Up));
        assert_eq!(
            serialize_document(&doc),
            "# One\n- [ ] A\n- [ ] B\n- [x] A done\n# Two\n"
        );
    }

    #[test]
    fn filtered_sections_are_skipped() {
        let mut doc = parse_document(
            "# One\n- [ ] A\n# Hidden\n- [x] H\n# Three\n- [ ] C\n",
        )
        .unwrap();
        assert!(step(&mut doc, &done_filter(), "A", Direction::Down));
        assert_eq!(
            serialize_document(&doc),
            "# One\n# Hidden\n- [x] H\n# Three\n- [ ] A\n- [ ] C\n"
        );
    }

    #[test]
    fn trailing_empty_heading_is_a_boundary() {
        let mut doc = parse_document("- [ ] A\n# Archive\n").unwrap();
        assert!(!step(&mut doc, &FilterState::default(), "A", Direction::Down));
    }

    #[test]
    fn parent_moves_with_subtasks_past_them() {
        let mut doc = parse_document("- [ ] P\n  - [ ] P1\n- [ ] Q\n").unwrap();
        assert!(step(&mut doc, &FilterState::default(), "P", Direction::Down));
        assert_eq!(serialize_document(&doc), "- [ ] Q\n- [ ] P\n  - [ ] P1\n");
    }

    #[test]
    fn repeated_moves_walk_the_visible_list() {
        let mut doc = parse_document("- [ ] A\n- [ ] B\n- [x] x\n- [ ] C\n- [ ] D\n").unwrap();
        let filters = done_filter();
        while step(&mut doc, &filters, "A", Direction::Down) {}
        assert_eq!(order(&doc), vec!["B", "x", "C", "D", "A"]);
    }
}
