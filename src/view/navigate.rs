use crate::view::tree::Tree;

/// Vertical direction through the view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Position of the next task node after `pos`. `None` at the bottom edge.
pub fn next_visible(tree: &Tree, pos: usize) -> Option<usize> {
    (pos + 1..tree.len()).find(|&p| tree.task_at(p).is_some())
}

/// Position of the previous task node before `pos`. `None` at the top edge.
pub fn prev_visible(tree: &Tree, pos: usize) -> Option<usize> {
    (0..pos.min(tree.len())).rev().find(|&p| tree.task_at(p).is_some())
}

pub fn first_visible(tree: &Tree) -> Option<usize> {
    (0..tree.len()).find(|&p| tree.task_at(p).is_some())
}

pub fn last_visible(tree: &Tree) -> Option<usize> {
    (0..tree.len()).rev().find(|&p| tree.task_at(p).is_some())
}

/// Step up to `count` tasks in `dir`, clamping at the edge. Returns `None`
/// when not even one step was possible.
pub fn advance(tree: &Tree, pos: usize, count: usize, dir: Direction) -> Option<usize> {
    let mut current = pos;
    let mut moved = false;
    for _ in 0..count {
        let next = match dir {
            Direction::Down => next_visible(tree, current),
            Direction::Up => prev_visible(tree, current),
        };
        match next {
            Some(p) => {
                current = p;
                moved = true;
            }
            None => break,
        }
    }
    moved.then_some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::filter::FilterState;
    use crate::model::task::TaskEntry;
    use crate::parse::parse_document;
    use crate::view::{TreeBuilder, ViewContext};
    use chrono::NaiveDate;

    fn tree(src: &str, filter_done: bool) -> Tree {
        let doc = parse_document(src).unwrap();
        let tasks: Vec<&TaskEntry> = doc.tasks().collect();
        let filters = FilterState {
            filter_done,
            ..Default::default()
        };
        TreeBuilder::new(ViewContext::new(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()))
            .build(&tasks, &doc.headings(), &filters)
    }

    const DOC: &str = "# A\n- [ ] a\n- [x] b\n# B\n- [ ] c\n# C\n- [x] d\n";

    #[test]
    fn next_skips_headings_and_visits_each_task_once() {
        let t = tree(DOC, true);
        let mut visited = Vec::new();
        let mut pos = first_visible(&t);
        while let Some(p) = pos {
            visited.push(t.task_at(p).unwrap());
            pos = next_visible(&t, p);
        }
        assert_eq!(visited, vec![0, 2]);
    }

    #[test]
    fn edges_return_none() {
        let t = tree(DOC, false);
        let first = first_visible(&t).unwrap();
        let last = last_visible(&t).unwrap();
        assert_eq!(t.task_at(first), Some(0));
        assert_eq!(t.task_at(last), Some(3));
        assert_eq!(prev_visible(&t, first), None);
        assert_eq!(next_visible(&t, last), None);
    }

    #[test]
    fn advance_clamps_at_boundary() {
        let t = tree(DOC, false);
        let first = first_visible(&t).unwrap();
        let moved = advance(&t, first, 10, Direction::Down).unwrap();
        assert_eq!(t.task_at(moved), Some(3));
        let back = advance(&t, moved, 2, Direction::Up).unwrap();
        assert_eq!(t.task_at(back), Some(1));
        assert_eq!(advance(&t, first, 3, Direction::Up), None);
    }

    #[test]
    fn empty_tree_has_no_positions() {
        let t = tree("# Only heading\n", false);
        assert_eq!(first_visible(&t), None);
        assert_eq!(last_visible(&t), None);
    }
}
