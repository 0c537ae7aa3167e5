use crate::view::tree::Tree;

/// Restore a valid selection after a mutation or filter change.
///
/// Keeps `wanted` if that task is visible; otherwise picks the visible task
/// closest to it by underlying index, the later one on a tie. `None` when
/// nothing is visible.
pub fn rebase(tree: &Tree, wanted: Option<usize>) -> Option<usize> {
    let visible = tree.visible_tasks();
    let Some(wanted) = wanted else {
        return visible.first().copied();
    };
    if visible.binary_search(&wanted).is_ok() {
        return Some(wanted);
    }
    visible
        .iter()
        .copied()
        .min_by_key(|&i| (i.abs_diff(wanted), i < wanted))
}

/// Selection after deleting the task that sat at `deleted` (indices after
/// it have already shifted down): the next visible task at or after that
/// position, else the closest one before it, else nothing.
pub fn rebase_after_delete(tree: &Tree, deleted: usize) -> Option<usize> {
    let visible = tree.visible_tasks();
    visible
        .iter()
        .copied()
        .find(|&i| i >= deleted)
        .or_else(|| visible.iter().copied().rev().find(|&i| i < deleted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::filter::FilterState;
    use crate::model::task::TaskEntry;
    use crate::ops::task_ops::delete_task;
    use crate::parse::parse_document;
    use crate::view::{TreeBuilder, ViewContext};
    use chrono::NaiveDate;

    fn tree(src: &str, filter_done: bool) -> Tree {
        let doc = parse_document(src).unwrap();
        tree_of(&doc, filter_done)
    }

    fn tree_of(doc: &crate::model::document::Document, filter_done: bool) -> Tree {
        let tasks: Vec<&TaskEntry> = doc.tasks().collect();
        let filters = FilterState {
            filter_done,
            ..Default::default()
        };
        TreeBuilder::new(ViewContext::new(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()))
            .build(&tasks, &doc.headings(), &filters)
    }

    #[test]
    fn visible_selection_is_kept() {
        let t = tree("- [ ] a\n- [x] b\n- [ ] c\n", true);
        assert_eq!(rebase(&t, Some(2)), Some(2));
    }

    #[test]
    fn hidden_selection_moves_to_nearest_preferring_forward() {
        // visible: 0, 2 ; hidden 1 is equidistant from both
        let t = tree("- [ ] a\n- [x] b\n- [ ] c\n", true);
        assert_eq!(rebase(&t, Some(1)), Some(2));
        // visible: 0, 3 ; 1 is closer to 0
        let t = tree("- [ ] a\n- [x] b\n- [x] c\n- [ ] d\n", true);
        assert_eq!(rebase(&t, Some(1)), Some(0));
        assert_eq!(rebase(&t, Some(2)), Some(3));
    }

    #[test]
    fn out_of_range_selection_clamps_to_last() {
        let t = tree("- [ ] a\n- [ ] b\n", false);
        assert_eq!(rebase(&t, Some(9)), Some(1));
    }

    #[test]
    fn nothing_visible_yields_none() {
        let t = tree("- [x] a\n- [x] b\n", true);
        assert_eq!(rebase(&t, Some(0)), None);
        assert_eq!(rebase(&t, None), None);
    }

    #[test]
    fn no_selection_picks_first_visible() {
        let t = tree("- [x] a\n- [ ] b\n", true);
        assert_eq!(rebase(&t, None), Some(1));
    }

    #[test]
    fn delete_prefers_next_then_previous() {
        let mut doc = parse_document("- [ ] a\n- [ ] b\n- [ ] c\n").unwrap();
        delete_task(&mut doc, 1).unwrap();
        assert_eq!(rebase_after_delete(&tree_of(&doc, false), 1), Some(1));

        delete_task(&mut doc, 1).unwrap();
        assert_eq!(rebase_after_delete(&tree_of(&doc, false), 1), Some(0));

        delete_task(&mut doc, 0).unwrap();
        assert_eq!(rebase_after_delete(&tree_of(&doc, false), 0), None);
    }

    #[test]
    fn deleting_sole_visible_task_never_selects_hidden() {
        let mut doc = parse_document("- [x] a\n- [ ] b\n- [x] c\n").unwrap();
        delete_task(&mut doc, 1).unwrap();
        let t = tree_of(&doc, true);
        assert_eq!(rebase_after_delete(&t, 1), None);
        assert_eq!(rebase(&t, Some(1)), None);
    }
}
