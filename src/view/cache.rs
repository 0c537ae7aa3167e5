use tracing::trace;

use crate::model::document::Document;
use crate::model::filter::FilterState;
use crate::model::task::{Heading, TaskEntry};
use crate::view::tree::{Tree, TreeBuilder};

/// Memoized heading extraction and tree construction.
///
/// Structural edits invalidate both; filter changes invalidate only the
/// tree. Rebuilding is side-effect free, so extra invalidation is harmless.
#[derive(Debug, Default)]
pub struct ViewCache {
    headings: Option<Vec<Heading>>,
    tree: Option<Tree>,
    heading_builds: usize,
    tree_builds: usize,
}

impl ViewCache {
    pub fn new() -> Self {
        ViewCache::default()
    }

    /// Insert, delete, move, indent, outdent, text edit, reload
    pub fn invalidate_structure(&mut self) {
        self.headings = None;
        self.tree = None;
    }

    /// Filter or checkbox change: headings are unaffected
    pub fn invalidate_tree(&mut self) {
        self.tree = None;
    }

    pub fn is_tree_current(&self) -> bool {
        self.tree.is_some()
    }

    pub fn headings(&mut self, doc: &Document) -> &[Heading] {
        if self.headings.is_none() {
            self.heading_builds += 1;
            self.headings = Some(doc.headings());
        }
        self.headings.as_deref().unwrap_or_default()
    }

    pub fn tree(&mut self, doc: &Document, filters: &FilterState, builder: &TreeBuilder) -> &mut Tree {
        if self.tree.is_none() {
            let tasks: Vec<&TaskEntry> = doc.tasks().collect();
            let tree = builder.build(&tasks, self.headings(doc), filters);
            self.tree_builds += 1;
            trace!(nodes = tree.len(), "rebuilt view tree");
            self.tree = Some(tree);
        }
        self.tree.get_or_insert_with(Tree::default)
    }

    /// (heading extractions, tree builds) since creation
    pub fn build_counts(&self) -> (usize, usize) {
        (self.heading_builds, self.tree_builds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_document;
    use crate::view::ViewContext;
    use chrono::NaiveDate;

    fn builder() -> TreeBuilder {
        TreeBuilder::new(ViewContext::new(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()))
    }

    #[test]
    fn repeated_reads_build_once() {
        let doc = parse_document("# A\n- [ ] a\n").unwrap();
        let mut cache = ViewCache::new();
        let filters = FilterState::default();
        cache.tree(&doc, &filters, &builder());
        cache.tree(&doc, &filters, &builder());
        assert_eq!(cache.build_counts(), (1, 1));
    }

    #[test]
    fn filter_change_rebuilds_tree_only() {
        let doc = parse_document("# A\n- [ ] a\n").unwrap();
        let mut cache = ViewCache::new();
        let filters = FilterState::default();
        cache.tree(&doc, &filters, &builder());
        cache.invalidate_tree();
        cache.tree(&doc, &filters, &builder());
        assert_eq!(cache.build_counts(), (1, 2));
    }

    #[test]
    fn structural_change_rebuilds_both() {
        let doc = parse_document("# A\n- [ ] a\n").unwrap();
        let mut cache = ViewCache::new();
        let filters = FilterState::default();
        cache.tree(&doc, &filters, &builder());
        cache.invalidate_structure();
        assert!(!cache.is_tree_current());
        cache.tree(&doc, &filters, &builder());
        assert_eq!(cache.build_counts(), (2, 2));
    }
}
