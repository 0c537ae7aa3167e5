use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::io::store::{BackingStore, StoreError};
use crate::model::config::{Overrides, Settings, UserConfig};
use crate::model::document::Document;
use crate::model::filter::{DueBucket, FilterState, FilterUniverse};
use crate::model::task::TaskId;
use crate::ops::merge::{MergeReport, merge_checkboxes};
use crate::ops::search::{TaskMatch, search_tasks};
use crate::ops::sort::{SortKey, sort_tasks};
use crate::ops::task_ops::{self, InsertPosition, TaskError};
use crate::ops::universe::filter_universe;
use crate::session::undo::{Snapshot, UndoStack};
use crate::view::navigate::{advance, first_visible, last_visible};
use crate::view::selection::{rebase, rebase_after_delete};
use crate::view::{Direction, MoveEngine, MoveOutcome, Tree, TreeBuilder, ViewCache, ViewContext};

/// Errors surfaced to the user by the interactive session
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("file changed on disk and could not be merged ({0}); reload or force-save")]
    ExternalChangeConflict(#[source] StoreError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("file is read-only")]
    ReadOnly,
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error("no task selected")]
    NoSelection,
    #[error("{0}")]
    InvalidArgument(String),
}

/// What a mutation touched, for cache invalidation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Change {
    /// Checkbox state only; headings are unaffected
    Checkbox,
    /// Anything that adds, removes, re-nests or re-orders lines
    Structure,
}

/// The UI-facing engine: one open document, its filtered view, the
/// selection, undo history, and write-through to the backing store.
pub struct Session {
    doc: Document,
    store: Box<dyn BackingStore>,
    filters: FilterState,
    settings: Settings,
    ctx: ViewContext,
    builder: TreeBuilder,
    cache: ViewCache,
    selection: Option<TaskId>,
    /// Texts of tasks whose checkbox was toggled here since the last sync
    locally_modified: HashSet<String>,
    undo: UndoStack,
    universe: FilterUniverse,
    /// Set while an external change could not be merged
    conflict: bool,
    /// External changes were merged in memory but not yet written back
    merge_pending: bool,
    status: Option<String>,
}

/// Where the selection sat, by position and by text, so it can be found
/// again in a freshly parsed document
struct SelectionAnchor {
    index: usize,
    text: String,
    /// How many earlier tasks share the same text
    occurrence: usize,
}

impl Session {
    /// Load the document from `store` and layer settings from the user
    /// config, the file's front matter and command-line overrides
    pub fn open(
        mut store: Box<dyn BackingStore>,
        config: &UserConfig,
        overrides: &Overrides,
        ctx: ViewContext,
    ) -> Result<Session, SessionError> {
        let doc = store.read()?;
        let settings = Settings::resolve(config, &doc.metadata(), overrides);
        Ok(Session::with_document(doc, store, settings, ctx))
    }

    pub fn with_document(doc: Document, store: Box<dyn BackingStore>, settings: Settings, ctx: ViewContext) -> Session {
        let filters = FilterState {
            filter_done: settings.filter_done,
            ..Default::default()
        };
        let mut session = Session {
            universe: filter_universe(&doc, ctx.today),
            doc,
            store,
            filters,
            settings,
            ctx,
            builder: TreeBuilder::new(ctx),
            cache: ViewCache::new(),
            selection: None,
            locally_modified: HashSet::new(),
            undo: UndoStack::new(),
            conflict: false,
            merge_pending: false,
            status: None,
        };
        session.rebase_selection();
        session
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn context(&self) -> ViewContext {
        self.ctx
    }

    pub fn universe(&self) -> &FilterUniverse {
        &self.universe
    }

    pub fn path(&self) -> &Path {
        self.store.path()
    }

    pub fn has_conflict(&self) -> bool {
        self.conflict
    }

    pub fn locally_modified(&self) -> &HashSet<String> {
        &self.locally_modified
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    /// Cache counters, see [`ViewCache::build_counts`]
    pub fn cache_builds(&self) -> (usize, usize) {
        self.cache.build_counts()
    }

    pub fn take_status(&mut self) -> Option<String> {
        self.status.take()
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some(message.into());
    }

    /// Underlying index of the selected task
    pub fn selected_index(&self) -> Option<usize> {
        self.selection.and_then(|id| self.doc.index_of(id))
    }

    pub fn selected_id(&self) -> Option<TaskId> {
        self.selection
    }

    /// The filtered view with the selection applied
    pub fn tree(&mut self) -> &Tree {
        let selected = self.selected_index();
        let tree = self.cache.tree(&self.doc, &self.filters, &self.builder);
        tree.select_task(selected);
        tree
    }

    /// Select the task at `index`, or the nearest visible one
    pub fn select_index(&mut self, index: usize) {
        self.selection = self.doc.task(index).map(|t| t.id);
        self.rebase_selection();
    }

    // -----------------------------------------------------------------------
    // Navigation
    // -----------------------------------------------------------------------

    /// Step `count` visible tasks; returns whether the selection moved
    pub fn navigate(&mut self, dir: Direction, count: usize) -> bool {
        let current = self.selected_index();
        let tree = self.cache.tree(&self.doc, &self.filters, &self.builder);
        let target = match current.and_then(|i| tree.position_of_task(i)) {
            Some(pos) => advance(tree, pos, count.max(1), dir),
            None => first_visible(tree),
        };
        let Some(index) = target.and_then(|p| tree.task_at(p)) else {
            return false;
        };
        self.selection = self.doc.task(index).map(|t| t.id);
        true
    }

    pub fn select_first(&mut self) {
        let tree = self.cache.tree(&self.doc, &self.filters, &self.builder);
        let index = first_visible(tree).and_then(|p| tree.task_at(p));
        self.selection = index.and_then(|i| self.doc.task(i)).map(|t| t.id);
    }

    pub fn select_last(&mut self) {
        let tree = self.cache.tree(&self.doc, &self.filters, &self.builder);
        let index = last_visible(tree).and_then(|p| tree.task_at(p));
        self.selection = index.and_then(|i| self.doc.task(i)).map(|t| t.id);
    }

    fn rebase_selection(&mut self) {
        let wanted = self.selected_index();
        let tree = self.cache.tree(&self.doc, &self.filters, &self.builder);
        let index = rebase(tree, wanted);
        self.selection = index.and_then(|i| self.doc.task(i)).map(|t| t.id);
    }

    // -----------------------------------------------------------------------
    // Task mutations
    // -----------------------------------------------------------------------

    /// Move the selection one visible step; `Ok(false)` at a boundary
    pub fn move_selected(&mut self, dir: Direction) -> Result<bool, SessionError> {
        self.sync_before_write()?;
        let source = self.selected_index().ok_or(SessionError::NoSelection)?;
        let tree = self.cache.tree(&self.doc, &self.filters, &self.builder);
        let outcome = MoveEngine::new(tree, &self.doc).plan(source, dir);
        let MoveOutcome::Applied {
            source,
            target,
            insert_after,
        } = outcome
        else {
            return Ok(false);
        };
        self.mutate(Change::Structure, |doc| {
            task_ops::reposition_task(doc, source, target, insert_after)
        })?;
        self.rebase_selection();
        Ok(true)
    }

    pub fn toggle_selected(&mut self) -> Result<(), SessionError> {
        self.sync_before_write()?;
        let index = self.selected_index().ok_or(SessionError::NoSelection)?;
        let text = self
            .doc
            .task(index)
            .map(|t| t.text.clone())
            .ok_or(TaskError::NotFound(index))?;
        self.locally_modified.insert(text);
        self.mutate(Change::Checkbox, |doc| {
            let task = doc.task_mut(index).ok_or(TaskError::NotFound(index))?;
            let checked = !task.checked;
            task.set_checked(checked);
            Ok(())
        })?;
        self.rebase_selection();
        Ok(())
    }

    /// Delete the selected task with its subtasks. Returns the underlying
    /// index it had, or `None` when nothing was selected.
    pub fn delete_selected(&mut self) -> Result<Option<usize>, SessionError> {
        self.sync_before_write()?;
        let Some(index) = self.selected_index() else {
            return Ok(None);
        };
        self.mutate(Change::Structure, |doc| task_ops::delete_task(doc, index))?;
        let tree = self.cache.tree(&self.doc, &self.filters, &self.builder);
        let next = rebase_after_delete(tree, index);
        self.selection = next.and_then(|i| self.doc.task(i)).map(|t| t.id);
        Ok(Some(index))
    }

    /// Insert below the selection's subtree, or at the end with no selection
    pub fn insert_after_selected(&mut self, text: &str) -> Result<(), SessionError> {
        self.sync_before_write()?;
        match self.selected_index() {
            Some(index) => self.insert(InsertPosition::After(index), text),
            None => self.insert(InsertPosition::End, text),
        }
    }

    pub fn append(&mut self, text: &str) -> Result<(), SessionError> {
        self.sync_before_write()?;
        self.insert(InsertPosition::End, text)
    }

    fn insert(&mut self, position: InsertPosition, text: &str) -> Result<(), SessionError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        let index = self.mutate(Change::Structure, |doc| task_ops::insert_task(doc, position, text))?;
        self.selection = self.doc.task(index).map(|t| t.id);
        self.rebase_selection();
        Ok(())
    }

    /// Replace the selected task's text; blank input leaves it unchanged
    pub fn edit_selected(&mut self, text: &str) -> Result<(), SessionError> {
        self.sync_before_write()?;
        let index = self.selected_index().ok_or(SessionError::NoSelection)?;
        let text = text.trim();
        if text.is_empty() || self.doc.task(index).is_some_and(|t| t.text == text) {
            return Ok(());
        }
        self.mutate(Change::Structure, |doc| {
            let checked = doc.task(index).ok_or(TaskError::NotFound(index))?.checked;
            task_ops::update_task(doc, index, text, checked)
        })?;
        self.rebase_selection();
        Ok(())
    }

    pub fn indent_selected(&mut self) -> Result<(), SessionError> {
        self.sync_before_write()?;
        let index = self.selected_index().ok_or(SessionError::NoSelection)?;
        self.mutate(Change::Structure, |doc| task_ops::indent_task(doc, index))?;
        self.rebase_selection();
        Ok(())
    }

    pub fn outdent_selected(&mut self) -> Result<(), SessionError> {
        self.sync_before_write()?;
        let index = self.selected_index().ok_or(SessionError::NoSelection)?;
        self.mutate(Change::Structure, |doc| task_ops::outdent_task(doc, index))?;
        self.rebase_selection();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Bulk commands
    // -----------------------------------------------------------------------

    /// Check or uncheck every task; returns how many changed
    pub fn set_all_checked(&mut self, checked: bool) -> Result<usize, SessionError> {
        self.sync_before_write()?;
        let changed: Vec<String> = self
            .doc
            .tasks()
            .filter(|t| t.checked != checked)
            .map(|t| t.text.clone())
            .collect();
        if changed.is_empty() {
            return Ok(0);
        }
        self.locally_modified.extend(changed.iter().cloned());
        let count = self.mutate(Change::Checkbox, |doc| {
            Ok(task_ops::set_all_checked(doc, checked).len())
        })?;
        self.rebase_selection();
        Ok(count)
    }

    /// Delete every checked task; returns how many were removed
    pub fn clear_done(&mut self) -> Result<usize, SessionError> {
        self.sync_before_write()?;
        if !self.doc.tasks().any(|t| t.checked) {
            return Ok(0);
        }
        let earlier: Vec<TaskId> = match self.selected_index() {
            Some(w) => self.doc.tasks().take(w).map(|t| t.id).collect(),
            None => Vec::new(),
        };
        let had_selection = self.selection.is_some();
        let removed = self.mutate(Change::Structure, |doc| Ok(task_ops::clear_done(doc)))?;
        if had_selection && self.selected_index().is_none() {
            // The removed selection's slot, counted over the tasks that survived
            let slot = earlier
                .iter()
                .filter(|&&id| self.doc.index_of(id).is_some())
                .count();
            let tree = self.cache.tree(&self.doc, &self.filters, &self.builder);
            let next = rebase_after_delete(tree, slot);
            self.selection = next.and_then(|i| self.doc.task(i)).map(|t| t.id);
        }
        self.rebase_selection();
        Ok(removed)
    }

    /// Returns whether anything moved
    pub fn sort(&mut self, key: SortKey) -> Result<bool, SessionError> {
        self.sync_before_write()?;
        let mut trial = self.doc.clone();
        if !sort_tasks(&mut trial, key) {
            return Ok(false);
        }
        self.mutate(Change::Structure, |doc| Ok(sort_tasks(doc, key)))?;
        self.rebase_selection();
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Filters
    // -----------------------------------------------------------------------

    pub fn toggle_filter_done(&mut self) {
        self.filters.filter_done = !self.filters.filter_done;
        self.filters_changed();
    }

    pub fn toggle_tag_filter(&mut self, tag: &str) {
        self.filters.toggle_tag(tag);
        self.filters_changed();
    }

    pub fn toggle_priority_filter(&mut self, priority: u32) {
        self.filters.toggle_priority(priority);
        self.filters_changed();
    }

    pub fn toggle_due_filter(&mut self, bucket: DueBucket) {
        self.filters.toggle_due(bucket);
        self.filters_changed();
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
        self.filters_changed();
    }

    fn filters_changed(&mut self) {
        debug!(filters = ?self.filters, "filters changed");
        self.cache.invalidate_tree();
        self.rebase_selection();
    }

    /// Fuzzy-ranked tasks for the search prompt
    pub fn search(&self, query: &str) -> Vec<TaskMatch> {
        search_tasks(&self.doc, query)
    }

    // -----------------------------------------------------------------------
    // History and sync
    // -----------------------------------------------------------------------

    /// Restore the state before the last mutation; `Ok(false)` when there
    /// is nothing to undo
    pub fn undo(&mut self) -> Result<bool, SessionError> {
        self.sync_before_write()?;
        let Some(snapshot) = self.undo.pop() else {
            return Ok(false);
        };
        let current = Snapshot {
            document: std::mem::replace(&mut self.doc, snapshot.document),
            selection: self.selection,
        };
        self.selection = snapshot.selection;
        self.cache.invalidate_structure();
        if let Err(e) = self.persist(Change::Structure) {
            if !matches!(e, SessionError::ExternalChangeConflict(_)) {
                // Put everything back, including the history entry
                self.undo.push(Snapshot {
                    document: std::mem::replace(&mut self.doc, current.document),
                    selection: self.selection,
                });
                self.selection = current.selection;
                self.cache.invalidate_structure();
            }
            return Err(e);
        }
        self.refresh_universe();
        self.rebase_selection();
        Ok(true)
    }

    /// Write `snapshot` back and forget history recorded after
    /// `history_len`; used to cancel move mode
    pub fn restore(&mut self, snapshot: Snapshot, history_len: usize) -> Result<(), SessionError> {
        if self.sync_before_write()? {
            // The snapshot predates what is on disk now; keep the merged state
            self.status = Some("file changed on disk; move kept".to_string());
            return Ok(());
        }
        self.mutate(Change::Structure, |doc| {
            *doc = snapshot.document;
            Ok(())
        })?;
        self.undo.truncate(history_len);
        self.selection = snapshot.selection;
        self.rebase_selection();
        Ok(())
    }

    pub fn history_len(&self) -> usize {
        self.undo.len()
    }

    /// Capture the current state, e.g. before entering move mode
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            document: self.doc.clone(),
            selection: self.selection,
        }
    }

    /// Discard local state and re-read the file
    pub fn reload(&mut self) -> Result<(), SessionError> {
        let doc = self.store.read()?;
        self.replace_document(doc);
        self.undo.clear();
        self.locally_modified.clear();
        self.conflict = false;
        self.merge_pending = false;
        info!(path = %self.store.path().display(), "reloaded");
        Ok(())
    }

    /// Write through the normal path (merging external changes)
    pub fn save(&mut self) -> Result<(), SessionError> {
        self.sync_before_write()?;
        self.persist(Change::Checkbox)
    }

    /// Write local state over whatever is on disk
    pub fn force_save(&mut self) -> Result<(), SessionError> {
        self.ensure_writable()?;
        self.store.write(&self.doc)?;
        self.locally_modified.clear();
        self.conflict = false;
        self.merge_pending = false;
        warn!(path = %self.store.path().display(), "force-saved over external changes");
        Ok(())
    }

    /// Periodic external-change check. Returns the merge report when the
    /// file changed and was merged in.
    pub fn check_external(&mut self) -> Result<Option<MergeReport>, SessionError> {
        if !self.store.check_modified() {
            return Ok(None);
        }
        let disk = self.store.read().map_err(SessionError::ExternalChangeConflict)?;
        let (merged, report) = merge_checkboxes(&self.doc, disk, &self.locally_modified);
        let needs_write = !report.applied.is_empty() && !self.settings.read_only;
        self.adopt_merged(merged);
        if needs_write && let Err(e) = self.store.write(&self.doc) {
            self.conflict = true;
            self.merge_pending = true;
            return Err(SessionError::ExternalChangeConflict(e));
        }
        if !self.settings.read_only {
            self.locally_modified.clear();
        }
        Ok(Some(report))
    }

    pub fn toggle_read_only(&mut self) {
        self.settings.read_only = !self.settings.read_only;
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn ensure_writable(&self) -> Result<(), SessionError> {
        if self.settings.read_only {
            Err(SessionError::ReadOnly)
        } else {
            Ok(())
        }
    }

    /// Bring in external changes before a mutation reads the selection,
    /// so the edit lands on top of what is on disk. Returns whether the
    /// document was replaced.
    fn sync_before_write(&mut self) -> Result<bool, SessionError> {
        self.ensure_writable()?;
        if !self.store.check_modified() {
            return Ok(false);
        }
        let disk = match self.store.read() {
            Ok(disk) => disk,
            Err(e) => {
                self.conflict = true;
                return Err(SessionError::ExternalChangeConflict(e));
            }
        };
        let (merged, report) = merge_checkboxes(&self.doc, disk, &self.locally_modified);
        self.adopt_merged(merged);
        self.merge_pending = true;
        self.set_merge_status(&report);
        Ok(true)
    }

    /// Snapshot, apply `f`, write through. A failed operation or a failed
    /// plain write restores the previous state; a failure to write merged
    /// external changes keeps the local state and flags the conflict.
    fn mutate<T>(
        &mut self,
        change: Change,
        f: impl FnOnce(&mut Document) -> Result<T, TaskError>,
    ) -> Result<T, SessionError> {
        self.ensure_writable()?;
        let before = self.snapshot();
        let value = match f(&mut self.doc) {
            Ok(value) => value,
            Err(e) => {
                self.doc = before.document;
                return Err(e.into());
            }
        };
        match change {
            Change::Checkbox => self.cache.invalidate_tree(),
            Change::Structure => self.cache.invalidate_structure(),
        }
        self.undo.push(before.clone());

        if let Err(e) = self.persist(change) {
            if !matches!(e, SessionError::ExternalChangeConflict(_)) {
                self.undo.discard_last();
                self.doc = before.document;
                self.selection = before.selection;
                self.cache.invalidate_structure();
            }
            return Err(e);
        }
        self.refresh_universe();
        Ok(value)
    }

    /// Write the document. A file that changed since the last sync is
    /// merged first when only checkboxes changed; structural edits refuse
    /// to overwrite it.
    fn persist(&mut self, change: Change) -> Result<(), SessionError> {
        if self.store.check_modified() {
            if change == Change::Structure {
                self.conflict = true;
                return Err(SessionError::ExternalChangeConflict(StoreError::Changed {
                    path: self.store.path().to_path_buf(),
                }));
            }
            let disk = match self.store.read() {
                Ok(disk) => disk,
                Err(e) => {
                    self.conflict = true;
                    return Err(SessionError::ExternalChangeConflict(e));
                }
            };
            let (merged, report) = merge_checkboxes(&self.doc, disk, &self.locally_modified);
            self.adopt_merged(merged);
            self.merge_pending = true;
            self.set_merge_status(&report);
        }
        if let Err(e) = self.store.write(&self.doc) {
            if self.merge_pending {
                self.conflict = true;
                return Err(SessionError::ExternalChangeConflict(e));
            }
            return Err(e.into());
        }
        self.locally_modified.clear();
        self.conflict = false;
        self.merge_pending = false;
        Ok(())
    }

    fn set_merge_status(&mut self, report: &MergeReport) {
        self.status = Some(format!(
            "merged external changes ({} kept, {} dropped, {} added)",
            report.applied.len(),
            report.dropped.len(),
            report.added.len()
        ));
    }

    fn adopt_merged(&mut self, merged: Document) {
        self.replace_document(merged);
        self.undo.push_sync_marker();
    }

    /// Swap in a freshly read document, keeping the selection on the same
    /// task when it still exists and on its nearest visible neighbour
    /// otherwise. Task ids do not survive a re-parse, so the task is found
    /// again by text.
    fn replace_document(&mut self, doc: Document) {
        let anchor = self.selection_anchor();
        self.doc = doc;
        self.cache.invalidate_structure();
        self.refresh_universe();
        let wanted = anchor.map(|a| {
            self.doc
                .tasks()
                .enumerate()
                .filter(|(_, t)| t.text == a.text)
                .nth(a.occurrence)
                .map_or(a.index, |(i, _)| i)
        });
        let tree = self.cache.tree(&self.doc, &self.filters, &self.builder);
        let index = rebase(tree, wanted);
        self.selection = index.and_then(|i| self.doc.task(i)).map(|t| t.id);
    }

    fn selection_anchor(&self) -> Option<SelectionAnchor> {
        let index = self.selected_index()?;
        let text = self.doc.task(index)?.text.clone();
        let occurrence = self.doc.tasks().take(index).filter(|t| t.text == text).count();
        Some(SelectionAnchor {
            index,
            text,
            occurrence,
        })
    }

    fn refresh_universe(&mut self) {
        self.universe = filter_universe(&self.doc, self.ctx.today);
    }
}
