use crate::model::document::Document;
use crate::model::task::TaskId;

const UNDO_STACK_LIMIT: usize = 500;

/// State captured before a mutation
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub document: Document,
    pub selection: Option<TaskId>,
}

#[derive(Debug, Clone)]
enum Entry {
    State(Snapshot),
    /// External change was merged in; undo cannot cross this
    SyncMarker,
}

/// Bounded snapshot history; the oldest entries fall off first
#[derive(Debug, Default)]
pub struct UndoStack {
    entries: Vec<Entry>,
}

impl UndoStack {
    pub fn new() -> Self {
        UndoStack::default()
    }

    pub fn push(&mut self, snapshot: Snapshot) {
        self.push_entry(Entry::State(snapshot));
    }

    pub fn push_sync_marker(&mut self) {
        if !matches!(self.entries.last(), Some(Entry::SyncMarker) | None) {
            self.push_entry(Entry::SyncMarker);
        }
    }

    fn push_entry(&mut self, entry: Entry) {
        self.entries.push(entry);
        if self.entries.len() > UNDO_STACK_LIMIT {
            self.entries.drain(..self.entries.len() - UNDO_STACK_LIMIT);
        }
    }

    /// Latest snapshot, or `None` when empty or blocked by a sync marker
    pub fn pop(&mut self) -> Option<Snapshot> {
        match self.entries.last()? {
            Entry::SyncMarker => None,
            Entry::State(_) => match self.entries.pop() {
                Some(Entry::State(s)) => Some(s),
                _ => None,
            },
        }
    }

    /// Drop the latest snapshot after the mutation it guarded failed
    pub fn discard_last(&mut self) {
        if matches!(self.entries.last(), Some(Entry::State(_))) {
            self.entries.pop();
        }
    }

    /// Forget everything recorded after the first `len` entries
    pub fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        !self
            .entries
            .iter()
            .any(|e| matches!(e, Entry::State(_)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
