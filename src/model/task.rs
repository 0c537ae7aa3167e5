use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Session-unique identity of a task. Survives reindexing caused by moves,
/// inserts and deletes; never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(pub u64);

/// List marker used by a task line (`-`, `*` or `+`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ListMarker {
    #[default]
    Dash,
    Star,
    Plus,
}

impl ListMarker {
    pub fn as_char(self) -> char {
        match self {
            ListMarker::Dash => '-',
            ListMarker::Star => '*',
            ListMarker::Plus => '+',
        }
    }

    pub fn from_char(c: char) -> Option<ListMarker> {
        match c {
            '-' => Some(ListMarker::Dash),
            '*' => Some(ListMarker::Star),
            '+' => Some(ListMarker::Plus),
            _ => None,
        }
    }
}

/// One actionable item with its parsed inline markers and source tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEntry {
    pub id: TaskId,
    /// Full task text after the checkbox, markers included
    pub text: String,
    pub checked: bool,
    /// Tags (lowercased, without `#`), in first-seen order
    pub tags: Vec<String>,
    /// Priority number from `!pN`; 0 = none
    pub priority: u32,
    pub due: Option<NaiveDate>,
    /// Nesting depth (0 = top-level)
    pub depth: usize,
    #[serde(skip)]
    pub marker: ListMarker,

    // --- Source tracking ---
    /// The original source line (for verbatim emission)
    #[serde(skip)]
    pub source_line: Option<String>,
    /// Whether this task has been modified since parsing
    #[serde(skip)]
    pub dirty: bool,
}

impl TaskEntry {
    /// Create a new task, marked dirty (no source)
    pub fn new(id: TaskId, text: &str, checked: bool, depth: usize) -> Self {
        let mut task = TaskEntry {
            id,
            text: String::new(),
            checked,
            tags: Vec::new(),
            priority: 0,
            due: None,
            depth,
            marker: ListMarker::Dash,
            source_line: None,
            dirty: true,
        };
        task.set_text(text);
        task
    }

    /// Replace the text and re-extract tags, priority and due date
    pub fn set_text(&mut self, text: &str) {
        let markers = crate::parse::markers::extract_markers(text);
        self.text = text.to_string();
        self.tags = markers.tags;
        self.priority = markers.priority;
        self.due = markers.due;
        self.dirty = true;
    }

    pub fn set_checked(&mut self, checked: bool) {
        if self.checked != checked {
            self.checked = checked;
            self.dirty = true;
        }
    }

    pub fn set_depth(&mut self, depth: usize) {
        if self.depth != depth {
            self.depth = depth;
            self.dirty = true;
        }
    }

    /// Case-insensitive tag membership
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

impl PartialEq for TaskEntry {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text && self.checked == other.checked && self.depth == other.depth
    }
}

impl Eq for TaskEntry {}

/// Where a heading sits relative to the task stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeadingAnchor {
    /// Precedes the task at this index
    Before(usize),
    /// After the last task
    End,
}

/// A section marker extracted from the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    /// 1-6
    pub level: u8,
    pub text: String,
    pub anchor: HeadingAnchor,
}
