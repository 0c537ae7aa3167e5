use std::sync::atomic::{AtomicU64, Ordering};

use crate::model::metadata::Metadata;
use crate::model::task::{Heading, HeadingAnchor, TaskEntry, TaskId};

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate a process-unique task identity
pub fn next_task_id() -> TaskId {
    TaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
}

/// YAML front matter block: the verbatim lines (delimiters included) and
/// the parsed settings
#[derive(Debug, Clone, PartialEq)]
pub struct FrontMatter {
    pub lines: Vec<String>,
    pub metadata: Metadata,
}

/// One line-level element of a document
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// Anything that is not a heading or a task, emitted verbatim
    Line(String),
    Heading {
        level: u8,
        text: String,
        source: String,
    },
    Task(TaskEntry),
}

impl Block {
    pub fn as_task(&self) -> Option<&TaskEntry> {
        match self {
            Block::Task(task) => Some(task),
            _ => None,
        }
    }

    pub fn as_task_mut(&mut self) -> Option<&mut TaskEntry> {
        match self {
            Block::Task(task) => Some(task),
            _ => None,
        }
    }
}

/// A parsed todo document. Task order in `blocks` is authoritative; task
/// indices are positions among the task blocks only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub front_matter: Option<FrontMatter>,
    pub blocks: Vec<Block>,
}

impl Document {
    /// The document created for a file that does not exist yet
    pub fn default_content() -> &'static str {
        "# Todos\n\n"
    }

    pub fn metadata(&self) -> Metadata {
        self.front_matter
            .as_ref()
            .map(|fm| fm.metadata.clone())
            .unwrap_or_default()
    }

    pub fn tasks(&self) -> impl Iterator<Item = &TaskEntry> {
        self.blocks.iter().filter_map(Block::as_task)
    }

    pub fn tasks_mut(&mut self) -> impl Iterator<Item = &mut TaskEntry> {
        self.blocks.iter_mut().filter_map(Block::as_task_mut)
    }

    pub fn task_count(&self) -> usize {
        self.tasks().count()
    }

    pub fn task(&self, index: usize) -> Option<&TaskEntry> {
        self.tasks().nth(index)
    }

    pub fn task_mut(&mut self, index: usize) -> Option<&mut TaskEntry> {
        self.tasks_mut().nth(index)
    }

    /// Current index of the task with this identity
    pub fn index_of(&self, id: TaskId) -> Option<usize> {
        self.tasks().position(|t| t.id == id)
    }

    /// Position in `blocks` of the task at `index`
    pub fn block_position(&self, index: usize) -> Option<usize> {
        self.blocks
            .iter()
            .enumerate()
            .filter(|(_, b)| matches!(b, Block::Task(_)))
            .nth(index)
            .map(|(pos, _)| pos)
    }

    /// Exclusive end index (in task indices) of the subtree rooted at `index`
    pub fn subtree_end(&self, index: usize) -> usize {
        let tasks: Vec<&TaskEntry> = self.tasks().collect();
        let Some(root) = tasks.get(index) else {
            return index;
        };
        let mut end = index + 1;
        while end < tasks.len() && tasks[end].depth > root.depth {
            end += 1;
        }
        end
    }

    /// Extract headings with their anchors into the task stream
    pub fn headings(&self) -> Vec<Heading> {
        let total = self.task_count();
        let mut seen = 0;
        let mut headings = Vec::new();
        for block in &self.blocks {
            match block {
                Block::Task(_) => seen += 1,
                Block::Heading { level, text, .. } => headings.push(Heading {
                    level: *level,
                    text: text.clone(),
                    anchor: if seen < total {
                        HeadingAnchor::Before(seen)
                    } else {
                        HeadingAnchor::End
                    },
                }),
                Block::Line(_) => {}
            }
        }
        headings
    }

    /// Task index range `[start, end)` of the heading section containing
    /// `index` (the tasks between the nearest preceding heading and the next
    /// heading of any level)
    pub fn section_range(&self, index: usize) -> (usize, usize) {
        let mut start = 0;
        let mut seen = 0;
        let mut end = None;
        for block in &self.blocks {
            match block {
                Block::Task(_) => seen += 1,
                Block::Heading { .. } => {
                    if seen <= index {
                        start = seen;
                    } else {
                        end = Some(seen);
                        break;
                    }
                }
                Block::Line(_) => {}
            }
        }
        (start, end.unwrap_or(seen))
    }
}
