use std::ops::Range;

use crate::model::document::{Block, Document, next_task_id};
use crate::model::task::TaskEntry;

/// Error type for task operations
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("task not found: {0}")]
    NotFound(usize),
    #[error("cannot move a task relative to itself or its own subtasks")]
    InvalidMove,
    #[error("{0}")]
    Boundary(&'static str),
}

/// Where to insert a new task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    /// After the last task, at the top level
    End,
    /// After the given task's subtree, as its sibling
    After(usize),
}

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

/// Insert a new unchecked task. Returns its index.
pub fn insert_task(doc: &mut Document, position: InsertPosition, text: &str) -> Result<usize, TaskError> {
    match position {
        InsertPosition::End => {
            let count = doc.task_count();
            let task = TaskEntry::new(next_task_id(), text, false, 0);
            let at = match count.checked_sub(1).and_then(|last| doc.block_position(last)) {
                Some(pos) => pos + 1,
                None => end_of_content(doc),
            };
            doc.blocks.insert(at, Block::Task(task));
            Ok(count)
        }
        InsertPosition::After(index) => {
            let depth = doc.task(index).ok_or(TaskError::NotFound(index))?.depth;
            let end = doc.subtree_end(index);
            let at = block_after_task(doc, end - 1)?;
            let task = TaskEntry::new(next_task_id(), text, false, depth);
            doc.blocks.insert(at, Block::Task(task));
            Ok(end)
        }
    }
}

/// Replace a task's text and checkbox
pub fn update_task(doc: &mut Document, index: usize, text: &str, checked: bool) -> Result<(), TaskError> {
    let task = doc.task_mut(index).ok_or(TaskError::NotFound(index))?;
    if task.text != text {
        task.set_text(text);
    }
    task.set_checked(checked);
    Ok(())
}

/// Delete a task together with its subtasks. Returns the removed task.
pub fn delete_task(doc: &mut Document, index: usize) -> Result<TaskEntry, TaskError> {
    let range = subtree_blocks(doc, index)?;
    let removed: Vec<Block> = doc.blocks.drain(range).collect();
    removed
        .into_iter()
        .find_map(|b| match b {
            Block::Task(task) => Some(task),
            _ => None,
        })
        .ok_or(TaskError::NotFound(index))
}

// ---------------------------------------------------------------------------
// Structural moves
// ---------------------------------------------------------------------------

/// Move `src` (with its subtasks) next to `dst`.
///
/// Insert-before places the block directly above `dst` at `dst`'s depth.
/// Insert-after places it directly below `dst`'s own line: as `dst`'s first
/// child when `dst` has children, otherwise as its next sibling. Returns the
/// new index of `src`.
pub fn reposition_task(
    doc: &mut Document,
    src: usize,
    dst: usize,
    insert_after: bool,
) -> Result<usize, TaskError> {
    let count = doc.task_count();
    if src >= count {
        return Err(TaskError::NotFound(src));
    }
    if dst >= count {
        return Err(TaskError::NotFound(dst));
    }
    let src_end = doc.subtree_end(src);
    if (src..src_end).contains(&dst) {
        return Err(TaskError::InvalidMove);
    }

    let src_task = doc.task(src).ok_or(TaskError::NotFound(src))?;
    let (src_id, src_depth) = (src_task.id, src_task.depth);
    let dst_id = doc.task(dst).ok_or(TaskError::NotFound(dst))?.id;

    let range = subtree_blocks(doc, src)?;
    let mut moved: Vec<Block> = doc.blocks.drain(range).collect();

    let dst = doc.index_of(dst_id).ok_or(TaskError::NotFound(dst))?;
    let dst_depth = doc.task(dst).map(|t| t.depth).unwrap_or(0);
    let (at, new_depth) = if insert_after {
        let has_children = doc.task(dst + 1).is_some_and(|next| next.depth > dst_depth);
        let depth = if has_children { dst_depth + 1 } else { dst_depth };
        (block_after_task(doc, dst)?, depth)
    } else {
        (doc.block_position(dst).ok_or(TaskError::NotFound(dst))?, dst_depth)
    };

    for task in moved.iter_mut().filter_map(Block::as_task_mut) {
        let depth = task.depth - src_depth + new_depth;
        task.set_depth(depth);
    }
    doc.blocks.splice(at..at, moved);

    doc.index_of(src_id).ok_or(TaskError::NotFound(src))
}

/// Nest a task (and its subtasks) under its previous sibling in the same
/// heading section
pub fn indent_task(doc: &mut Document, index: usize) -> Result<(), TaskError> {
    let depth = doc.task(index).ok_or(TaskError::NotFound(index))?.depth;
    let (section_start, _) = doc.section_range(index);
    let before: Vec<&TaskEntry> = doc.tasks().take(index).skip(section_start).collect();
    let has_prev_sibling = before
        .iter()
        .rev()
        .find(|t| t.depth <= depth)
        .is_some_and(|t| t.depth == depth);
    if !has_prev_sibling {
        return Err(TaskError::Boundary("no previous sibling to indent under"));
    }
    shift_subtree(doc, index, |d| d + 1);
    Ok(())
}

/// Move a task (and its subtasks) one level out. Following deeper siblings
/// become its children; line order never changes.
pub fn outdent_task(doc: &mut Document, index: usize) -> Result<(), TaskError> {
    let depth = doc.task(index).ok_or(TaskError::NotFound(index))?.depth;
    if depth == 0 {
        return Err(TaskError::Boundary("already at top level"));
    }
    shift_subtree(doc, index, |d| d - 1);
    Ok(())
}

// ---------------------------------------------------------------------------
// Bulk operations
// ---------------------------------------------------------------------------

/// Set every task's checkbox. Returns the texts of tasks that changed.
pub fn set_all_checked(doc: &mut Document, checked: bool) -> Vec<String> {
    let mut changed = Vec::new();
    for task in doc.tasks_mut() {
        if task.checked != checked {
            task.set_checked(checked);
            changed.push(task.text.clone());
        }
    }
    changed
}

/// Delete every checked task (with its subtasks). Returns how many
/// checked tasks were removed.
pub fn clear_done(doc: &mut Document) -> usize {
    let mut removed = 0;
    loop {
        let Some(index) = doc.tasks().position(|t| t.checked) else {
            break;
        };
        if delete_task(doc, index).is_err() {
            break;
        }
        removed += 1;
    }
    removed
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Block range covering a task, its subtasks, and the lines between them
fn subtree_blocks(doc: &Document, index: usize) -> Result<Range<usize>, TaskError> {
    let start = doc.block_position(index).ok_or(TaskError::NotFound(index))?;
    let last = doc.subtree_end(index) - 1;
    let end = block_after_task(doc, last)?;
    Ok(start..end)
}

fn block_after_task(doc: &Document, index: usize) -> Result<usize, TaskError> {
    doc.block_position(index)
        .map(|pos| pos + 1)
        .ok_or(TaskError::NotFound(index))
}

/// Insertion point for the first task of a task-less document: before the
/// final empty line so the file keeps its trailing newline
fn end_of_content(doc: &Document) -> usize {
    match doc.blocks.last() {
        Some(Block::Line(line)) if line.is_empty() => doc.blocks.len() - 1,
        _ => doc.blocks.len(),
    }
}

fn shift_subtree(doc: &mut Document, index: usize, shift: impl Fn(usize) -> usize) {
    let end = doc.subtree_end(index);
    for task in doc.tasks_mut().skip(index).take(end - index) {
        let depth = shift(task.depth);
        task.set_depth(depth);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
