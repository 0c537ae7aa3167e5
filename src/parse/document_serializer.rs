use crate::model::document::{Block, Document};
use crate::model::task::TaskEntry;
use crate::parse::document_parser::count_indent;

/// Serialize a document back to markdown.
///
/// Literal lines, headings and clean task lines are emitted verbatim. Dirty
/// tasks are rendered canonically. A task line is re-indented whenever its
/// source indentation would parse back to a different depth at its current
/// position (after a move, for instance).
pub fn serialize_document(doc: &Document) -> String {
    let mut lines: Vec<String> = Vec::with_capacity(doc.blocks.len() + 4);
    if let Some(fm) = &doc.front_matter {
        lines.extend(fm.lines.iter().cloned());
    }

    // Emitted indent columns of the enclosing task items, by depth
    let mut indents: Vec<usize> = Vec::new();
    let mut in_fence: Option<String> = None;

    for block in &doc.blocks {
        match block {
            Block::Line(line) => {
                let trimmed = line.trim_start();
                if let Some(open) = &in_fence {
                    if trimmed.starts_with(open.as_str()) {
                        in_fence = None;
                    }
                } else if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
                    in_fence = Some(trimmed[..3].to_string());
                    indents.clear();
                } else if !line.trim().is_empty() && count_indent(line) == 0 {
                    indents.clear();
                }
                lines.push(line.clone());
            }
            Block::Heading { source, .. } => {
                indents.clear();
                lines.push(source.clone());
            }
            Block::Task(task) => {
                let (line, indent) = render_task(task, &indents);
                indents.truncate(task.depth.min(indents.len()));
                indents.push(indent);
                lines.push(line);
            }
        }
    }

    lines.join("\n")
}

/// Render one task line given the indents of the open list levels. Returns
/// the line and the indent column it was emitted at.
fn render_task(task: &TaskEntry, indents: &[usize]) -> (String, usize) {
    let d = task.depth;
    if !task.dirty
        && let Some(source) = &task.source_line
    {
        let x = count_indent(source);
        if indent_parses_to_depth(x, d, indents) {
            return (source.clone(), x);
        }
        let x = canonical_indent(d, indents);
        return (format!("{}{}", " ".repeat(x), source.trim_start()), x);
    }

    let x = canonical_indent(d, indents);
    let line = format!(
        "{}{} [{}] {}",
        " ".repeat(x),
        task.marker.as_char(),
        if task.checked { 'x' } else { ' ' },
        task.text
    );
    (line.trim_end().to_string(), x)
}

/// Whether a line indented `x` columns would parse at depth `d`
fn indent_parses_to_depth(x: usize, d: usize, indents: &[usize]) -> bool {
    if d > indents.len() {
        return false;
    }
    let above_parent = d == 0 || indents[d - 1] < x;
    let within_sibling = d == indents.len() || x <= indents[d];
    above_parent && within_sibling
}

fn canonical_indent(d: usize, indents: &[usize]) -> usize {
    if d < indents.len() {
        indents[d]
    } else if let Some(&last) = indents.last() {
        last + 2
    } else {
        0
    }
}
