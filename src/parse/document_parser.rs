use crate::model::document::{Block, Document, FrontMatter, next_task_id};
use crate::model::metadata::Metadata;
use crate::model::task::{ListMarker, TaskEntry};

/// Error parsing a document
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("invalid front matter: {0}")]
    FrontMatter(#[from] serde_yaml::Error),
}

/// Parse markdown into a document. Every line lands in exactly one block,
/// so serializing an unmodified document reproduces the input byte-for-byte.
pub fn parse_document(content: &str) -> Result<Document, ParseError> {
    let lines: Vec<&str> = content.split('\n').collect();
    let (front_matter, body_start) = parse_front_matter(&lines)?;

    let mut blocks = Vec::with_capacity(lines.len() - body_start);
    let mut fence: Option<&str> = None;
    // Indent columns of the enclosing task items
    let mut indent_stack: Vec<usize> = Vec::new();

    for &line in &lines[body_start..] {
        let trimmed = line.trim_start();

        if let Some(open) = fence {
            if trimmed.starts_with(open) {
                fence = None;
            }
            blocks.push(Block::Line(line.to_string()));
            continue;
        }
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            fence = Some(&trimmed[..3]);
            indent_stack.clear();
            blocks.push(Block::Line(line.to_string()));
            continue;
        }

        if let Some((level, text)) = parse_heading_line(line) {
            indent_stack.clear();
            blocks.push(Block::Heading {
                level,
                text,
                source: line.to_string(),
            });
            continue;
        }

        if let Some(parsed) = parse_task_line(line) {
            while indent_stack.last().is_some_and(|&top| parsed.indent <= top) {
                indent_stack.pop();
            }
            let depth = indent_stack.len();
            indent_stack.push(parsed.indent);

            let mut task = TaskEntry::new(next_task_id(), &parsed.text, parsed.checked, depth);
            task.marker = parsed.marker;
            task.source_line = Some(line.to_string());
            task.dirty = false;
            blocks.push(Block::Task(task));
            continue;
        }

        // Unindented prose ends the current list
        if !line.trim().is_empty() && count_indent(line) == 0 {
            indent_stack.clear();
        }
        blocks.push(Block::Line(line.to_string()));
    }

    Ok(Document {
        front_matter,
        blocks,
    })
}

/// Returns the front matter (if the document opens with a closed `---`
/// block) and the index of the first body line.
fn parse_front_matter(lines: &[&str]) -> Result<(Option<FrontMatter>, usize), ParseError> {
    if lines.first().map(|l| l.trim_end()) != Some("---") {
        return Ok((None, 0));
    }
    let Some(close) = lines
        .iter()
        .skip(1)
        .position(|l| l.trim_end() == "---")
        .map(|p| p + 1)
    else {
        return Ok((None, 0));
    };

    let yaml = lines[1..close].join("\n");
    let metadata = if yaml.trim().is_empty() {
        Metadata::default()
    } else {
        serde_yaml::from_str::<Metadata>(&yaml)?
    };
    let fm = FrontMatter {
        lines: lines[..=close].iter().map(|l| l.to_string()).collect(),
        metadata,
    };
    Ok((Some(fm), close + 1))
}

/// Parse an ATX heading (`#` to `######`, up to three spaces of indent)
pub fn parse_heading_line(line: &str) -> Option<(u8, String)> {
    let line = line.trim_end_matches('\r');
    if count_indent(line) > 3 {
        return None;
    }
    let trimmed = line.trim_start();
    let hashes = trimmed.chars().take_while(|&c| c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = &trimmed[hashes..];
    if !rest.is_empty() && !rest.starts_with([' ', '\t']) {
        return None;
    }
    // Optional closing sequence: `## Title ##`
    let mut text = rest.trim();
    let stripped = text.trim_end_matches('#');
    if stripped.is_empty() || stripped.ends_with([' ', '\t']) {
        text = stripped.trim_end();
    }
    Some((hashes as u8, text.to_string()))
}

pub(crate) struct TaskLine {
    pub indent: usize,
    pub marker: ListMarker,
    pub checked: bool,
    pub text: String,
}

/// Parse a checkbox list item: `- [ ] text`, `* [x] text`, `+ [X] text`
pub(crate) fn parse_task_line(line: &str) -> Option<TaskLine> {
    let line = line.trim_end_matches('\r');
    let indent = count_indent(line);
    let trimmed = line.trim_start();
    let mut chars = trimmed.chars();

    let marker = ListMarker::from_char(chars.next()?)?;
    let rest = chars.as_str();
    let rest = rest.strip_prefix(' ')?.trim_start_matches(' ');
    let rest = rest.strip_prefix('[')?;
    let mut chars = rest.chars();
    let checked = match chars.next()? {
        ' ' => false,
        'x' | 'X' => true,
        _ => return None,
    };
    let rest = chars.as_str().strip_prefix(']')?;
    if !rest.is_empty() && !rest.starts_with(' ') {
        return None;
    }

    Some(TaskLine {
        indent,
        marker,
        checked,
        text: rest.trim().to_string(),
    })
}

/// Leading whitespace width; a tab advances to the next multiple of 4
pub fn count_indent(line: &str) -> usize {
    let mut width = 0;
    for c in line.chars() {
        match c {
            ' ' => width += 1,
            '\t' => width += 4 - width % 4,
            _ => break,
        }
    }
    width
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task_texts(doc: &Document) -> Vec<(String, bool, usize)> {
        doc.tasks()
            .map(|t| (t.text.clone(), t.checked, t.depth))
            .collect()
    }

    #[test]
    fn parses_tasks_headings_and_prose() {
        let doc = parse_document(
            "# Todos\n\nSome notes.\n\n- [ ] Write report #work\n- [x] Buy milk\n* [X] Star marker\n",
        )
        .unwrap();
        assert_eq!(
            task_texts(&doc),
            vec![
                ("Write report #work".to_string(), false, 0),
                ("Buy milk".to_string(), true, 0),
                ("Star marker".to_string(), true, 0),
            ]
        );
        assert_eq!(doc.headings().len(), 1);
        assert_eq!(doc.headings()[0].text, "Todos");
    }

    #[test]
    fn nesting_depth_follows_indentation() {
        let doc = parse_document(
            "- [ ] parent\n  - [ ] child\n    - [ ] grandchild\n  - [ ] child two\n- [ ] sibling\n",
        )
        .unwrap();
        let depths: Vec<usize> = doc.tasks().map(|t| t.depth).collect();
        assert_eq!(depths, vec![0, 1, 2, 1, 0]);
    }

    #[test]
    fn over_indented_first_item_is_top_level() {
        let doc = parse_document("    - [ ] deep start\n    - [ ] same\n").unwrap();
        let depths: Vec<usize> = doc.tasks().map(|t| t.depth).collect();
        assert_eq!(depths, vec![0, 0]);
    }

    #[test]
    fn plain_list_items_are_not_tasks() {
        let doc = parse_document("- plain item\n- [ ] real\n- [-] odd\n-[ ] tight\n").unwrap();
        assert_eq!(doc.task_count(), 1);
    }

    #[test]
    fn fenced_code_is_opaque() {
        let doc =
            parse_document("```\n# not a heading\n- [ ] not a task\n```\n- [ ] task\n").unwrap();
        assert_eq!(doc.task_count(), 1);
        assert!(doc.headings().is_empty());
    }

    #[test]
    fn heading_requires_space_and_strips_closing_hashes() {
        assert_eq!(parse_heading_line("## Work ##"), Some((2, "Work".to_string())));
        assert_eq!(parse_heading_line("#hashtag"), None);
        assert_eq!(parse_heading_line("####### seven"), None);
        assert_eq!(parse_heading_line("#"), Some((1, String::new())));
    }

    #[test]
    fn front_matter_is_parsed() {
        let doc =
            parse_document("---\nfilter-done: true\nmax-visible: 5\n---\n# Todos\n- [ ] a\n")
                .unwrap();
        let meta = doc.metadata();
        assert_eq!(meta.filter_done, Some(true));
        assert_eq!(meta.max_visible, Some(5));
        assert_eq!(meta.read_only, None);
        assert_eq!(doc.task_count(), 1);
    }

    #[test]
    fn unknown_front_matter_key_is_rejected() {
        let err = parse_document("---\nfilter-dne: true\n---\n- [ ] a\n").unwrap_err();
        assert!(err.to_string().contains("front matter"));
    }

    #[test]
    fn unclosed_front_matter_is_body_text() {
        let doc = parse_document("---\n- [ ] a\n").unwrap();
        assert!(doc.front_matter.is_none());
        assert_eq!(doc.task_count(), 1);
    }

    #[test]
    fn heading_resets_nesting() {
        let doc = parse_document("- [ ] a\n## H\n  - [ ] b\n").unwrap();
        let depths: Vec<usize> = doc.tasks().map(|t| t.depth).collect();
        assert_eq!(depths, vec![0, 0]);
    }
}
