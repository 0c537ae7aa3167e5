use crate::model::filter::{DueBucket, FilterState};
use crate::session::app::Session;
use crate::session::commands::ScoredCommand;
use crate::session::input::{InputState, Mode, picker_entries};
use crate::util::text::{display_width, truncate_to_width, wrap_to_width};
use crate::view::VisibleNode;

/// One logical row of the view before wrapping
#[derive(Debug, Clone, PartialEq, Eq)]
struct Row {
    /// Marker, line number and indentation
    prefix: String,
    body: String,
    selected: bool,
}

/// Render the filtered tree as plain text lines. `width` limits each line
/// (wrapping or truncating per the session settings); `None` leaves lines
/// unbounded. `height` caps the rows shown on top of the max-visible
/// setting.
pub fn render_view(session: &mut Session, width: Option<usize>, height: Option<usize>) -> Vec<String> {
    let settings = session.settings().clone();
    let rows = match build_rows(session, true) {
        Ok(rows) => rows,
        Err(message) => return vec![message.to_string()],
    };
    let max = match (settings.max_visible, height) {
        (0, h) => h.unwrap_or(0),
        (m, Some(h)) => m.min(h),
        (m, None) => m,
    };
    let window = window(&rows, max);
    let mut lines = Vec::new();
    for row in &rows[window] {
        lines.extend(layout_row(row, width, settings.word_wrap));
    }
    lines
}

/// Every row of the filtered view, unwindowed and without the selection
/// marker, for non-interactive listing
pub fn render_list(session: &mut Session) -> Vec<String> {
    match build_rows(session, false) {
        Ok(rows) => rows.iter().map(|r| format!("{}{}", r.prefix, r.body)).collect(),
        Err(message) => vec![message.to_string()],
    }
}

fn build_rows(session: &mut Session, mark_selection: bool) -> Result<Vec<Row>, &'static str> {
    let tree = session.tree().clone();
    let settings = session.settings();
    let doc = session.document();
    let marker_width = if mark_selection { display_width(&settings.select_marker) + 1 } else { 0 };

    let mut rows: Vec<Row> = Vec::new();
    for (pos, node) in tree.nodes.iter().enumerate() {
        match &node.node {
            VisibleNode::Heading {
                level,
                text,
                has_visible_descendant,
            } => {
                if !settings.show_headings {
                    continue;
                }
                let mut body = format!("{} {}", "#".repeat(usize::from(*level)), text);
                if !has_visible_descendant {
                    body.push_str(" (filtered)");
                }
                rows.push(Row {
                    prefix: " ".repeat(marker_width + number_width(settings.line_numbers)),
                    body,
                    selected: false,
                });
            }
            VisibleNode::Task { index } => {
                let Some(task) = doc.task(*index) else {
                    continue;
                };
                let selected = tree.selected == Some(pos);
                let mut prefix = if selected && mark_selection {
                    format!("{} ", settings.select_marker)
                } else {
                    " ".repeat(marker_width)
                };
                if settings.line_numbers {
                    prefix.push_str(&format!("{:>3} ", index + 1));
                }
                prefix.push_str(&"  ".repeat(task.depth));
                let check = if task.checked { settings.check_symbol.as_str() } else { " " };
                rows.push(Row {
                    prefix,
                    body: format!("[{check}] {}", task.text),
                    selected,
                });
            }
        }
    }

    if rows.is_empty() {
        return Err(if doc.task_count() == 0 {
            "(no tasks)"
        } else {
            "(all tasks hidden by filters)"
        });
    }
    Ok(rows)
}

fn number_width(line_numbers: bool) -> usize {
    if line_numbers { 4 } else { 0 }
}

/// Rows kept when at most `max` may show, centred on the selection
fn window(rows: &[Row], max: usize) -> std::ops::Range<usize> {
    if max == 0 || rows.len() <= max {
        return 0..rows.len();
    }
    let selected = rows.iter().position(|r| r.selected).unwrap_or(0);
    let start = selected.saturating_sub(max / 2).min(rows.len() - max);
    start..start + max
}

fn layout_row(row: &Row, width: Option<usize>, wrap: bool) -> Vec<String> {
    let Some(width) = width else {
        return vec![format!("{}{}", row.prefix, row.body)];
    };
    let prefix_width = display_width(&row.prefix);
    let room = width.saturating_sub(prefix_width).max(1);
    if !wrap {
        return vec![format!("{}{}", row.prefix, truncate_to_width(&row.body, room))];
    }
    let continuation = " ".repeat(prefix_width + 4);
    let continuation_room = width.saturating_sub(prefix_width + 4).max(1);
    let mut first = wrap_to_width(&row.body, room).into_iter();
    let head = first.next().unwrap_or_default();
    let rest: String = first.collect::<Vec<_>>().join(" ");
    let mut lines = vec![format!("{}{}", row.prefix, head)];
    if !rest.is_empty() {
        for part in wrap_to_width(&rest, continuation_room) {
            lines.push(format!("{continuation}{part}"));
        }
    }
    lines
}

/// Bottom panel: the active prompt, result lists and the status line
pub fn render_footer(session: &Session, input: &InputState, status: Option<&str>, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    match input.mode {
        Mode::Normal => {
            lines.push(status_line(session.filters(), session.settings().read_only, session.has_conflict()));
        }
        Mode::Move => lines.push("-- MOVE -- j/k move, enter confirm, esc cancel".to_string()),
        Mode::Insert => lines.push(format!("new: {}", input.buffer.as_str())),
        Mode::Edit => lines.push(format!("edit: {}", input.buffer.as_str())),
        Mode::Search => {
            lines.push(format!("/{}", input.buffer.as_str()));
            for (i, hit) in input.search_results.iter().take(8).enumerate() {
                let text = session.document().task(hit.index).map(|t| t.text.as_str()).unwrap_or("");
                lines.push(format!("{} {}", cursor_mark(i == input.cursor), text));
            }
        }
        Mode::Command => {
            lines.push(format!(":{}", input.buffer.as_str()));
            lines.extend(palette_lines(&input.palette, input.cursor));
        }
        Mode::TagFilter | Mode::PriorityFilter | Mode::DueFilter => {
            let entries = picker_entries(session, input.mode);
            if entries.is_empty() {
                lines.push("(nothing to filter on)".to_string());
            }
            for (i, entry) in entries.iter().enumerate() {
                let active = picker_active(session.filters(), input.mode, entry);
                lines.push(format!(
                    "{} [{}] {}",
                    cursor_mark(i == input.cursor),
                    if active { "x" } else { " " },
                    entry
                ));
            }
            lines.push("space toggle, enter apply, c clear, esc close".to_string());
        }
        Mode::Help => lines.extend(HELP.iter().map(|s| s.to_string())),
    }
    if let Some(status) = status {
        lines.push(status.to_string());
    }
    lines
        .into_iter()
        .map(|l| truncate_to_width(&l, width.max(1)))
        .collect()
}

fn palette_lines(palette: &[ScoredCommand], cursor: usize) -> Vec<String> {
    palette
        .iter()
        .take(8)
        .enumerate()
        .map(|(i, c)| format!("{} {:<16} {}", cursor_mark(i == cursor), c.info.id, c.info.description))
        .collect()
}

fn picker_active(filters: &FilterState, mode: Mode, entry: &str) -> bool {
    match mode {
        Mode::TagFilter => filters.tags.contains(entry.trim_start_matches('#')),
        Mode::PriorityFilter => entry
            .trim_start_matches("!p")
            .parse::<u32>()
            .is_ok_and(|p| filters.priorities.contains(&p)),
        Mode::DueFilter => filters.due.label() == entry,
        _ => false,
    }
}

fn cursor_mark(on: bool) -> &'static str {
    if on { ">" } else { " " }
}

fn status_line(filters: &FilterState, read_only: bool, conflict: bool) -> String {
    let mut parts: Vec<String> = Vec::new();
    if filters.filter_done {
        parts.push("hide done".to_string());
    }
    if !filters.tags.is_empty() {
        let tags: Vec<String> = filters.tags.iter().map(|t| format!("#{t}")).collect();
        parts.push(tags.join(" "));
    }
    if !filters.priorities.is_empty() {
        let prios: Vec<String> = filters.priorities.iter().map(|p| format!("!p{p}")).collect();
        parts.push(prios.join(" "));
    }
    if filters.due != DueBucket::None {
        parts.push(format!("due:{}", filters.due));
    }
    if read_only {
        parts.push("read-only".to_string());
    }
    if conflict {
        parts.push("CONFLICT: :reload or :force-save".to_string());
    }
    if parts.is_empty() {
        "? help".to_string()
    } else {
        parts.join(" | ")
    }
}

const HELP: &[&str] = &[
    "j/k      down/up (count prefix ok)   gg/G  first/last",
    "space    toggle                      n/N   insert after / append",
    "e        edit                        d     delete",
    "m        move mode                   u     undo",
    "tab      indent                      S-tab outdent",
    "/        search                      :     command palette",
    "f/p/D    tag/priority/due filter     h     toggle headings",
    "q        quit                        any key closes help",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::store::{BackingStore, StoreError};
    use crate::model::config::Settings;
    use crate::model::document::Document;
    use crate::parse::parse_document;
    use crate::view::ViewContext;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use std::path::{Path, PathBuf};

    struct NullStore(PathBuf);

    impl BackingStore for NullStore {
        fn read(&mut self) -> Result<Document, StoreError> {
            Ok(Document::default())
        }
        fn write(&mut self, _doc: &Document) -> Result<(), StoreError> {
            Ok(())
        }
        fn check_modified(&self) -> bool {
            false
        }
        fn path(&self) -> &Path {
            &self.0
        }
    }

    fn session_with(content: &str, settings: Settings) -> Session {
        let doc = parse_document(content).unwrap();
        let ctx = ViewContext::new(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
        Session::with_document(doc, Box::new(NullStore(PathBuf::from("t.md"))), settings, ctx)
    }

    #[test]
    fn renders_checkboxes_indent_and_selection() {
        let mut s = session_with("- [ ] a\n  - [x] b\n- [ ] c\n", Settings::default());
        assert_eq!(render_view(&mut s, None, None), vec!["> [ ] a", "    [x] b", "  [ ] c"]);
    }

    #[test]
    fn filtered_heading_is_marked() {
        let settings = Settings {
            show_headings: true,
            ..Settings::default()
        };
        let mut s = session_with("# Work\n- [x] done\n# Home\n- [ ] open\n", settings);
        s.toggle_filter_done();
        assert_eq!(
            render_view(&mut s, None, None),
            vec!["  # Work (filtered)", "  # Home", "> [ ] open"]
        );
    }

    #[test]
    fn line_numbers_use_task_numbers() {
        let settings = Settings {
            line_numbers: true,
            ..Settings::default()
        };
        let mut s = session_with("- [x] a\n- [ ] b\n", settings);
        s.toggle_filter_done();
        assert_eq!(render_view(&mut s, None, None), vec![">   2 [ ] b"]);
    }

    #[test]
    fn list_has_no_selection_marker() {
        let settings = Settings {
            line_numbers: true,
            ..Settings::default()
        };
        let mut s = session_with("- [ ] a\n  - [x] b\n", settings);
        assert_eq!(render_list(&mut s), vec!["  1 [ ] a", "  2   [x] b"]);
    }

    #[test]
    fn max_visible_windows_around_selection() {
        let settings = Settings {
            max_visible: 2,
            ..Settings::default()
        };
        let mut s = session_with("- [ ] a\n- [ ] b\n- [ ] c\n- [ ] d\n", settings);
        s.select_last();
        assert_eq!(render_view(&mut s, None, None), vec!["  [ ] c", "> [ ] d"]);
        s.select_first();
        assert_eq!(render_view(&mut s, None, Some(1)), vec!["> [ ] a"]);
    }

    #[test]
    fn wraps_long_text_under_prefix() {
        let mut s = session_with("- [ ] buy milk and eggs today\n", Settings::default());
        assert_eq!(
            render_view(&mut s, Some(16), None),
            vec!["> [ ] buy milk", "      and eggs", "      today"]
        );
    }

    #[test]
    fn truncates_without_wrap() {
        let settings = Settings {
            word_wrap: false,
            ..Settings::default()
        };
        let mut s = session_with("- [ ] buy milk and eggs\n", settings);
        assert_eq!(render_view(&mut s, Some(12), None), vec!["> [ ] buy m\u{2026}"]);
    }

    #[test]
    fn empty_views_explain_themselves() {
        let mut s = session_with("# Todos\n", Settings::default());
        assert_eq!(render_view(&mut s, None, None), vec!["(no tasks)"]);
        let mut s = session_with("- [x] a\n", Settings::default());
        s.toggle_filter_done();
        assert_eq!(render_view(&mut s, None, None), vec!["(all tasks hidden by filters)"]);
    }

    #[test]
    fn footer_shows_filters_and_status() {
        let mut s = session_with("- [ ] a #home\n", Settings::default());
        s.toggle_tag_filter("home");
        let input = InputState::new();
        assert_eq!(render_footer(&s, &input, Some("hello"), 80), vec!["#home", "hello"]);
    }
}
