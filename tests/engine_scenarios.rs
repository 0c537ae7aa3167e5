//! End-to-end scenarios: a `Session` over a real file in a temp directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::NaiveDate;
use marklist::io::store::FileStore;
use marklist::model::config::{Overrides, UserConfig};
use marklist::session::app::{Session, SessionError};
use marklist::view::{Direction, ViewContext, VisibleNode};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
}

fn write_todo(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("todo.md");
    fs::write(&path, content).unwrap();
    path
}

fn open(path: &Path) -> Session {
    open_with(path, &Overrides::default())
}

fn open_with(path: &Path, overrides: &Overrides) -> Session {
    Session::open(
        Box::new(FileStore::new(path)),
        &UserConfig::default(),
        overrides,
        ViewContext::new(today()),
    )
    .unwrap()
}

/// Simulate another program editing the file: new content and a clearly
/// later modification time
fn external_edit(path: &Path, content: &str) {
    fs::write(path, content).unwrap();
    let later = SystemTime::now() + Duration::from_secs(30);
    fs::File::options().write(true).open(path).unwrap().set_modified(later).unwrap();
}

fn select(session: &mut Session, text: &str) {
    let index = session.document().tasks().position(|t| t.text == text).unwrap();
    session.select_index(index);
    assert_eq!(session.selected_index(), Some(index), "{text} should be selectable");
}

fn visible_texts(session: &mut Session) -> Vec<String> {
    let indices = session.tree().visible_tasks();
    indices
        .into_iter()
        .map(|i| session.document().task(i).unwrap().text.clone())
        .collect()
}

#[test]
fn move_across_hidden_task_inserts_after_next_visible() {
    let dir = TempDir::new().unwrap();
    let path = write_todo(&dir, "- [ ] A\n- [x] B\n- [ ] C\n");
    let mut s = open(&path);
    s.toggle_filter_done();
    select(&mut s, "A");

    assert!(s.move_selected(Direction::Down).unwrap());
    assert_eq!(fs::read_to_string(&path).unwrap(), "- [x] B\n- [ ] C\n- [ ] A\n");
    assert_eq!(s.selected_index(), Some(2));

    // Hidden B was crossed, so moving back up does not restore the order
    assert!(s.move_selected(Direction::Up).unwrap());
    assert_eq!(fs::read_to_string(&path).unwrap(), "- [x] B\n- [ ] A\n- [ ] C\n");
}

#[test]
fn move_without_hidden_tasks_round_trips() {
    let dir = TempDir::new().unwrap();
    let source = "- [ ] A\n- [ ] B\n- [ ] C\n";
    let path = write_todo(&dir, source);
    let mut s = open(&path);
    select(&mut s, "B");
    s.move_selected(Direction::Down).unwrap();
    s.move_selected(Direction::Up).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), source);
    select(&mut s, "A");
    assert!(!s.move_selected(Direction::Up).unwrap());
}

#[test]
fn filter_toggle_restores_visible_set() {
    let dir = TempDir::new().unwrap();
    let path = write_todo(&dir, "- [ ] a #x\n- [x] b #y\n- [ ] c #x !p1\n");
    let mut s = open(&path);
    let before = visible_texts(&mut s);
    s.toggle_tag_filter("x");
    assert_eq!(visible_texts(&mut s), vec!["a #x", "c #x !p1"]);
    s.toggle_priority_filter(1);
    assert_eq!(visible_texts(&mut s), vec!["c #x !p1"]);
    s.toggle_priority_filter(1);
    s.toggle_tag_filter("x");
    assert_eq!(visible_texts(&mut s), before);
}

#[test]
fn fully_checked_section_keeps_filtered_heading() {
    let dir = TempDir::new().unwrap();
    let path = write_todo(&dir, "# Done stuff\n- [x] a\n- [x] b\n- [x] c\n# Open\n- [ ] d\n");
    let mut s = open(&path);
    s.toggle_filter_done();
    let tree = s.tree().clone();
    assert_eq!(
        tree.nodes[0].node,
        VisibleNode::Heading {
            level: 1,
            text: "Done stuff".to_string(),
            has_visible_descendant: false,
        }
    );
    assert_eq!(tree.visible_tasks(), vec![3]);
}

#[test]
fn deleting_sole_visible_task_leaves_valid_selection() {
    let dir = TempDir::new().unwrap();
    let path = write_todo(&dir, "- [x] a\n- [ ] b\n- [x] c\n");
    let mut s = open(&path);
    s.toggle_filter_done();
    select(&mut s, "b");
    s.delete_selected().unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "- [x] a\n- [x] c\n");
    assert!(s.selected_index().is_none_or(|i| i < s.document().task_count()));
}

#[test]
fn toggle_merges_with_external_edit() {
    let dir = TempDir::new().unwrap();
    let path = write_todo(&dir, "- [ ] Buy milk\n- [ ] Wash car\n");
    let mut s = open(&path);
    external_edit(&path, "- [ ] Buy milk\n- [ ] Call bank\n");

    select(&mut s, "Buy milk");
    s.toggle_selected().unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "- [x] Buy milk\n- [ ] Call bank\n");
    assert!(s.locally_modified().is_empty());
    assert!(!s.has_conflict());
    let texts: Vec<&str> = s.document().tasks().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, vec!["Buy milk", "Call bank"]);
}

#[test]
fn periodic_check_adopts_external_changes() {
    let dir = TempDir::new().unwrap();
    let path = write_todo(&dir, "- [ ] a\n");
    let mut s = open(&path);
    assert!(s.check_external().unwrap().is_none());

    external_edit(&path, "- [x] a\n- [ ] b #new\n");
    let report = s.check_external().unwrap().unwrap();
    assert_eq!(report.added, vec!["b #new".to_string()]);
    assert!(s.document().task(0).unwrap().checked);
    assert_eq!(s.universe().tags, vec!["new".to_string()]);
    // Nothing local to apply, so the file is left as the other program wrote it
    assert_eq!(fs::read_to_string(&path).unwrap(), "- [x] a\n- [ ] b #new\n");
}

#[test]
fn undo_writes_previous_state_back() {
    let dir = TempDir::new().unwrap();
    let path = write_todo(&dir, "# Todos\n\n- [ ] a\n");
    let mut s = open(&path);
    s.append("b").unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "# Todos\n\n- [ ] a\n- [ ] b\n");
    assert!(s.undo().unwrap());
    assert_eq!(fs::read_to_string(&path).unwrap(), "# Todos\n\n- [ ] a\n");
    assert!(!s.undo().unwrap());
}

#[test]
fn read_only_never_touches_the_file() {
    let dir = TempDir::new().unwrap();
    let path = write_todo(&dir, "- [ ] a\n");
    let overrides = Overrides {
        read_only: true,
        ..Default::default()
    };
    let mut s = open_with(&path, &overrides);
    assert!(matches!(s.toggle_selected(), Err(SessionError::ReadOnly)));
    assert!(matches!(s.append("b"), Err(SessionError::ReadOnly)));
    assert_eq!(fs::read_to_string(&path).unwrap(), "- [ ] a\n");
}

#[test]
fn front_matter_read_only_applies() {
    let dir = TempDir::new().unwrap();
    let path = write_todo(&dir, "---\nread-only: true\n---\n- [ ] a\n");
    let mut s = open(&path);
    assert!(s.settings().read_only);
    assert!(s.toggle_selected().is_err());
}

#[test]
fn missing_file_is_created_on_first_write() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("new.md");
    let mut s = open(&path);
    assert_eq!(s.document().task_count(), 0);
    assert!(!path.exists());
    s.append("first").unwrap();
    let content = fs::read_to_string(&path).unwrap();
    assert!(content.starts_with("# Todos\n"));
    assert!(content.contains("- [ ] first"));
}

#[test]
fn bulk_commands_and_sort_persist() {
    let dir = TempDir::new().unwrap();
    let path = write_todo(
        &dir,
        "- [ ] late @due(2025-04-01)\n- [x] done\n- [ ] soon @due(2025-03-11)\n- [ ] undated\n",
    );
    let mut s = open(&path);
    assert!(s.sort(marklist::ops::sort::SortKey::Due).unwrap());
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "- [ ] soon @due(2025-03-11)\n- [ ] late @due(2025-04-01)\n- [x] done\n- [ ] undated\n"
    );
    assert_eq!(s.clear_done().unwrap(), 1);
    assert_eq!(s.set_all_checked(true).unwrap(), 3);
    assert!(s.document().tasks().all(|t| t.checked));
}

#[test]
fn structural_edit_survives_external_change() {
    let dir = TempDir::new().unwrap();
    let path = write_todo(&dir, "- [ ] a\n");
    let mut s = open(&path);
    external_edit(&path, "- [ ] a\n- [ ] z\n");

    s.append("new task").unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "- [ ] a\n- [ ] z\n- [ ] new task\n");
    assert!(!s.has_conflict());
}

#[test]
fn selection_survives_periodic_merge() {
    let dir = TempDir::new().unwrap();
    let path = write_todo(&dir, "- [ ] a\n- [ ] b\n- [ ] c\n");
    let mut s = open(&path);
    select(&mut s, "c");
    external_edit(&path, "- [x] a\n- [ ] b\n- [ ] c\n");

    assert!(s.check_external().unwrap().is_some());
    assert_eq!(s.selected_index(), Some(2));
}
