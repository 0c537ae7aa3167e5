use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::debug;

use crate::model::filter::DueBucket;
use crate::ops::search::TaskMatch;
use crate::session::app::{Session, SessionError};
use crate::session::commands::{ScoredCommand, filter_commands, parse_command_line};
use crate::session::scheduler::{DEBOUNCE, EventKind, Scheduler, TimedEvent};
use crate::session::undo::Snapshot;
use crate::util::text::EditBuffer;
use crate::view::Direction;

/// Input mode of the interactive session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Normal,
    Move,
    Insert,
    Edit,
    Search,
    Command,
    TagFilter,
    PriorityFilter,
    DueFilter,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InsertTarget {
    AfterSelection,
    End,
}

/// Keyboard state layered over a [`Session`]
#[derive(Debug)]
pub struct InputState {
    pub mode: Mode,
    /// Numeric prefix typed in normal mode
    pub count: Option<usize>,
    pending_g: bool,
    pub buffer: EditBuffer,
    insert_target: InsertTarget,
    /// State to restore when move mode is cancelled, with the history
    /// length at that point
    move_origin: Option<(Snapshot, usize)>,
    pub search_results: Vec<TaskMatch>,
    pub palette: Vec<ScoredCommand>,
    /// Highlighted row in search results, the palette, or a filter picker
    pub cursor: usize,
    pub quit: bool,
}

impl Default for InputState {
    fn default() -> Self {
        InputState {
            mode: Mode::Normal,
            count: None,
            pending_g: false,
            buffer: EditBuffer::default(),
            insert_target: InsertTarget::End,
            move_origin: None,
            search_results: Vec::new(),
            palette: Vec::new(),
            cursor: 0,
            quit: false,
        }
    }
}

impl InputState {
    pub fn new() -> Self {
        InputState::default()
    }

    fn enter(&mut self, mode: Mode) {
        debug!(from = ?self.mode, to = ?mode, "mode change");
        self.mode = mode;
        self.cursor = 0;
        self.count = None;
        self.pending_g = false;
    }

    fn take_count(&mut self) -> usize {
        self.count.take().unwrap_or(1)
    }
}

/// Handle one key press in the current mode
pub fn handle_key(session: &mut Session, input: &mut InputState, scheduler: &mut Scheduler, key: KeyEvent, now: Instant) {
    let key = normalize_key(key);
    if matches!(key.code, KeyCode::Modifier(_)) {
        return;
    }
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        input.quit = true;
        return;
    }
    let result = match input.mode {
        Mode::Normal => handle_normal(session, input, key),
        Mode::Move => handle_move(session, input, key),
        Mode::Insert | Mode::Edit => handle_text_entry(session, input, key),
        Mode::Search => handle_search(session, input, scheduler, key, now),
        Mode::Command => handle_command(session, input, scheduler, key, now),
        Mode::TagFilter | Mode::PriorityFilter | Mode::DueFilter => handle_picker(session, input, key),
        Mode::Help => {
            input.enter(Mode::Normal);
            Ok(())
        }
    };
    if let Err(e) = result {
        session.set_status(format!("error: {e}"));
    }
}

/// Some terminals report Shift+letter as the lowercase char with SHIFT set,
/// and Shift+symbol as the unshifted symbol
fn normalize_key(mut key: KeyEvent) -> KeyEvent {
    if let KeyCode::Char(c) = key.code
        && key.modifiers.contains(KeyModifiers::SHIFT)
    {
        if c.is_ascii_lowercase() {
            key.code = KeyCode::Char(c.to_ascii_uppercase());
        } else if let Some(shifted) = shift_symbol(c) {
            key.code = KeyCode::Char(shifted);
            key.modifiers.remove(KeyModifiers::SHIFT);
        }
    }
    key
}

fn shift_symbol(c: char) -> Option<char> {
    let shifted = match c {
        ';' => ':',
        '/' => '?',
        ',' => '<',
        '.' => '>',
        '\'' => '"',
        '1' => '!',
        '3' => '#',
        '2' => '@',
        _ => return None,
    };
    Some(shifted)
}

/// Run a scheduled event. Debounce events scheduled in another mode are
/// dropped.
pub fn handle_timed(session: &mut Session, input: &mut InputState, event: TimedEvent) {
    if event.is_stale(input.mode) {
        debug!(kind = ?event.kind, mode = ?input.mode, "dropping stale event");
        return;
    }
    match event.kind {
        EventKind::SearchDebounce => {
            input.search_results = session.search(input.buffer.as_str());
            input.cursor = 0;
        }
        EventKind::PaletteDebounce => {
            input.palette = filter_commands(command_name(input.buffer.as_str()));
            input.cursor = 0;
        }
        EventKind::FileCheck => match session.check_external() {
            Ok(Some(report)) => session.set_status(format!(
                "reloaded external changes ({} added, {} removed)",
                report.added.len(),
                report.dropped.len()
            )),
            Ok(None) => {}
            Err(e) => session.set_status(format!("error: {e}")),
        },
    }
}

fn handle_normal(session: &mut Session, input: &mut InputState, key: KeyEvent) -> Result<(), SessionError> {
    let pending_g = std::mem::take(&mut input.pending_g);
    match key.code {
        KeyCode::Char(c @ '0'..='9') if c != '0' || input.count.is_some() => {
            let digit = c as usize - '0' as usize;
            input.count = Some(input.count.unwrap_or(0).saturating_mul(10).saturating_add(digit));
            return Ok(());
        }
        KeyCode::Char('g') if pending_g => session.select_first(),
        KeyCode::Char('g') => {
            input.pending_g = true;
            return Ok(());
        }
        KeyCode::Char('G') => session.select_last(),
        KeyCode::Char('j') | KeyCode::Down => {
            let n = input.take_count();
            session.navigate(Direction::Down, n);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            let n = input.take_count();
            session.navigate(Direction::Up, n);
        }
        KeyCode::Char(' ') | KeyCode::Enter => session.toggle_selected()?,
        KeyCode::Char('n') => start_insert(input, InsertTarget::AfterSelection),
        KeyCode::Char('N') => start_insert(input, InsertTarget::End),
        KeyCode::Char('e') => {
            let index = session.selected_index().ok_or(SessionError::NoSelection)?;
            let text = session
                .document()
                .task(index)
                .map(|t| t.text.clone())
                .unwrap_or_default();
            input.enter(Mode::Edit);
            input.buffer = EditBuffer::new(&text);
        }
        KeyCode::Char('d') => {
            session.delete_selected()?;
        }
        KeyCode::Char('m') => {
            if session.settings().read_only {
                return Err(SessionError::ReadOnly);
            }
            if session.selected_index().is_none() {
                return Err(SessionError::NoSelection);
            }
            input.move_origin = Some((session.snapshot(), session.history_len()));
            input.enter(Mode::Move);
        }
        KeyCode::Char('u') => {
            if !session.undo()? {
                session.set_status("nothing to undo");
            }
        }
        KeyCode::Char('/') => {
            input.enter(Mode::Search);
            input.buffer.clear();
            input.search_results.clear();
        }
        KeyCode::Char(':') => {
            input.enter(Mode::Command);
            input.buffer.clear();
            input.palette = filter_commands("");
        }
        KeyCode::Char('f') => input.enter(Mode::TagFilter),
        KeyCode::Char('p') => input.enter(Mode::PriorityFilter),
        KeyCode::Char('D') => input.enter(Mode::DueFilter),
        KeyCode::Char('h') => {
            let settings = session.settings_mut();
            settings.show_headings = !settings.show_headings;
        }
        KeyCode::Tab => session.indent_selected()?,
        KeyCode::BackTab => session.outdent_selected()?,
        KeyCode::Char('?') => input.enter(Mode::Help),
        KeyCode::Char('q') => input.quit = true,
        KeyCode::Esc => {}
        _ => {}
    }
    input.count = None;
    Ok(())
}

fn start_insert(input: &mut InputState, target: InsertTarget) {
    input.enter(Mode::Insert);
    input.insert_target = target;
    input.buffer.clear();
}

fn handle_move(session: &mut Session, input: &mut InputState, key: KeyEvent) -> Result<(), SessionError> {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            session.move_selected(Direction::Down)?;
        }
        KeyCode::Char('k') | KeyCode::Up => {
            session.move_selected(Direction::Up)?;
        }
        KeyCode::Enter | KeyCode::Char('m') => {
            input.move_origin = None;
            input.enter(Mode::Normal);
        }
        KeyCode::Esc => {
            input.enter(Mode::Normal);
            if let Some((snapshot, history)) = input.move_origin.take() {
                session.restore(snapshot, history)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Shared line-editing keys. Returns true if the key changed the text.
fn edit_buffer_key(buffer: &mut EditBuffer, key: KeyEvent) -> bool {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('w') if ctrl => {
            buffer.delete_word();
            true
        }
        KeyCode::Char('u') if ctrl => {
            buffer.clear();
            true
        }
        KeyCode::Char('a') if ctrl => {
            buffer.home();
            false
        }
        KeyCode::Char('e') if ctrl => {
            buffer.end();
            false
        }
        KeyCode::Char(c) if !ctrl => {
            buffer.insert(c);
            true
        }
        KeyCode::Backspace => buffer.backspace(),
        KeyCode::Delete => buffer.delete(),
        KeyCode::Left => {
            buffer.left();
            false
        }
        KeyCode::Right => {
            buffer.right();
            false
        }
        KeyCode::Home => {
            buffer.home();
            false
        }
        KeyCode::End => {
            buffer.end();
            false
        }
        _ => false,
    }
}

fn handle_text_entry(session: &mut Session, input: &mut InputState, key: KeyEvent) -> Result<(), SessionError> {
    match key.code {
        KeyCode::Esc => {
            input.buffer.clear();
            input.enter(Mode::Normal);
        }
        KeyCode::Enter => {
            let text = input.buffer.take();
            let mode = input.mode;
            input.enter(Mode::Normal);
            match (mode, input.insert_target) {
                (Mode::Edit, _) => session.edit_selected(&text)?,
                (_, InsertTarget::AfterSelection) => session.insert_after_selected(&text)?,
                (_, InsertTarget::End) => session.append(&text)?,
            }
        }
        _ => {
            edit_buffer_key(&mut input.buffer, key);
        }
    }
    Ok(())
}

fn handle_search(
    session: &mut Session,
    input: &mut InputState,
    scheduler: &mut Scheduler,
    key: KeyEvent,
    now: Instant,
) -> Result<(), SessionError> {
    match key.code {
        KeyCode::Esc => {
            scheduler.cancel(EventKind::SearchDebounce);
            input.search_results.clear();
            input.enter(Mode::Normal);
        }
        KeyCode::Enter => {
            // Typing may still be pending; rank against the final query
            if scheduler.is_pending(EventKind::SearchDebounce) {
                scheduler.cancel(EventKind::SearchDebounce);
                input.search_results = session.search(input.buffer.as_str());
                input.cursor = 0;
            }
            if let Some(hit) = input.search_results.get(input.cursor) {
                session.select_index(hit.index);
            }
            input.search_results.clear();
            input.enter(Mode::Normal);
        }
        KeyCode::Down => {
            if input.cursor + 1 < input.search_results.len() {
                input.cursor += 1;
            }
        }
        KeyCode::Up => input.cursor = input.cursor.saturating_sub(1),
        _ => {
            if edit_buffer_key(&mut input.buffer, key) {
                scheduler.schedule(EventKind::SearchDebounce, DEBOUNCE, now, Some(Mode::Search));
            }
        }
    }
    Ok(())
}

fn handle_command(
    session: &mut Session,
    input: &mut InputState,
    scheduler: &mut Scheduler,
    key: KeyEvent,
    now: Instant,
) -> Result<(), SessionError> {
    match key.code {
        KeyCode::Esc => {
            scheduler.cancel(EventKind::PaletteDebounce);
            input.enter(Mode::Normal);
        }
        KeyCode::Enter => {
            scheduler.cancel(EventKind::PaletteDebounce);
            let line = input.buffer.take();
            let highlighted = if line.trim().is_empty() {
                input.palette.get(input.cursor).map(|c| c.info.command)
            } else {
                filter_commands(command_name(&line))
                    .get(input.cursor)
                    .map(|c| c.info.command)
            };
            input.enter(Mode::Normal);
            let (command, arg) = match parse_command_line(&line) {
                Ok(parsed) => parsed,
                Err(e) => {
                    let command = highlighted.ok_or(e)?;
                    let arg = line.trim().split_once(char::is_whitespace).map(|(_, a)| a.trim());
                    (command, arg)
                }
            };
            let message = session.execute(command, arg)?;
            session.set_status(message);
        }
        KeyCode::Down => {
            if input.cursor + 1 < input.palette.len() {
                input.cursor += 1;
            }
        }
        KeyCode::Up => input.cursor = input.cursor.saturating_sub(1),
        KeyCode::Tab => {
            if let Some(hit) = input.palette.get(input.cursor) {
                input.buffer = EditBuffer::new(hit.info.id);
            }
        }
        _ => {
            if edit_buffer_key(&mut input.buffer, key) {
                scheduler.schedule(EventKind::PaletteDebounce, DEBOUNCE, now, Some(Mode::Command));
            }
        }
    }
    Ok(())
}

fn command_name(line: &str) -> &str {
    line.split_whitespace().next().unwrap_or("")
}

/// Entries offered by the current filter picker
pub fn picker_entries(session: &Session, mode: Mode) -> Vec<String> {
    let universe = session.universe();
    match mode {
        Mode::TagFilter => universe.tags.iter().map(|t| format!("#{t}")).collect(),
        Mode::PriorityFilter => universe.priorities.iter().map(|p| format!("!p{p}")).collect(),
        Mode::DueFilter => universe.due_buckets.iter().map(|b| b.label().to_string()).collect(),
        _ => Vec::new(),
    }
}

fn handle_picker(session: &mut Session, input: &mut InputState, key: KeyEvent) -> Result<(), SessionError> {
    let len = picker_entries(session, input.mode).len();
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => input.enter(Mode::Normal),
        KeyCode::Char('j') | KeyCode::Down => {
            if input.cursor + 1 < len {
                input.cursor += 1;
            }
        }
        KeyCode::Char('k') | KeyCode::Up => input.cursor = input.cursor.saturating_sub(1),
        KeyCode::Char('c') => session.clear_filters(),
        KeyCode::Char(' ') | KeyCode::Enter => {
            toggle_picked(session, input.mode, input.cursor);
            if key.code == KeyCode::Enter {
                input.enter(Mode::Normal);
            }
        }
        _ => {}
    }
    Ok(())
}

fn toggle_picked(session: &mut Session, mode: Mode, cursor: usize) {
    let universe = session.universe().clone();
    match mode {
        Mode::TagFilter => {
            if let Some(tag) = universe.tags.get(cursor) {
                session.toggle_tag_filter(tag);
            }
        }
        Mode::PriorityFilter => {
            if let Some(&p) = universe.priorities.get(cursor) {
                session.toggle_priority_filter(p);
            }
        }
        Mode::DueFilter => {
            let bucket = universe.due_buckets.get(cursor).copied().unwrap_or(DueBucket::None);
            if bucket != DueBucket::None {
                session.toggle_due_filter(bucket);
            }
        }
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// Piped keys
// ---------------------------------------------------------------------------

/// Decode a key script. Plain characters map to themselves; control bytes
/// map to their keys (`\r`/`\n` enter, `\x1b` escape, `\t` tab, `\x7f`
/// backspace, `\x01`..`\x1a` ctrl+letter). Named keys may be written as
/// `<esc>`, `<enter>`, `<tab>`, `<s-tab>`, `<up>`, `<down>`, `<left>`,
/// `<right>`, `<bs>`, `<space>`, `<lt>` or `<c-x>`.
pub fn keys_from_script(script: &str) -> Vec<KeyEvent> {
    let mut keys = Vec::new();
    let mut rest = script;
    while let Some(c) = rest.chars().next() {
        if c == '<'
            && let Some(end) = rest.find('>')
            && let Some(key) = named_key(&rest[1..end])
        {
            keys.push(key);
            rest = &rest[end + 1..];
            continue;
        }
        keys.push(key_for_char(c));
        rest = &rest[c.len_utf8()..];
    }
    keys
}

fn named_key(name: &str) -> Option<KeyEvent> {
    let plain = |code| KeyEvent::new(code, KeyModifiers::NONE);
    let key = match name.to_ascii_lowercase().as_str() {
        "esc" => plain(KeyCode::Esc),
        "enter" | "cr" => plain(KeyCode::Enter),
        "tab" => plain(KeyCode::Tab),
        "s-tab" => KeyEvent::new(KeyCode::BackTab, KeyModifiers::SHIFT),
        "up" => plain(KeyCode::Up),
        "down" => plain(KeyCode::Down),
        "left" => plain(KeyCode::Left),
        "right" => plain(KeyCode::Right),
        "bs" => plain(KeyCode::Backspace),
        "del" => plain(KeyCode::Delete),
        "space" => plain(KeyCode::Char(' ')),
        "lt" => plain(KeyCode::Char('<')),
        other => {
            let letter = other.strip_prefix("c-")?;
            let mut chars = letter.chars();
            let c = chars.next().filter(|c| c.is_ascii_alphabetic())?;
            if chars.next().is_some() {
                return None;
            }
            KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
        }
    };
    Some(key)
}

fn key_for_char(c: char) -> KeyEvent {
    match c {
        '\r' | '\n' => KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE),
        '\x1b' => KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE),
        '\t' => KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE),
        '\x7f' | '\x08' => KeyEvent::new(KeyCode::Backspace, KeyModifiers::NONE),
        '\x01'..='\x1a' => {
            let letter = (b'a' + (c as u8 - 1)) as char;
            KeyEvent::new(KeyCode::Char(letter), KeyModifiers::CONTROL)
        }
        c if c.is_ascii_uppercase() => KeyEvent::new(KeyCode::Char(c), KeyModifiers::SHIFT),
        c => KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE),
    }
}

/// Feed a whole key script through the handlers with debounces flushed
/// after every key, as if the user paused between presses
pub fn run_script(session: &mut Session, input: &mut InputState, script: &str) {
    let mut scheduler = Scheduler::new();
    for key in keys_from_script(script) {
        if input.quit {
            break;
        }
        handle_key(session, input, &mut scheduler, key, Instant::now());
        for event in scheduler.flush_debounces() {
            handle_timed(session, input, event);
        }
    }
}
