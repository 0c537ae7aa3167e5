use crate::model::filter::DueBucket;
use crate::ops::search::fuzzy_score;
use crate::ops::sort::SortKey;
use crate::session::app::{Session, SessionError};

/// Every command reachable from the `:` palette
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    CheckAll,
    UncheckAll,
    SortDone,
    SortDue,
    SortPriority,
    FilterDone,
    FilterDue,
    FilterOverdue,
    FilterToday,
    FilterWeek,
    ClearFilters,
    ClearDone,
    ReadOnly,
    Save,
    ForceSave,
    Reload,
    Wrap,
    LineNumbers,
    ShowHeadings,
    SetMaxVisible,
    Undo,
}

/// Static palette entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandInfo {
    pub command: Command,
    pub id: &'static str,
    pub label: &'static str,
    pub description: &'static str,
}

const fn info(command: Command, id: &'static str, label: &'static str, description: &'static str) -> CommandInfo {
    CommandInfo {
        command,
        id,
        label,
        description,
    }
}

pub const COMMANDS: &[CommandInfo] = &[
    info(Command::CheckAll, "check-all", "Check all", "Mark every task done"),
    info(Command::UncheckAll, "uncheck-all", "Uncheck all", "Mark every task not done"),
    info(Command::SortDone, "sort-done", "Sort by done", "Unchecked tasks first, per section"),
    info(Command::SortDue, "sort-due", "Sort by due date", "Earliest due first, undated last"),
    info(Command::SortPriority, "sort-priority", "Sort by priority", "Lowest !p number first"),
    info(Command::FilterDone, "filter-done", "Filter done", "Hide or show checked tasks"),
    info(Command::FilterDue, "filter-due", "Filter due", "Only tasks with a due date"),
    info(Command::FilterOverdue, "filter-overdue", "Filter overdue", "Only tasks due before today"),
    info(Command::FilterToday, "filter-today", "Filter today", "Only tasks due today"),
    info(Command::FilterWeek, "filter-week", "Filter this week", "Only tasks due within 7 days"),
    info(Command::ClearFilters, "clear-filters", "Clear filters", "Remove tag, priority and due filters"),
    info(Command::ClearDone, "clear-done", "Clear done", "Delete all checked tasks"),
    info(Command::ReadOnly, "read-only", "Toggle read-only", "Stop or resume writing to the file"),
    info(Command::Save, "save", "Save", "Write the file now"),
    info(Command::ForceSave, "force-save", "Force save", "Overwrite external changes with this view"),
    info(Command::Reload, "reload", "Reload", "Discard local state and re-read the file"),
    info(Command::Wrap, "wrap", "Toggle word wrap", "Wrap long task lines"),
    info(Command::LineNumbers, "line-numbers", "Toggle line numbers", "Show row numbers"),
    info(Command::ShowHeadings, "show-headings", "Toggle headings", "Show section headings"),
    info(Command::SetMaxVisible, "set-max-visible", "Set max visible", "Limit rows shown (0 = all)"),
    info(Command::Undo, "undo", "Undo", "Revert the last change"),
];

impl Command {
    pub fn info(self) -> &'static CommandInfo {
        COMMANDS
            .iter()
            .find(|c| c.command == self)
            .unwrap_or(&COMMANDS[0])
    }

    pub fn id(self) -> &'static str {
        self.info().id
    }

    pub fn from_id(id: &str) -> Option<Command> {
        COMMANDS.iter().find(|c| c.id == id).map(|c| c.command)
    }

    /// Whether the command needs an argument after its name
    pub fn takes_argument(self) -> bool {
        matches!(self, Command::SetMaxVisible)
    }
}

/// Palette entry matching the current query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredCommand {
    pub info: &'static CommandInfo,
    pub score: i32,
    /// Matched char indices within the id
    pub matched: Vec<usize>,
}

/// Rank commands against `query` (matched on the id), best first, ties by
/// label. An empty query lists everything.
pub fn filter_commands(query: &str) -> Vec<ScoredCommand> {
    let query = query.trim();
    let mut results: Vec<ScoredCommand> = COMMANDS
        .iter()
        .filter_map(|info| {
            let (score, matched) = fuzzy_score(query, info.id)?;
            Some(ScoredCommand { info, score, matched })
        })
        .collect();
    results.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.info.label.cmp(b.info.label)));
    results
}

/// Split palette input into a command and optional argument
pub fn parse_command_line(line: &str) -> Result<(Command, Option<&str>), SessionError> {
    let line = line.trim();
    let (name, arg) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, Some(rest.trim()).filter(|a| !a.is_empty())),
        None => (line, None),
    };
    let command = Command::from_id(name)
        .ok_or_else(|| SessionError::InvalidArgument(format!("unknown command: {name}")))?;
    Ok((command, arg))
}

impl Session {
    /// Run a palette command; returns the status line to show
    pub fn execute(&mut self, command: Command, arg: Option<&str>) -> Result<String, SessionError> {
        let message = match command {
            Command::CheckAll => format!("checked {} tasks", self.set_all_checked(true)?),
            Command::UncheckAll => format!("unchecked {} tasks", self.set_all_checked(false)?),
            Command::SortDone => sorted(self.sort(SortKey::Done)?),
            Command::SortDue => sorted(self.sort(SortKey::Due)?),
            Command::SortPriority => sorted(self.sort(SortKey::Priority)?),
            Command::FilterDone => {
                self.toggle_filter_done();
                on_off("filter done", self.filters().filter_done)
            }
            Command::FilterDue => self.due_filter(DueBucket::All),
            Command::FilterOverdue => self.due_filter(DueBucket::Overdue),
            Command::FilterToday => self.due_filter(DueBucket::Today),
            Command::FilterWeek => self.due_filter(DueBucket::Week),
            Command::ClearFilters => {
                self.clear_filters();
                "filters cleared".to_string()
            }
            Command::ClearDone => format!("removed {} done tasks", self.clear_done()?),
            Command::ReadOnly => {
                self.toggle_read_only();
                on_off("read-only", self.settings().read_only)
            }
            Command::Save => {
                self.save()?;
                "saved".to_string()
            }
            Command::ForceSave => {
                self.force_save()?;
                "saved over external changes".to_string()
            }
            Command::Reload => {
                self.reload()?;
                "reloaded".to_string()
            }
            Command::Wrap => {
                let settings = self.settings_mut();
                settings.word_wrap = !settings.word_wrap;
                on_off("word wrap", settings.word_wrap)
            }
            Command::LineNumbers => {
                let settings = self.settings_mut();
                settings.line_numbers = !settings.line_numbers;
                on_off("line numbers", settings.line_numbers)
            }
            Command::ShowHeadings => {
                let settings = self.settings_mut();
                settings.show_headings = !settings.show_headings;
                on_off("headings", settings.show_headings)
            }
            Command::SetMaxVisible => {
                let raw = arg.ok_or_else(|| SessionError::InvalidArgument("set-max-visible needs a number".into()))?;
                let n: usize = raw
                    .parse()
                    .map_err(|_| SessionError::InvalidArgument(format!("not a number: {raw}")))?;
                self.settings_mut().max_visible = n;
                if n == 0 {
                    "showing all rows".to_string()
                } else {
                    format!("showing at most {n} rows")
                }
            }
            Command::Undo => {
                if self.undo()? {
                    "undone".to_string()
                } else {
                    "nothing to undo".to_string()
                }
            }
        };
        Ok(message)
    }

    fn due_filter(&mut self, bucket: DueBucket) -> String {
        self.toggle_due_filter(bucket);
        match self.filters().due {
            DueBucket::None => "due filter off".to_string(),
            active => format!("due: {active}"),
        }
    }
}

fn sorted(changed: bool) -> String {
    if changed { "sorted" } else { "already sorted" }.to_string()
}

fn on_off(what: &str, on: bool) -> String {
    format!("{what} {}", if on { "on" } else { "off" })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_command_has_a_unique_id() {
        for info in COMMANDS {
            assert_eq!(Command::from_id(info.id), Some(info.command));
            assert_eq!(info.command.id(), info.id);
        }
        assert_eq!(COMMANDS.len(), 21);
    }

    #[test]
    fn empty_query_lists_all_by_label() {
        let all = filter_commands("");
        assert_eq!(all.len(), COMMANDS.len());
        assert_eq!(all[0].info.label, "Check all");
    }

    #[test]
    fn prefix_query_ranks_word_start_first() {
        let hits = filter_commands("sd");
        assert_eq!(hits[0].info.id, "sort-done");
        let hits = filter_commands("fover");
        assert_eq!(hits[0].info.id, "filter-overdue");
    }

    #[test]
    fn no_match_is_empty() {
        assert!(filter_commands("zzz").is_empty());
    }

    #[test]
    fn parse_command_line_splits_argument() {
        assert_eq!(
            parse_command_line("set-max-visible  5 ").unwrap(),
            (Command::SetMaxVisible, Some("5"))
        );
        assert_eq!(parse_command_line("undo").unwrap(), (Command::Undo, None));
        assert!(parse_command_line("frobnicate").is_err());
    }
}
