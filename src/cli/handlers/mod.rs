use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io::load_user_config;
use crate::io::recent::{RecentFiles, recent_path};
use crate::io::store::FileStore;
use crate::model::config::{Overrides, UserConfig};
use crate::model::filter::DueBucket;
use crate::session::app::{Session, SessionError};
use crate::session::commands::{Command, filter_commands};
use crate::session::input::{InputState, run_script};
use crate::session::render::{render_list, render_view};
use crate::session::terminal;
use crate::view::{Direction, ViewContext};

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Flags shared by every command that opens a file
struct Target {
    file: PathBuf,
    json: bool,
    overrides: Overrides,
}

pub fn dispatch(cli: Cli) -> CmdResult {
    let target = Target {
        file: cli.file_path(),
        json: cli.json,
        overrides: Overrides {
            read_only: cli.read_only,
            show_headings: cli.show_headings,
            max_visible: cli.max_visible,
        },
    };
    let config = load_user_config()?;
    debug!(file = %target.file.display(), "dispatching");

    match cli.command {
        None => cmd_interactive(&target.file, &config, &target.overrides),

        // Read commands
        Some(Commands::List(args)) => cmd_list(&target, &config, args),
        Some(Commands::Tags) => cmd_tags(&target, &config),
        Some(Commands::Recent(args)) => cmd_recent(&target, &config, args),
        Some(Commands::Run(args)) => cmd_run(&target, &config, args),

        // Write commands
        Some(Commands::Add(args)) => cmd_add(&target, &config, args),
        Some(Commands::Toggle(args)) => cmd_toggle(&target, &config, args),
        Some(Commands::Edit(args)) => cmd_edit(&target, &config, args),
        Some(Commands::Delete(args)) => cmd_delete(&target, &config, args),
        Some(Commands::Move(args)) => cmd_move(&target, &config, args),
        Some(Commands::Cmd(args)) => cmd_palette(&target, &config, args),
    }
}

fn open_session(file: &Path, config: &UserConfig, overrides: &Overrides) -> Result<Session, SessionError> {
    let store = FileStore::new(file);
    Session::open(Box::new(store), config, overrides, ViewContext::local())
}

/// Turn every filter off so any task number can be selected exactly
fn show_everything(session: &mut Session) {
    session.clear_filters();
    if session.filters().filter_done {
        session.toggle_filter_done();
    }
}

fn apply_filters(session: &mut Session, args: &FilterArgs) -> Result<(), SessionError> {
    if args.filter_done != session.filters().filter_done {
        session.toggle_filter_done();
    }
    for tag in &args.tag {
        session.toggle_tag_filter(tag);
    }
    for &p in &args.priority {
        session.toggle_priority_filter(p);
    }
    if let Some(raw) = &args.due {
        let bucket = DueBucket::parse(raw)
            .ok_or_else(|| SessionError::InvalidArgument(format!("unknown due bucket: {raw}")))?;
        if bucket != DueBucket::None {
            session.toggle_due_filter(bucket);
        }
    }
    Ok(())
}

/// Select task `number` (1-based); fails when it does not exist or the
/// active filters hide it
fn select_number(session: &mut Session, number: usize) -> Result<usize, SessionError> {
    let index = number
        .checked_sub(1)
        .filter(|&i| i < session.document().task_count())
        .ok_or_else(|| SessionError::InvalidArgument(format!("no task {number}")))?;
    session.select_index(index);
    if session.selected_index() != Some(index) {
        return Err(SessionError::InvalidArgument(format!(
            "task {number} is hidden by the current filters"
        )));
    }
    Ok(index)
}

fn report_change(target: &Target, number: Option<usize>, message: &str) -> CmdResult {
    if target.json {
        let out = ChangeJson {
            ok: true,
            number,
            message: message.to_string(),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{message}");
    }
    Ok(())
}

/// Surface session notices (e.g. a merge with external changes) on stderr
fn print_notice(session: &mut Session) {
    if let Some(status) = session.take_status() {
        eprintln!("note: {status}");
    }
}

// ---------------------------------------------------------------------------
// Interactive
// ---------------------------------------------------------------------------

fn cmd_interactive(file: &Path, config: &UserConfig, overrides: &Overrides) -> CmdResult {
    let registry = recent_path();
    let mut recent = RecentFiles::load(&registry);
    let mut session = open_session(file, config, overrides)?;
    if let Some(cursor) = recent.cursor_for(file) {
        debug!(cursor, "restoring cursor");
        session.select_index(cursor);
    }

    let result = terminal::run(&mut session);

    recent.record(file, session.selected_index(), Utc::now(), config.recent.max_entries);
    if let Err(e) = recent.save(&registry) {
        warn!(error = %e, "could not save recent files");
    }
    result
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_list(target: &Target, config: &UserConfig, args: ListArgs) -> CmdResult {
    let mut session = open_session(&target.file, config, &target.overrides)?;
    apply_filters(&mut session, &args.filters)?;
    print_view(target, &mut session)
}

fn print_view(target: &Target, session: &mut Session) -> CmdResult {
    if target.json {
        let tree = session.tree().clone();
        let out = ListJson {
            file: target.file.clone(),
            filters: session.filters().clone(),
            nodes: tree_to_json(&tree, session.document()),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        session.settings_mut().line_numbers = true;
        for line in render_list(session) {
            println!("{line}");
        }
    }
    Ok(())
}

fn cmd_tags(target: &Target, config: &UserConfig) -> CmdResult {
    let session = open_session(&target.file, config, &target.overrides)?;
    let universe = session.universe();
    if target.json {
        println!("{}", serde_json::to_string_pretty(universe)?);
        return Ok(());
    }
    let tags: Vec<String> = universe.tags.iter().map(|t| format!("#{t}")).collect();
    let prios: Vec<String> = universe.priorities.iter().map(|p| format!("!p{p}")).collect();
    let due: Vec<&str> = universe.due_buckets.iter().map(|b| b.label()).collect();
    println!("tags:       {}", tags.join(" "));
    println!("priorities: {}", prios.join(" "));
    println!("due:        {}", due.join(" "));
    Ok(())
}

fn cmd_recent(target: &Target, config: &UserConfig, args: RecentArgs) -> CmdResult {
    let registry = recent_path();
    let mut recent = RecentFiles::load(&registry);
    let now = Utc::now();
    recent.prune_missing();
    recent.sort_by_score(now);

    match args.action.as_deref().unwrap_or("list") {
        "list" => {
            if target.json {
                let out: Vec<RecentJson> = recent
                    .files
                    .iter()
                    .enumerate()
                    .map(|(i, f)| RecentJson {
                        number: i + 1,
                        path: f.path.clone(),
                        last_accessed: f.last_accessed,
                        access_count: f.access_count,
                        score: f.score(now),
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else if recent.files.is_empty() {
                println!("no recent files");
            } else {
                for (i, f) in recent.files.iter().enumerate() {
                    println!("{:>2}  {}", i + 1, f.path.display());
                }
            }
            Ok(())
        }
        "clear" => {
            recent.clear();
            recent.save(&registry)?;
            info!("recent files cleared");
            report_change(target, None, "recent files cleared")
        }
        raw => {
            let n: usize = raw
                .parse()
                .map_err(|_| SessionError::InvalidArgument(format!("expected list, clear or a number, got {raw}")))?;
            let path = recent
                .nth(n)
                .map(|f| f.path.clone())
                .ok_or_else(|| SessionError::InvalidArgument(format!("no recent file {n}")))?;
            cmd_interactive(&path, config, &target.overrides)
        }
    }
}

fn cmd_run(target: &Target, config: &UserConfig, args: RunArgs) -> CmdResult {
    let mut session = open_session(&target.file, config, &target.overrides)?;
    let mut input = InputState::new();
    run_script(&mut session, &mut input, &args.keys);
    print_notice(&mut session);
    if target.json {
        return print_view(target, &mut session);
    }
    for line in render_view(&mut session, None, None) {
        println!("{line}");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

fn cmd_add(target: &Target, config: &UserConfig, args: AddArgs) -> CmdResult {
    let mut session = open_session(&target.file, config, &target.overrides)?;
    show_everything(&mut session);
    match args.after {
        Some(n) => {
            select_number(&mut session, n)?;
            session.insert_after_selected(&args.text)?;
        }
        None => session.append(&args.text)?,
    }
    let number = session.selected_index().map(|i| i + 1);
    print_notice(&mut session);
    report_change(target, number, &format!("added task {}", number.unwrap_or(0)))
}

fn cmd_toggle(target: &Target, config: &UserConfig, args: TaskArg) -> CmdResult {
    let mut session = open_session(&target.file, config, &target.overrides)?;
    show_everything(&mut session);
    let index = select_number(&mut session, args.number)?;
    session.toggle_selected()?;
    print_notice(&mut session);
    let checked = session.document().task(index).is_some_and(|t| t.checked);
    let state = if checked { "checked" } else { "unchecked" };
    report_change(target, Some(args.number), &format!("task {} {state}", args.number))
}

fn cmd_edit(target: &Target, config: &UserConfig, args: EditArgs) -> CmdResult {
    let mut session = open_session(&target.file, config, &target.overrides)?;
    show_everything(&mut session);
    select_number(&mut session, args.number)?;
    session.edit_selected(&args.text)?;
    print_notice(&mut session);
    report_change(target, Some(args.number), &format!("task {} updated", args.number))
}

fn cmd_delete(target: &Target, config: &UserConfig, args: TaskArg) -> CmdResult {
    let mut session = open_session(&target.file, config, &target.overrides)?;
    show_everything(&mut session);
    select_number(&mut session, args.number)?;
    session.delete_selected()?;
    print_notice(&mut session);
    report_change(target, Some(args.number), &format!("task {} deleted", args.number))
}

fn cmd_move(target: &Target, config: &UserConfig, args: MoveArgs) -> CmdResult {
    let mut session = open_session(&target.file, config, &target.overrides)?;
    show_everything(&mut session);
    apply_filters(&mut session, &args.filters)?;
    select_number(&mut session, args.number)?;
    let dir = match args.direction {
        MoveDirection::Up => Direction::Up,
        MoveDirection::Down => Direction::Down,
    };
    let moved = session.move_selected(dir)?;
    print_notice(&mut session);
    let number = session.selected_index().map(|i| i + 1);
    let message = match (moved, number) {
        (true, Some(n)) => format!("task {} is now task {n}", args.number),
        _ => format!("task {} is already at the edge", args.number),
    };
    report_change(target, number, &message)
}

fn cmd_palette(target: &Target, config: &UserConfig, args: CmdArgs) -> CmdResult {
    let command = Command::from_id(&args.name).ok_or_else(|| {
        let hint = filter_commands(&args.name)
            .first()
            .map(|c| format!(" (did you mean {}?)", c.info.id))
            .unwrap_or_default();
        SessionError::InvalidArgument(format!("unknown command: {}{hint}", args.name))
    })?;
    let mut session = open_session(&target.file, config, &target.overrides)?;
    let message = session.execute(command, args.arg.as_deref())?;
    print_notice(&mut session);
    report_change(target, None, &message)
}
