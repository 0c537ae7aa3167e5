use std::io::{self, Write};
use std::time::{Duration, Instant};

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::style::Print;
use crossterm::terminal::{
    self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use crossterm::{execute, queue};
use tracing::{debug, warn};

use crate::io::watcher::FileWatcher;
use crate::session::app::Session;
use crate::session::input::{self, InputState};
use crate::session::render::{render_footer, render_view};
use crate::session::scheduler::{EventKind, FILE_CHECK_INTERVAL, Scheduler};

/// Longest the loop blocks on input before checking the watcher again
const MAX_WAIT: Duration = Duration::from_millis(250);

/// Run the interactive session until the user quits
pub fn run(session: &mut Session) -> Result<(), Box<dyn std::error::Error>> {
    let watcher = match FileWatcher::start(session.path()) {
        Ok(w) => Some(w),
        Err(e) => {
            warn!(error = %e, "file watcher unavailable, relying on periodic checks");
            None
        }
    };

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, Hide)?;

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), Show, LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let result = event_loop(&mut stdout, session, watcher.as_ref());

    disable_raw_mode()?;
    execute!(stdout, Show, LeaveAlternateScreen)?;
    result
}

fn event_loop(
    out: &mut io::Stdout,
    session: &mut Session,
    watcher: Option<&FileWatcher>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut input = InputState::new();
    let mut status: Option<String> = None;
    let mut scheduler = Scheduler::new();
    scheduler.schedule(EventKind::FileCheck, FILE_CHECK_INTERVAL, Instant::now(), None);

    loop {
        if let Some(message) = session.take_status() {
            status = Some(message);
        }
        draw(out, session, &input, status.as_deref())?;

        let wait = scheduler.timeout(Instant::now()).min(MAX_WAIT);
        if event::poll(wait)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    status = None;
                    input::handle_key(session, &mut input, &mut scheduler, key, Instant::now());
                }
                Event::Resize(..) => {}
                _ => {}
            }
        }
        if input.quit {
            break;
        }

        if watcher.is_some_and(FileWatcher::poll) {
            debug!("watcher reported a change");
            scheduler.schedule(EventKind::FileCheck, Duration::ZERO, Instant::now(), None);
        }
        for timed in scheduler.due_events(Instant::now()) {
            input::handle_timed(session, &mut input, timed);
            if timed.kind == EventKind::FileCheck {
                scheduler.schedule(EventKind::FileCheck, FILE_CHECK_INTERVAL, Instant::now(), None);
            }
        }
    }
    Ok(())
}

fn draw(out: &mut io::Stdout, session: &mut Session, input: &InputState, status: Option<&str>) -> io::Result<()> {
    let (cols, rows) = terminal::size()?;
    let width = usize::from(cols);
    let height = usize::from(rows);

    let footer = render_footer(session, input, status, width);
    let room = height.saturating_sub(footer.len() + 1).max(1);
    let mut view = render_view(session, Some(width), Some(room));
    view.truncate(room);

    queue!(out, Clear(ClearType::All))?;
    let mut row: u16 = 0;
    for line in view {
        queue!(out, MoveTo(0, row), Print(line))?;
        row = row.saturating_add(1);
    }
    let footer_top = rows.saturating_sub(u16::try_from(footer.len()).unwrap_or(rows));
    for (i, line) in footer.into_iter().enumerate() {
        let y = footer_top.saturating_add(u16::try_from(i).unwrap_or(0));
        queue!(out, MoveTo(0, y), Print(line))?;
    }
    out.flush()
}
