use std::io::{self, Stdout};
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{Event, EventStream, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};

pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Drives the typing animation and request polling.
pub const TICK_RATE: Duration = Duration::from_millis(250);

#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Resize(u16, u16),
    Tick,
}

/// Multiplexes crossterm's async event stream with a steady tick.
pub struct EventHandler {
    events: EventStream,
    tick: tokio::time::Interval,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        Self {
            events: EventStream::new(),
            tick: tokio::time::interval(tick_rate),
        }
    }

    pub async fn next(&mut self) -> Result<AppEvent> {
        loop {
            tokio::select! {
                _ = self.tick.tick() => return Ok(AppEvent::Tick),
                maybe_event = self.events.next() => match maybe_event {
                    // Key press only, not release
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        return Ok(AppEvent::Key(key));
                    }
                    Some(Ok(Event::Resize(w, h))) => return Ok(AppEvent::Resize(w, h)),
                    Some(Ok(_)) => {}
                    Some(Err(err)) => return Err(err.into()),
                    None => anyhow::bail!("terminal event stream closed"),
                },
            }
        }
    }
}

pub fn init() -> Result<Tui> {
    enable_raw_mode()?;
    execute!(io::stdout(), EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(io::stdout());
    let terminal = Terminal::new(backend)?;

    Ok(terminal)
}

pub fn restore() -> Result<()> {
    execute!(io::stdout(), LeaveAlternateScreen)?;
    disable_raw_mode()?;
    Ok(())
}

/// Install panic hook to restore terminal on panic
pub fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = restore();
        original_hook(panic_info);
    }));
}
