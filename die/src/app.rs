//! Terminal lifecycle and the render+input loop: non-blocking key polling,
//! frame derivation, and repaint driven by the UI wake signal.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use die_core::state::{Shared, ViewFrame};
use die_core::types::{ActionJob, ActionKind, BeepPattern};

use crate::ui;

/// Fallback repaint cadence; the UI wake signal cuts it short on changes.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct App {
    dirty: bool,
}

impl App {
    pub fn new() -> Self {
        Self { dirty: true }
    }

    pub async fn run(&mut self, shared: Arc<Shared>) -> Result<()> {
        // Terminal setup
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let res = self.event_loop(&mut terminal, &shared).await;

        // Teardown
        disable_raw_mode()?;
        let backend = terminal.backend_mut();
        execute!(backend, LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        res
    }

    async fn event_loop<B: ratatui::backend::Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
        shared: &Arc<Shared>,
    ) -> Result<()> {
        loop {
            // Input (non-blocking)
            while event::poll(Duration::from_millis(0))? {
                match event::read()? {
                    Event::Key(key) if key.kind != KeyEventKind::Release => {
                        let page = page_rows(terminal.size()?.height);
                        let frame = shared.build_frame(page).await;
                        if frame.filter_mode {
                            handle_filter_key(key, shared).await;
                        } else {
                            handle_normal_key(key, shared, &frame).await;
                        }
                        self.dirty = true;
                    }
                    Event::Resize(_, _) => self.dirty = true,
                    _ => {}
                }
            }
            if !shared.is_running() {
                break;
            }

            if self.dirty {
                let page = page_rows(terminal.size()?.height);
                let frame = shared.build_frame(page).await;
                terminal.draw(|f| ui::draw(f, &frame))?;
                self.dirty = false;
            }

            if shared.wait_ui(POLL_INTERVAL).await {
                self.dirty = true;
            }
        }
        Ok(())
    }
}

/// Rows available to the process table at a given terminal height.
fn page_rows(height: u16) -> usize {
    height.saturating_sub(ui::CHROME_ROWS).max(1) as usize
}

async fn handle_normal_key(key: KeyEvent, shared: &Arc<Shared>, frame: &ViewFrame) {
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') => shared.shutdown(),
        KeyCode::Esc => shared.clear_filter().await,
        KeyCode::Char('/') => shared.enter_filter_mode().await,
        KeyCode::Char('k') | KeyCode::Char('K') => {
            enqueue_kill(shared, frame, ActionKind::Kill).await
        }
        KeyCode::Char('t') | KeyCode::Char('T') => {
            enqueue_kill(shared, frame, ActionKind::KillTree).await
        }
        KeyCode::Char('r') | KeyCode::Char('R') => {
            shared.set_status("REFRESH").await;
            shared.request_refresh();
        }
        KeyCode::Up => move_selection(shared, frame, -1).await,
        KeyCode::Down => move_selection(shared, frame, 1).await,
        _ => {}
    }
}

async fn handle_filter_key(key: KeyEvent, shared: &Arc<Shared>) {
    match key.code {
        KeyCode::Esc => shared.cancel_filter().await,
        KeyCode::Enter => shared.commit_filter().await,
        KeyCode::Backspace if key.modifiers.contains(KeyModifiers::CONTROL) => {
            shared.filter_clear_input().await
        }
        KeyCode::Backspace => shared.filter_backspace().await,
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            shared.filter_clear_input().await
        }
        KeyCode::Char(c)
            if !key.modifiers.contains(KeyModifiers::CONTROL) && (' '..='~').contains(&c) =>
        {
            shared.filter_push(c).await
        }
        _ => {}
    }
}

/// Bounded navigation over the filtered list.
async fn move_selection(shared: &Arc<Shared>, frame: &ViewFrame, delta: isize) {
    let Some(idx) = frame.selected else { return };
    let last = frame.filtered.len().saturating_sub(1);
    let new = idx.saturating_add_signed(delta).min(last);
    if let Some(&row_ix) = frame.filtered.get(new) {
        shared.select_pid(frame.snapshot.rows[row_ix].pid).await;
    }
}

async fn enqueue_kill(shared: &Arc<Shared>, frame: &ViewFrame, kind: ActionKind) {
    let Some(row) = frame.selected_row() else { return };
    let (verb, beep) = match kind {
        ActionKind::Kill => ("KILLING", BeepPattern::ShortTriplet),
        ActionKind::KillTree => ("KILLING TREE", BeepPattern::Long),
    };
    shared.set_status(format!("{verb} {} {}", row.pid, row.name)).await;
    shared
        .queue_action(ActionJob {
            kind,
            pid: row.pid,
            name: row.name.clone(),
        })
        .await;
    shared.queue_beep(beep).await;
}
