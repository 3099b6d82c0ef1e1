//! Main application logic

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io;
use std::time::Duration;

use crate::dashboard::Dashboard;

use super::{state::AppState, ui};

/// How long to wait for a key before redrawing
const FRAME_INTERVAL: Duration = Duration::from_millis(100);

/// User intent decoded from a key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    NextDataset,
    PreviousDataset,
    /// Zero-based registry position
    JumpTo(usize),
    Quit,
}

impl Action {
    pub fn from_key(code: KeyCode) -> Option<Self> {
        match code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(Action::Quit),
            KeyCode::Tab | KeyCode::Right => Some(Action::NextDataset),
            KeyCode::BackTab | KeyCode::Left => Some(Action::PreviousDataset),
            KeyCode::Char(c @ '1'..='9') => c
                .to_digit(10)
                .map(|digit| Action::JumpTo(digit as usize - 1)),
            _ => None,
        }
    }
}

/// Main TUI application
pub struct App {
    dashboard: Dashboard,
    state: AppState,
}

impl App {
    pub fn new(dashboard: Dashboard) -> Self {
        let state = AppState::new(&dashboard);
        Self { dashboard, state }
    }

    /// Run the application until the user quits, then tear down every channel
    pub async fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.run_event_loop(&mut terminal).await;
        let restored = restore_terminal(&mut terminal);

        self.finish(result, restored).await
    }

    /// Tear down every channel, then report the first failure
    async fn finish(&mut self, result: Result<()>, restored: Result<()>) -> Result<()> {
        self.dashboard.shutdown().await;

        result.and(restored)
    }

    async fn run_event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> Result<()> {
        loop {
            self.state.refresh(&self.dashboard);
            terminal.draw(|f| ui::render(f, &self.state))?;

            if event::poll(FRAME_INTERVAL)?
                && let Event::Key(key) = event::read()?
                && key.kind == KeyEventKind::Press
                && let Some(action) = Action::from_key(key.code)
                && self.handle_action(action).await
            {
                break;
            }
        }

        Ok(())
    }

    /// Apply an action, returning `true` when the app should quit
    pub async fn handle_action(&mut self, action: Action) -> bool {
        let result = match action {
            Action::Quit => return true,
            Action::NextDataset => self.dashboard.activate_next().await,
            Action::PreviousDataset => self.dashboard.activate_previous().await,
            Action::JumpTo(index) => {
                // digits beyond the registry are ignored
                if index >= self.dashboard.registry().datasets().len() {
                    return false;
                }
                self.dashboard.activate_index(index).await
            }
        };

        match result {
            Ok(()) => self.state.clear_error(),
            Err(e) => {
                tracing::error!("dataset switch failed: {}", e);
                self.state.error_message = Some(e.to_string());
            }
        }
        self.state.refresh(&self.dashboard);

        false
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
