//! App: terminal init, frame loop, key and event handling.

use crate::GameConfig;
use crate::audio::Music;
use crate::game::{GameEvent, GameState, Phase};
use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use crate::ui::{self, Hud, LineFlash};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};

/// Whether the frame loop keeps going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct App {
    config: GameConfig,
    theme: Theme,
    state: GameState,
    music: Music,
    /// Origin of the timestamps fed to the drop timer.
    clock_start: Instant,
    flash: Option<LineFlash>,
    notice: Option<String>,
}

impl App {
    pub fn new(config: GameConfig, theme: Theme, music: Music) -> Self {
        let state = GameState::new(&config);
        let mut app = Self {
            config,
            theme,
            state,
            music,
            clock_start: Instant::now(),
            flash: None,
            notice: None,
        };
        if app.config.no_menu {
            app.handle_action(Action::Confirm);
        }
        app
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Flow {
        // Only presses; repeats and releases would double-apply moves.
        if key.kind != KeyEventKind::Press {
            return Flow::Continue;
        }
        self.handle_action(key_to_action(key))
    }

    fn handle_action(&mut self, action: Action) -> Flow {
        match action {
            Action::Quit => return Flow::Quit,
            Action::Confirm => match self.state.phase {
                Phase::Idle => {
                    self.state.start();
                    self.notice = None;
                    self.music.start_round();
                    tracing::info!(muted = self.music.is_muted(), "game started");
                }
                Phase::GameOver => {
                    self.state.restart();
                    self.notice = None;
                    self.flash = None;
                    self.music.start_round();
                    tracing::info!("game restarted");
                }
                Phase::Running => {}
            },
            Action::EndGame => {
                if self.state.phase != Phase::Idle {
                    tracing::info!(score = self.state.score, "game ended by player");
                    self.state.end_game();
                    self.music.stop();
                    self.flash = None;
                    self.notice = Some("Game ended".to_string());
                }
            }
            Action::ToggleMusic => self.music.toggle(),
            Action::Piece(command) => {
                self.state.apply(command);
            }
            Action::None => {}
        }
        self.process_events();
        Flow::Continue
    }

    /// Feed the drop timer and react to whatever the game reported.
    pub fn update(&mut self, now: Instant) {
        self.state.on_tick(now.saturating_duration_since(self.clock_start));
        self.process_events();
        if self.flash.as_ref().is_some_and(LineFlash::done) {
            self.flash = None;
        }
    }

    fn process_events(&mut self) {
        for event in self.state.drain_events() {
            match event {
                GameEvent::Spawned(kind) => tracing::trace!(?kind, "next piece"),
                GameEvent::Locked { rows, points } => {
                    if rows.is_empty() {
                        continue;
                    }
                    tracing::debug!(?rows, points, score = self.state.score, "lines cleared");
                    if !self.config.no_animation {
                        self.flash = Some(LineFlash::new(rows));
                    }
                }
                GameEvent::GameOver { score } => {
                    tracing::info!(score, "game over");
                    self.flash = None;
                    self.notice = Some(format!("Final score {}", score));
                }
            }
        }
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal =
            DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;
        terminal.hide_cursor()?;

        let result = self.run_loop(&mut terminal);

        // Restore
        let _ = terminal.show_cursor();
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let frame_duration = Duration::from_secs(1) / self.config.frame_rate.max(1);
        loop {
            let now = Instant::now();
            self.update(now);

            let hud = Hud {
                music_playing: self.music.is_playing(),
                has_track: self.music.has_track(),
                notice: self.notice.as_deref(),
            };
            let view = self.state.snapshot();
            let flash = self.flash.as_mut();
            let theme = &self.theme;
            terminal.draw(|f| ui::draw(f, &view, theme, &hud, flash, now))?;

            let timeout = frame_duration.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        if self.handle_key(key) == Flow::Quit {
                            tracing::info!(score = self.state.score, "quit");
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}
