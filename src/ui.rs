//! Layout and drawing: board, sidebar, title and game-over overlays, line-clear flash.

use crate::game::{Cell, Phase, Snapshot};
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

const SIDEBAR_WIDTH: u16 = 24;

/// Duration of the line-clear flash in ms.
const LINE_CLEAR_FADE_MS: u32 = 350;

/// How many terminal cells one grid cell takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellScale {
    /// Two columns by one row per cell.
    Full,
    /// Half-blocks (▀): one column, two grid rows per terminal row.
    Compact,
}

impl CellScale {
    /// Full when the bordered board and the sidebar fit side by side at two
    /// columns per cell, and the board fits vertically.
    pub fn for_area(area: Rect, grid_width: usize, grid_height: usize) -> Self {
        let (bw, bh) = Self::Full.board_size(grid_width, grid_height);
        let fits_wide = area.width >= bw + 2 + SIDEBAR_WIDTH;
        let fits_tall = area.height >= bh + 2;
        if fits_wide && fits_tall {
            Self::Full
        } else {
            Self::Compact
        }
    }

    /// Board size in terminal cells, without border.
    fn board_size(self, grid_width: usize, grid_height: usize) -> (u16, u16) {
        match self {
            Self::Full => (grid_width as u16 * 2, grid_height as u16),
            Self::Compact => (grid_width as u16, grid_height.div_ceil(2) as u16),
        }
    }

    /// Terminal rect covering grid row `row` across the whole board.
    fn row_rect(self, board: Rect, row: usize) -> Rect {
        let y = match self {
            Self::Full => row as u16,
            Self::Compact => row as u16 / 2,
        };
        Rect {
            x: board.x,
            y: board.y + y,
            width: board.width,
            height: 1,
        }
    }
}

/// Flash over the rows removed by the last line clear.
pub struct LineFlash {
    rows: Vec<usize>,
    effect: Option<Effect>,
    last_process: Option<Instant>,
}

impl LineFlash {
    pub fn new(rows: Vec<usize>) -> Self {
        Self {
            rows,
            effect: None,
            last_process: None,
        }
    }

    pub fn done(&self) -> bool {
        self.effect.as_ref().is_some_and(Effect::done)
    }
}

/// Per-frame inputs beyond the game snapshot.
pub struct Hud<'a> {
    pub music_playing: bool,
    pub has_track: bool,
    /// Notification line for the overlay (game over, game ended).
    pub notice: Option<&'a str>,
}

/// Draw one frame. `flash`, when present, is advanced to `now`.
pub fn draw(
    frame: &mut Frame,
    view: &Snapshot<'_>,
    theme: &Theme,
    hud: &Hud<'_>,
    flash: Option<&mut LineFlash>,
    now: Instant,
) {
    let area = frame.area();
    let scale = CellScale::for_area(area, view.grid.width(), view.grid.height());
    let (bw, bh) = scale.board_size(view.grid.width(), view.grid.height());
    let (pw, ph) = (bw + 2, bh + 2);
    let total_w = pw + SIDEBAR_WIDTH;

    // Center horizontally, then vertically.
    let center_horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area)[1];
    let active_area = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(ph),
            Constraint::Fill(1),
        ])
        .split(center_horiz)[1];
    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(pw), Constraint::Length(SIDEBAR_WIDTH)])
        .split(active_area);
    let (board_area, sidebar_area) = (inner[0], inner[1]);

    let board = draw_board(frame, view, theme, board_area, scale);
    draw_sidebar(frame, view, theme, hud, sidebar_area);

    if let Some(flash) = flash {
        apply_line_flash(frame, flash, board, scale, now);
    }

    match view.phase {
        Phase::Idle => draw_title_overlay(frame, theme, hud, board_area),
        Phase::GameOver => draw_game_over_overlay(frame, view, theme, hud, board_area),
        Phase::Running => {}
    }
}

/// Paint locked cells and the active piece. Returns the inner board rect.
fn draw_board(
    frame: &mut Frame,
    view: &Snapshot<'_>,
    theme: &Theme,
    area: Rect,
    scale: CellScale,
) -> Rect {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(" Blockfall ", Style::default().fg(theme.title)));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());

    let piece_cells: HashSet<(i32, i32)> = view
        .piece
        .map(|p| p.cells().collect())
        .unwrap_or_default();
    let locked: Vec<&[Cell]> = view.grid.rows().collect();
    let color_at = |col: usize, row: usize| -> Color {
        if piece_cells.contains(&(col as i32, row as i32)) {
            theme.active
        } else if locked[row][col] == Cell::Filled {
            theme.locked
        } else {
            theme.bg
        }
    };

    let (gw, gh) = (view.grid.width(), view.grid.height());
    let right = inner.x + inner.width;
    let bottom = inner.y + inner.height;
    let buf = frame.buffer_mut();
    match scale {
        CellScale::Full => {
            for row in 0..gh {
                for col in 0..gw {
                    let style = Style::default().bg(color_at(col, row));
                    let rx = inner.x + col as u16 * 2;
                    let ry = inner.y + row as u16;
                    for dx in 0..2 {
                        if rx + dx < right && ry < bottom {
                            buf[(rx + dx, ry)].set_symbol(" ").set_style(style);
                        }
                    }
                }
            }
        }
        CellScale::Compact => {
            // Iterate by terminal rows (grid row step 2)
            for row in (0..gh).step_by(2) {
                for col in 0..gw {
                    let top = color_at(col, row);
                    let bot = if row + 1 < gh {
                        color_at(col, row + 1)
                    } else {
                        theme.bg
                    };
                    let rx = inner.x + col as u16;
                    let ry = inner.y + (row / 2) as u16;
                    if rx < right && ry < bottom {
                        buf[(rx, ry)]
                            .set_symbol("▀")
                            .set_style(Style::default().fg(top).bg(bot));
                    }
                }
            }
        }
    }
    inner
}

fn draw_sidebar(frame: &mut Frame, view: &Snapshot<'_>, theme: &Theme, hud: &Hud<'_>, area: Rect) {
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let help_style = Style::default().fg(theme.inactive_fg);
    let border_style = Style::default().fg(theme.div_line).bg(theme.bg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6), // Stats
            Constraint::Length(1), // gap
            Constraint::Length(3), // Music
            Constraint::Length(1), // gap
            Constraint::Min(8),    // Keys
        ])
        .split(area);

    let stat = |label: &'static str, value: String| {
        Line::from(vec![
            Span::styled(label, title_style),
            Span::styled(value, fg_style),
        ])
    };
    let stats = Text::from(vec![
        stat("Score: ", view.score.to_string()),
        stat("Lines: ", view.lines_cleared.to_string()),
        stat("Pieces: ", view.pieces_locked.to_string()),
    ]);
    let stats_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);
    Paragraph::new(stats)
        .block(stats_block)
        .render(chunks[0], frame.buffer_mut());

    let music = match (hud.has_track, hud.music_playing) {
        (false, _) => "none",
        (true, true) => "on",
        (true, false) => "off",
    };
    Paragraph::new(stat("Music: ", music.to_string()))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style),
        )
        .render(chunks[2], frame.buffer_mut());

    let keys = Text::from(vec![
        Line::from(Span::styled("←/→ h/l  move", help_style)),
        Line::from(Span::styled("↑ k      rotate", help_style)),
        Line::from(Span::styled("↓ j      drop", help_style)),
        Line::from(Span::styled("Enter    start", help_style)),
        Line::from(Span::styled("e        end game", help_style)),
        Line::from(Span::styled("m        music", help_style)),
        Line::from(Span::styled("q/Esc    quit", help_style)),
    ]);
    Paragraph::new(keys)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(Span::styled(" Keys ", title_style)),
        )
        .render(chunks[4], frame.buffer_mut());
}

fn overlay_rect(board_area: Rect, height: u16) -> Rect {
    let width = board_area.width.saturating_sub(2).max(1);
    Rect {
        x: board_area.x + 1,
        y: board_area.y + board_area.height.saturating_sub(height) / 2,
        width,
        height: height.min(board_area.height),
    }
}

fn draw_overlay(frame: &mut Frame, theme: &Theme, rect: Rect, lines: Vec<Line<'_>>) {
    Clear.render(rect, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .style(Style::default().bg(theme.bg))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
        )
        .render(rect, frame.buffer_mut());
}

fn draw_title_overlay(frame: &mut Frame, theme: &Theme, hud: &Hud<'_>, board_area: Rect) {
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " BLOCKFALL ",
            Style::default()
                .fg(theme.title)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    if let Some(notice) = hud.notice {
        lines.push(Line::from(Span::styled(
            notice,
            Style::default().fg(theme.main_fg),
        )));
        lines.push(Line::from(""));
    }
    lines.push(Line::from(Span::styled(
        "Enter to start",
        Style::default().fg(theme.main_fg),
    )));
    let rect = overlay_rect(board_area, lines.len() as u16 + 3);
    draw_overlay(frame, theme, rect, lines);
}

fn draw_game_over_overlay(
    frame: &mut Frame,
    view: &Snapshot<'_>,
    theme: &Theme,
    hud: &Hud<'_>,
    board_area: Rect,
) {
    let fg = Style::default().fg(theme.main_fg);
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Game Over ",
            Style::default().fg(Color::White).bg(Color::Red),
        )),
        Line::from(""),
        Line::from(Span::styled(format!("Score: {}", view.score), fg)),
        Line::from(Span::styled(format!("Lines: {}", view.lines_cleared), fg)),
    ];
    if let Some(notice) = hud.notice {
        lines.push(Line::from(Span::styled(notice, fg)));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Enter to restart", fg)));
    lines.push(Line::from(Span::styled("e to leave", fg)));
    let rect = overlay_rect(board_area, lines.len() as u16 + 3);
    draw_overlay(frame, theme, rect, lines);
}

/// Create the flash effect on first use and advance it by the time since the last frame.
fn apply_line_flash(
    frame: &mut Frame,
    flash: &mut LineFlash,
    board: Rect,
    scale: CellScale,
    now: Instant,
) {
    let delta = flash
        .last_process
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    flash.last_process = Some(now);

    if flash.effect.is_none() {
        let positions: HashSet<(u16, u16)> = flash
            .rows
            .iter()
            .map(|&row| scale.row_rect(board, row))
            .flat_map(|r| (r.x..r.x + r.width).map(move |x| (x, r.y)))
            .collect();
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            positions.contains(&(pos.x, pos.y))
        }));
        let effect = fx::fade_from(
            Color::White,
            Color::White,
            (LINE_CLEAR_FADE_MS, Interpolation::Linear),
        )
        .with_filter(filter)
        .with_area(board);
        flash.effect = Some(effect);
    }

    if let Some(effect) = flash.effect.as_mut() {
        frame.render_effect(effect, board, TfxDuration::from_millis(delta_ms));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScoringRule;
    use crate::game::{GRID_HEIGHT, GRID_WIDTH, GameState};
    use crate::piece::{ActivePiece, PieceKind};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use ratatui::buffer::Buffer;

    const HUD: Hud<'static> = Hud {
        music_playing: false,
        has_track: false,
        notice: None,
    };

    fn render(state: &GameState, cols: u16, rows: u16, hud: &Hud<'_>) -> Buffer {
        let mut terminal = Terminal::new(TestBackend::new(cols, rows)).unwrap();
        let theme = Theme::default();
        terminal
            .draw(|f| draw(f, &state.snapshot(), &theme, hud, None, Instant::now()))
            .unwrap();
        terminal.backend().buffer().clone()
    }

    fn text(buf: &Buffer) -> String {
        buf.content().iter().map(|c| c.symbol()).collect()
    }

    fn state() -> GameState {
        GameState::with_rng(ScoringRule::Exponential, StdRng::seed_from_u64(11))
    }

    #[test]
    fn scale_follows_terminal_size() {
        let scale = |w, h| CellScale::for_area(Rect::new(0, 0, w, h), GRID_WIDTH, GRID_HEIGHT);
        assert_eq!(scale(80, 40), CellScale::Full);
        assert_eq!(scale(80, 32), CellScale::Full);
        assert_eq!(scale(80, 31), CellScale::Compact);
        assert_eq!(scale(54, 40), CellScale::Full);
        assert_eq!(scale(53, 40), CellScale::Compact);
        assert_eq!(
            CellScale::Compact.board_size(GRID_WIDTH, GRID_HEIGHT),
            (14, 15)
        );
    }

    #[test]
    fn idle_shows_title_and_score() {
        let buf = render(&state(), 80, 40, &HUD);
        let t = text(&buf);
        assert!(t.contains("BLOCKFALL"));
        assert!(t.contains("Enter to start"));
        assert!(t.contains("Score: 0"));
    }

    #[test]
    fn full_scale_paints_piece_two_columns_wide() {
        let mut s = state();
        s.start();
        let buf = render(&s, 80, 40, &HUD);
        let theme = Theme::default();
        let active = buf.content().iter().filter(|c| c.bg == theme.active).count();
        assert_eq!(active, 8);
    }

    #[test]
    fn compact_scale_paints_locked_row_as_lower_halves() {
        let mut s = state();
        s.start();
        for col in 0..GRID_WIDTH {
            s.grid.fill(col, GRID_HEIGHT - 1);
        }
        let buf = render(&s, 80, 24, &HUD);
        let theme = Theme::default();
        let locked = buf
            .content()
            .iter()
            .filter(|c| c.symbol() == "▀" && c.bg == theme.locked)
            .count();
        assert_eq!(locked, GRID_WIDTH);
    }

    #[test]
    fn narrow_terminal_still_paints_right_edge_piece() {
        let mut s = state();
        s.start();
        let mut bar = ActivePiece::new(PieceKind::Bar, GRID_WIDTH as i32 - 1, 0);
        bar.shape = bar.shape.rotated_cw();
        s.piece = bar;
        let buf = render(&s, 45, 40, &HUD);
        let theme = Theme::default();
        // Four rows of the upright bar fold into two half-block cells.
        let active = buf
            .content()
            .iter()
            .filter(|c| c.symbol() == "▀" && c.fg == theme.active && c.bg == theme.active)
            .count();
        assert_eq!(active, 2);
    }

    #[test]
    fn game_over_overlay_shows_score_and_notice() {
        let mut s = state();
        s.phase = Phase::GameOver;
        s.score = 40;
        let hud = Hud {
            notice: Some("Topped out"),
            ..HUD
        };
        let t = text(&render(&s, 80, 40, &hud));
        assert!(t.contains("Game Over"));
        assert!(t.contains("Score: 40"));
        assert!(t.contains("Topped out"));
        assert!(t.contains("Enter to restart"));
    }

    #[test]
    fn flash_row_rects_follow_scale() {
        let board = Rect::new(10, 5, 28, 30);
        assert_eq!(CellScale::Full.row_rect(board, 29).y, 34);
        let board = Rect::new(10, 5, 14, 15);
        assert_eq!(CellScale::Compact.row_rect(board, 29).y, 19);
        assert_eq!(CellScale::Compact.row_rect(board, 28).y, 19);
    }

    #[test]
    fn line_flash_finishes() {
        let s = state();
        let theme = Theme::default();
        let mut flash = LineFlash::new(vec![GRID_HEIGHT - 1]);
        let mut terminal = Terminal::new(TestBackend::new(80, 40)).unwrap();
        let t0 = Instant::now();
        terminal
            .draw(|f| draw(f, &s.snapshot(), &theme, &HUD, Some(&mut flash), t0))
            .unwrap();
        assert!(!flash.done());
        let later = t0 + std::time::Duration::from_millis(u64::from(LINE_CLEAR_FADE_MS) + 50);
        terminal
            .draw(|f| draw(f, &s.snapshot(), &theme, &HUD, Some(&mut flash), later))
            .unwrap();
        assert!(flash.done());
    }
}
