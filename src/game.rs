//! Game state: grid, collision, lock and line clear, scoring, drop timer.

use crate::ScoringRule;
use crate::piece::{ActivePiece, PieceKind};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::VecDeque;
use std::time::Duration;

/// Board width in cells.
pub const GRID_WIDTH: usize = 14;
/// Board height in cells.
pub const GRID_HEIGHT: usize = 30;

/// The piece falls one row each time this much time has accumulated.
pub const DROP_INTERVAL: Duration = Duration::from_millis(1000);

/// Points for a single-row clear; multi-row clears scale from this.
const BASE_LINE_POINTS: u32 = 10;

/// Single cell of the locked-block grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Filled,
}

/// Locked blocks. y=0 is top; rows are stored [0..height].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    width: usize,
    height: usize,
    /// rows[y][x] = cell. rows[0] is top.
    rows: VecDeque<Vec<Cell>>,
}

impl Grid {
    pub fn new(width: usize, height: usize) -> Self {
        let rows = (0..height).map(|_| vec![Cell::Empty; width]).collect();
        Self {
            width,
            height,
            rows,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// True if (col, row) lies within `[0, width) × [0, height)`.
    #[inline]
    pub fn contains(&self, col: i32, row: i32) -> bool {
        col >= 0 && row >= 0 && (col as usize) < self.width && (row as usize) < self.height
    }

    /// Panics on out-of-range coordinates: callers must bounds-check first.
    #[inline]
    pub fn is_filled(&self, col: usize, row: usize) -> bool {
        self.check_bounds(col, row);
        self.rows[row][col] == Cell::Filled
    }

    /// Panics on out-of-range coordinates.
    #[inline]
    pub fn fill(&mut self, col: usize, row: usize) {
        self.check_bounds(col, row);
        self.rows[row][col] = Cell::Filled;
    }

    pub fn clear(&mut self) {
        for row in &mut self.rows {
            row.fill(Cell::Empty);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().flatten().all(|&c| c == Cell::Empty)
    }

    /// Rows top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Indices of rows whose every cell is filled, top to bottom.
    pub fn full_rows(&self) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.iter().all(|&c| c == Cell::Filled))
            .map(|(y, _)| y)
            .collect()
    }

    /// Drop every full row, shift the rest down in order and refill the top with
    /// empty rows. Returns the number of rows removed; the row count is unchanged.
    pub fn remove_full_rows(&mut self) -> usize {
        let before = self.rows.len();
        self.rows.retain(|row| row.contains(&Cell::Empty));
        let removed = before - self.rows.len();
        for _ in 0..removed {
            self.rows.push_front(vec![Cell::Empty; self.width]);
        }
        removed
    }

    fn check_bounds(&self, col: usize, row: usize) {
        assert!(
            col < self.width && row < self.height,
            "grid access out of bounds: ({}, {}) on {}x{} grid",
            col,
            row,
            self.width,
            self.height
        );
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new(GRID_WIDTH, GRID_HEIGHT)
    }
}

/// True if any occupied cell of `piece` is outside the grid or on a filled cell.
/// Bounds are tested before the grid is read.
pub fn collides(grid: &Grid, piece: &ActivePiece) -> bool {
    piece.cells().any(|(col, row)| {
        !grid.contains(col, row) || grid.is_filled(col as usize, row as usize)
    })
}

/// Write the piece's occupied cells into the grid. The piece must be at a
/// non-colliding position.
pub fn lock(grid: &mut Grid, piece: &ActivePiece) {
    for (col, row) in piece.cells() {
        debug_assert!(grid.contains(col, row), "locking piece outside grid");
        grid.fill(col as usize, row as usize);
    }
}

/// Score awarded for clearing `rows` rows with one lock.
pub fn line_clear_points(rule: ScoringRule, rows: usize) -> u32 {
    match (rule, rows) {
        (_, 0) => 0,
        (ScoringRule::Exponential, k) => BASE_LINE_POINTS << (k - 1).min(31),
        (ScoringRule::Linear, _) => BASE_LINE_POINTS,
    }
}

/// Round lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    GameOver,
}

/// Player command for the active piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    MoveLeft,
    MoveRight,
    SoftDrop,
    Rotate,
}

/// Things that happened inside the game since the last drain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    Spawned(PieceKind),
    /// A piece locked; `rows` are the indices (before the shift) of cleared rows.
    Locked { rows: Vec<usize>, points: u32 },
    GameOver { score: u32 },
}

/// Read-only view handed to the renderer once per frame.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    pub grid: &'a Grid,
    /// None unless the round is running.
    pub piece: Option<&'a ActivePiece>,
    pub score: u32,
    pub lines_cleared: u32,
    pub pieces_locked: u32,
    pub phase: Phase,
}

/// Everything a round needs; owned by the app controller.
#[derive(Debug)]
pub struct GameState {
    pub grid: Grid,
    pub piece: ActivePiece,
    pub score: u32,
    pub lines_cleared: u32,
    pub pieces_locked: u32,
    pub phase: Phase,
    scoring: ScoringRule,
    rng: StdRng,
    /// Time gathered towards the next gravity step.
    drop_accum: Duration,
    last_tick: Option<Duration>,
    events: Vec<GameEvent>,
}

impl GameState {
    pub fn new(config: &crate::GameConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config.scoring, rng)
    }

    pub fn with_rng(scoring: ScoringRule, mut rng: StdRng) -> Self {
        let grid = Grid::default();
        let kind = PieceKind::random(&mut rng);
        let piece = ActivePiece::spawn(kind, grid.width());
        Self {
            grid,
            piece,
            score: 0,
            lines_cleared: 0,
            pieces_locked: 0,
            phase: Phase::Idle,
            scoring,
            rng,
            drop_accum: Duration::ZERO,
            last_tick: None,
            events: vec![GameEvent::Spawned(kind)],
        }
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            grid: &self.grid,
            piece: (self.phase == Phase::Running).then_some(&self.piece),
            score: self.score,
            lines_cleared: self.lines_cleared,
            pieces_locked: self.pieces_locked,
            phase: self.phase,
        }
    }

    /// Events since the last call, oldest first.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Idle → Running. No effect in other phases.
    pub fn start(&mut self) {
        if self.phase == Phase::Idle {
            self.phase = Phase::Running;
            self.drop_accum = Duration::ZERO;
        }
    }

    /// Fresh round, running immediately.
    pub fn restart(&mut self) {
        self.reset();
        self.phase = Phase::Running;
    }

    /// Abandon the round and go back to Idle with an empty board.
    pub fn end_game(&mut self) {
        self.reset();
        self.phase = Phase::Idle;
    }

    fn reset(&mut self) {
        self.grid.clear();
        self.score = 0;
        self.lines_cleared = 0;
        self.pieces_locked = 0;
        self.drop_accum = Duration::ZERO;
        self.events.clear();
        self.spawn();
    }

    /// Advance the drop timer to `now` (monotonic). Only accumulates while running.
    pub fn on_tick(&mut self, now: Duration) {
        let elapsed = self
            .last_tick
            .map_or(Duration::ZERO, |last| now.saturating_sub(last));
        self.last_tick = Some(now);
        if self.phase != Phase::Running {
            return;
        }
        self.drop_accum += elapsed;
        if self.drop_accum > DROP_INTERVAL {
            self.drop_accum = Duration::ZERO;
            self.soft_drop();
        }
    }

    /// Dispatch a player command. Returns true if the piece moved or rotated.
    pub fn apply(&mut self, command: Command) -> bool {
        match command {
            Command::MoveLeft => self.move_left(),
            Command::MoveRight => self.move_right(),
            Command::SoftDrop => self.soft_drop(),
            Command::Rotate => self.rotate(),
        }
    }

    pub fn move_left(&mut self) -> bool {
        self.try_transform(|p| p.position.x -= 1)
    }

    pub fn move_right(&mut self) -> bool {
        self.try_transform(|p| p.position.x += 1)
    }

    pub fn rotate(&mut self) -> bool {
        self.try_transform(|p| p.shape = p.shape.rotated_cw())
    }

    /// One row down; if blocked, the piece locks where it is and returns false.
    pub fn soft_drop(&mut self) -> bool {
        if self.phase != Phase::Running {
            return false;
        }
        let moved = self.try_transform(|p| p.position.y += 1);
        if !moved {
            self.lock_piece();
        }
        moved
    }

    /// Apply `transform` to a copy of the piece and commit it only if the result
    /// does not collide.
    fn try_transform(&mut self, transform: impl FnOnce(&mut ActivePiece)) -> bool {
        if self.phase != Phase::Running {
            return false;
        }
        let mut candidate = self.piece.clone();
        transform(&mut candidate);
        if collides(&self.grid, &candidate) {
            return false;
        }
        self.piece = candidate;
        true
    }

    fn lock_piece(&mut self) {
        lock(&mut self.grid, &self.piece);
        self.pieces_locked += 1;
        tracing::trace!(kind = ?self.piece.kind, x = self.piece.position.x, y = self.piece.position.y, "piece locked");

        let rows = self.grid.full_rows();
        let removed = self.grid.remove_full_rows();
        debug_assert_eq!(rows.len(), removed);
        let points = line_clear_points(self.scoring, removed);
        self.score = self.score.saturating_add(points);
        self.lines_cleared += removed as u32;
        self.events.push(GameEvent::Locked { rows, points });

        self.spawn();
        if collides(&self.grid, &self.piece) {
            self.grid.clear();
            debug_assert!(self.grid.is_empty());
            self.phase = Phase::GameOver;
            self.events.push(GameEvent::GameOver { score: self.score });
        }
    }

    fn spawn(&mut self) {
        let kind = PieceKind::random(&mut self.rng);
        self.piece = ActivePiece::spawn(kind, self.grid.width());
        tracing::trace!(?kind, "piece spawned");
        self.events.push(GameEvent::Spawned(kind));
    }
}
