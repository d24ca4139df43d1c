//! Piece catalogue, shape rotation and the active (falling) piece.

use rand::Rng;

/// Rectangular occupancy matrix for one piece orientation. `cells[row][col]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shape {
    cells: Vec<Vec<bool>>,
}

impl Shape {
    /// Build a shape from 0/1 rows. Panics if the rows are ragged or empty.
    pub fn from_rows(rows: &[&[u8]]) -> Self {
        assert!(!rows.is_empty() && !rows[0].is_empty(), "shape must not be empty");
        let cols = rows[0].len();
        assert!(
            rows.iter().all(|r| r.len() == cols),
            "shape rows must all be {} wide",
            cols
        );
        Self {
            cells: rows.iter().map(|r| r.iter().map(|&v| v != 0).collect()).collect(),
        }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cells[0].len()
    }

    /// Occupied cells as (col, row) offsets from the top-left corner.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.cells.iter().enumerate().flat_map(|(r, row)| {
            row.iter()
                .enumerate()
                .filter(|&(_, &on)| on)
                .map(move |(c, _)| (c, r))
        })
    }

    /// Clockwise quarter turn: transpose, then reverse each row. `R×C` becomes `C×R`.
    pub fn rotated_cw(&self) -> Self {
        let (rows, cols) = (self.rows(), self.cols());
        let cells = (0..cols)
            .map(|c| (0..rows).rev().map(|r| self.cells[r][c]).collect())
            .collect();
        Self { cells }
    }
}

/// The seven base pieces, in catalogue order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PieceKind {
    Square,
    Bar,
    T,
    S,
    Z,
    LeftL,
    RightL,
}

impl PieceKind {
    pub const ALL: [Self; 7] = [
        Self::Square,
        Self::Bar,
        Self::T,
        Self::S,
        Self::Z,
        Self::LeftL,
        Self::RightL,
    ];

    /// Spawn orientation.
    pub fn shape(self) -> Shape {
        match self {
            Self::Square => Shape::from_rows(&[&[1, 1], &[1, 1]]),
            Self::Bar => Shape::from_rows(&[&[1, 1, 1, 1]]),
            Self::T => Shape::from_rows(&[&[0, 1, 0], &[1, 1, 1]]),
            Self::S => Shape::from_rows(&[&[1, 1, 0], &[0, 1, 1]]),
            Self::Z => Shape::from_rows(&[&[0, 1, 1], &[1, 1, 0]]),
            Self::LeftL => Shape::from_rows(&[&[1, 0], &[1, 0], &[1, 1]]),
            Self::RightL => Shape::from_rows(&[&[0, 1], &[0, 1], &[1, 1]]),
        }
    }

    /// Uniform pick from the catalogue; no memory of earlier picks.
    pub fn random(rng: &mut impl Rng) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

/// Grid-relative position of a shape's top-left corner. May be negative while a
/// candidate move is being tested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

/// The falling, player-controlled piece.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivePiece {
    pub kind: PieceKind,
    pub shape: Shape,
    pub position: Position,
}

impl ActivePiece {
    pub fn new(kind: PieceKind, x: i32, y: i32) -> Self {
        Self {
            kind,
            shape: kind.shape(),
            position: Position { x, y },
        }
    }

    /// Fresh piece at the spawn point for a grid `grid_width` columns wide.
    pub fn spawn(kind: PieceKind, grid_width: usize) -> Self {
        Self::new(kind, spawn_column(grid_width), 0)
    }

    /// Absolute (col, row) of every occupied cell; coordinates may fall outside the grid.
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        let Position { x, y } = self.position;
        self.shape
            .occupied()
            .map(move |(c, r)| (x + c as i32, y + r as i32))
    }
}

/// Horizontal spawn column: `floor(width / 2) - 2`.
pub fn spawn_column(grid_width: usize) -> i32 {
    (grid_width / 2) as i32 - 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn rotation_swaps_extents() {
        for kind in PieceKind::ALL {
            let s = kind.shape();
            let r = s.rotated_cw();
            assert_eq!((r.rows(), r.cols()), (s.cols(), s.rows()), "{:?}", kind);
        }
    }

    #[test]
    fn four_rotations_are_identity() {
        for kind in PieceKind::ALL {
            let s = kind.shape();
            let back = s.rotated_cw().rotated_cw().rotated_cw().rotated_cw();
            assert_eq!(back, s, "{:?}", kind);
        }
    }

    #[test]
    fn t_rotates_clockwise() {
        // .#.      #.
        // ###  ->  ##
        //          #.
        let r = PieceKind::T.shape().rotated_cw();
        assert_eq!(r, Shape::from_rows(&[&[1, 0], &[1, 1], &[1, 0]]));
    }

    #[test]
    fn rotation_leaves_input_untouched() {
        let s = PieceKind::LeftL.shape();
        let before = s.clone();
        let _ = s.rotated_cw();
        assert_eq!(s, before);
    }

    #[test]
    fn every_piece_has_four_cells() {
        for kind in PieceKind::ALL {
            assert_eq!(kind.shape().occupied().count(), 4, "{:?}", kind);
        }
    }

    #[test]
    fn spawn_is_centred_at_top() {
        let p = ActivePiece::spawn(PieceKind::Bar, 14);
        assert_eq!(p.position, Position { x: 5, y: 0 });
        let cells: Vec<_> = p.cells().collect();
        assert_eq!(cells, vec![(5, 0), (6, 0), (7, 0), (8, 0)]);
    }

    #[test]
    fn random_covers_catalogue() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = [false; 7];
        for _ in 0..500 {
            let k = PieceKind::random(&mut rng);
            let i = PieceKind::ALL.iter().position(|&p| p == k).unwrap();
            seen[i] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    #[should_panic(expected = "shape rows")]
    fn ragged_shape_panics() {
        let _ = Shape::from_rows(&[&[1, 1], &[1]]);
    }
}
