//! Pure rules engine for a single noughts-and-crosses board.
//!
//! The engine is seat-agnostic: it tracks whose turn tag is active but does
//! not know which participant holds which mark. Seat resolution and turn
//! enforcement belong to the session layer.

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// One of the two sides in a game. X always moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mark {
    /// First mover.
    X,
    /// Second mover.
    O,
}

impl Mark {
    /// Returns the opposing mark.
    pub fn opponent(self) -> Self {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }
}

impl std::fmt::Display for Mark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mark::X => write!(f, "X"),
            Mark::O => write!(f, "O"),
        }
    }
}

/// A 0-indexed (row, column) move. Valid coordinates are 0..=2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coord {
    /// Row, top to bottom.
    pub row: usize,
    /// Column, left to right.
    pub col: usize,
}

impl Coord {
    /// Creates a coordinate. Bounds are checked by [`Game::play`], not here.
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    fn index(self) -> usize {
        self.row * 3 + self.col
    }

    fn in_bounds(self) -> bool {
        self.row <= 2 && self.col <= 2
    }
}

/// The 3x3 board, row-major. `None` is an empty cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    cells: [Option<Mark>; 9],
}

/// The 8 winning lines: 3 rows, 3 columns, 2 diagonals.
const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

impl Board {
    /// Creates an empty board.
    pub fn new() -> Self {
        Self { cells: [None; 9] }
    }

    /// Returns the cell at (row, col), or `None` out of bounds.
    pub fn get(&self, coord: Coord) -> Option<Option<Mark>> {
        if !coord.in_bounds() {
            return None;
        }
        Some(self.cells[coord.index()])
    }

    /// Returns all cells in row-major order.
    pub fn cells(&self) -> &[Option<Mark>; 9] {
        &self.cells
    }

    /// Checks whether every cell is occupied.
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|c| c.is_some())
    }

    /// Checks whether `mark` completes any of the 8 lines.
    pub fn has_line(&self, mark: Mark) -> bool {
        LINES
            .iter()
            .any(|line| line.iter().all(|&i| self.cells[i] == Some(mark)))
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors returned when a move is rejected. Rejection never mutates state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
pub enum PlayError {
    /// Coordinates outside the 0..=2 range.
    #[display("move out of bounds")]
    OutOfBounds,
    /// The target cell already holds a mark.
    #[display("cell occupied")]
    Occupied,
    /// The game has already finished.
    #[display("game over")]
    GameOver,
}

/// Full state of one game.
///
/// Invariants: `over` is true iff a line exists or `moves == 9`; `winner`
/// is set iff a line exists; `turn` alternates strictly while `!over`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    board: Board,
    turn: Mark,
    winner: Option<Mark>,
    over: bool,
    moves: u8,
}

impl Game {
    /// Creates a new game with X to move.
    pub fn new() -> Self {
        Self {
            board: Board::new(),
            turn: Mark::X,
            winner: None,
            over: false,
            moves: 0,
        }
    }

    /// Returns the board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Returns the mark whose turn is active. Meaningless once `over`.
    pub fn turn(&self) -> Mark {
        self.turn
    }

    /// Returns the winner, if a line was completed.
    pub fn winner(&self) -> Option<Mark> {
        self.winner
    }

    /// Returns whether the game has finished.
    pub fn over(&self) -> bool {
        self.over
    }

    /// Returns the number of accepted moves.
    pub fn moves(&self) -> u8 {
        self.moves
    }

    /// Plays the active turn's mark at `coord`.
    ///
    /// # Errors
    ///
    /// Returns [`PlayError::GameOver`] once finished,
    /// [`PlayError::OutOfBounds`] for coordinates outside 0..=2, and
    /// [`PlayError::Occupied`] for a non-empty cell. State is unchanged on
    /// every error path.
    #[instrument(skip(self), fields(turn = %self.turn, moves = self.moves))]
    pub fn play(&mut self, coord: Coord) -> Result<(), PlayError> {
        if self.over {
            return Err(PlayError::GameOver);
        }
        if !coord.in_bounds() {
            return Err(PlayError::OutOfBounds);
        }
        if self.board.cells[coord.index()].is_some() {
            return Err(PlayError::Occupied);
        }

        let mover = self.turn;
        self.board.cells[coord.index()] = Some(mover);
        self.moves += 1;

        if self.board.has_line(mover) {
            self.winner = Some(mover);
            self.over = true;
        } else if self.moves == 9 {
            self.over = true;
        } else {
            self.turn = mover.opponent();
        }
        Ok(())
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}
