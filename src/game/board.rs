use std::fmt;

use serde::{Deserialize, Serialize};

use crate::neural::{BOARD_SIZE, PASS_INDEX};
use crate::{Error, Result};

pub const SIZE: usize = BOARD_SIZE as usize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stone {
    #[default]
    Empty,
    Black,
    White,
}

impl Stone {
    /// Referee encoding: 0 empty, 1 black, 2 white
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Stone::Empty),
            1 => Ok(Stone::Black),
            2 => Ok(Stone::White),
            other => Err(Error::Parse(format!("unknown stone code {other}"))),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Stone::Empty => 0,
            Stone::Black => 1,
            Stone::White => 2,
        }
    }

    pub fn opponent(self) -> Stone {
        match self {
            Stone::Black => Stone::White,
            Stone::White => Stone::Black,
            Stone::Empty => Stone::Empty,
        }
    }
}

/// A 5×5 grid indexed `[row][col]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Board {
    cells: [[Stone; SIZE]; SIZE],
}

impl Board {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: [[Stone; SIZE]; SIZE]) -> Self {
        Self { cells: rows }
    }

    pub fn get(&self, row: usize, col: usize) -> Stone {
        self.cells[row][col]
    }

    pub fn set(&mut self, row: usize, col: usize, stone: Stone) {
        self.cells[row][col] = stone;
    }

    pub fn rows(&self) -> &[[Stone; SIZE]; SIZE] {
        &self.cells
    }

    pub fn stone_count(&self) -> usize {
        self.cells.iter().flatten().filter(|s| **s != Stone::Empty).count()
    }

    /// Row-major referee codes, the layout the native engine reads
    pub fn to_codes(&self) -> [i32; SIZE * SIZE] {
        let mut codes = [0; SIZE * SIZE];
        for (slot, stone) in codes.iter_mut().zip(self.cells.iter().flatten()) {
            *slot = i32::from(stone.code());
        }
        codes
    }

    pub fn neighbors(row: usize, col: usize) -> impl Iterator<Item = (usize, usize)> {
        let up = row.checked_sub(1).map(|r| (r, col));
        let down = (row + 1 < SIZE).then_some((row + 1, col));
        let left = col.checked_sub(1).map(|c| (row, c));
        let right = (col + 1 < SIZE).then_some((row, col + 1));
        [up, down, left, right].into_iter().flatten()
    }

    /// Distinct empty points adjacent to the group containing `(row, col)`; 0 for an empty point.
    pub fn liberties(&self, row: usize, col: usize) -> usize {
        let color = self.get(row, col);
        if color == Stone::Empty {
            return 0;
        }
        let mut visited = [[false; SIZE]; SIZE];
        let mut liberty = [[false; SIZE]; SIZE];
        let mut stack = vec![(row, col)];
        visited[row][col] = true;
        while let Some((r, c)) = stack.pop() {
            for (nr, nc) in Self::neighbors(r, c) {
                match self.get(nr, nc) {
                    Stone::Empty => liberty[nr][nc] = true,
                    s if s == color && !visited[nr][nc] => {
                        visited[nr][nc] = true;
                        stack.push((nr, nc));
                    }
                    _ => {}
                }
            }
        }
        liberty.iter().flatten().filter(|l| **l).count()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.cells {
            for stone in row {
                write!(f, "{}", stone.code())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Move {
    Place { row: usize, col: usize },
    Pass,
}

impl Move {
    /// `-1` is a pass, `0..25` a row-major point.
    pub fn from_engine_index(index: i32) -> Result<Self> {
        match index {
            -1 => Ok(Move::Pass),
            i if (0..(SIZE * SIZE) as i32).contains(&i) => {
                let i = i as usize;
                Ok(Move::Place {
                    row: i / SIZE,
                    col: i % SIZE,
                })
            }
            other => Err(Error::InvalidMove(other)),
        }
    }

    /// Policy slot for this move
    pub fn to_index(self) -> usize {
        match self {
            Move::Place { row, col } => row * SIZE + col,
            Move::Pass => PASS_INDEX as usize,
        }
    }

    pub fn from_policy_index(index: usize) -> Result<Self> {
        if index == PASS_INDEX as usize {
            Ok(Move::Pass)
        } else {
            Move::from_engine_index(i32::try_from(index).map_err(|_| Error::InvalidMove(i32::MAX))?)
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Move::Place { row, col } => write!(f, "{row},{col}"),
            Move::Pass => write!(f, "PASS"),
        }
    }
}
