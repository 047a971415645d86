use std::fs;
use std::path::Path;

use crate::game::board::{Board, Move, Stone, SIZE};
use crate::{Error, Result};

/// One referee turn: the side to move and the last two positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameInput {
    pub piece: Stone,
    pub previous: Board,
    pub current: Board,
}

impl GameInput {
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty());

        let piece_line = lines
            .next()
            .ok_or_else(|| Error::Parse("missing piece type line".to_string()))?;
        let piece = match piece_line {
            "1" => Stone::Black,
            "2" => Stone::White,
            other => return Err(Error::Parse(format!("piece type must be 1 or 2, got `{other}`"))),
        };
        let previous = parse_board(&mut lines, "previous")?;
        let current = parse_board(&mut lines, "current")?;
        if let Some(extra) = lines.next() {
            log::warn!("⚠️ Ignoring trailing input line `{}`", extra);
        }

        Ok(Self {
            piece,
            previous,
            current,
        })
    }
}

fn parse_board<'a>(lines: &mut impl Iterator<Item = &'a str>, which: &str) -> Result<Board> {
    let mut board = Board::empty();
    for row in 0..SIZE {
        let line = lines
            .next()
            .ok_or_else(|| Error::Parse(format!("{which} board ends after {row} rows")))?;
        if line.len() != SIZE {
            return Err(Error::Parse(format!(
                "{which} board row {row} has {} cells, expected {SIZE}",
                line.len()
            )));
        }
        for (col, ch) in line.bytes().enumerate() {
            let code = ch
                .checked_sub(b'0')
                .filter(|code| *code <= 9)
                .ok_or_else(|| Error::Parse(format!("{which} board row {row} has non-digit `{}`", ch as char)))?;
            board.set(row, col, Stone::from_code(code)?);
        }
    }
    Ok(board)
}

/// Reads the referee's `input.txt`
pub fn read_input(path: impl AsRef<Path>) -> Result<GameInput> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let input = GameInput::parse(&text)?;
    log::debug!("Read {:?} to move from {}", input.piece, path.display());
    Ok(input)
}

/// Writes `row,col` or `PASS` to the referee's `output.txt`
pub fn write_output(path: impl AsRef<Path>, mv: &Move) -> Result<()> {
    fs::write(path.as_ref(), mv.to_string())?;
    log::info!("✍️ Wrote move {} to {}", mv, path.as_ref().display());
    Ok(())
}
