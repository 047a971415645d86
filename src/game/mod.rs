pub mod board;
pub mod features;
pub mod io;

pub use board::{Board, Move, Stone};
pub use features::{encode_batch, encode_planes};
pub use io::{read_input, write_output, GameInput};
