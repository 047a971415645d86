pub mod greedy;
#[cfg(feature = "native-engine")]
pub mod native;

pub use greedy::GreedyPolicyEngine;
#[cfg(feature = "native-engine")]
pub use native::NativeEngine;

use crate::game::{GameInput, Move};
use crate::Result;

/// Picks the move to play for one referee turn
pub trait MoveEngine {
    fn select_move(&self, input: &GameInput) -> Result<Move>;
}

impl<T: MoveEngine + ?Sized> MoveEngine for Box<T> {
    fn select_move(&self, input: &GameInput) -> Result<Move> {
        (**self).select_move(input)
    }
}
