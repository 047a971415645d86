use tch::{Kind, Tensor};

use crate::engine::MoveEngine;
use crate::game::board::SIZE;
use crate::game::{encode_planes, GameInput, Move, Stone};
use crate::neural::{PolicyModel, PASS_INDEX};
use crate::Result;

/// Plays the highest-scoring empty point, or passes when the pass slot scores higher.
///
/// No search and no legality check beyond "the point is empty".
pub struct GreedyPolicyEngine {
    model: PolicyModel,
}

impl GreedyPolicyEngine {
    pub fn new(model: PolicyModel) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &PolicyModel {
        &self.model
    }

    /// Raw policy scores for the 26 slots
    pub fn scores(&self, input: &GameInput) -> Result<Vec<f64>> {
        let planes = encode_planes(input).to_device(self.model.device());
        let logits = tch::no_grad(|| self.model.forward(&planes, false))?;
        let flat: Tensor = logits.to_kind(Kind::Double).view([-1]).to_device(tch::Device::Cpu);
        Ok(Vec::<f64>::try_from(&flat)?)
    }
}

impl MoveEngine for GreedyPolicyEngine {
    fn select_move(&self, input: &GameInput) -> Result<Move> {
        let scores = self.scores(input)?;
        let empty_points = (0..PASS_INDEX as usize).filter(|&idx| {
            input.current.get(idx / SIZE, idx % SIZE) == Stone::Empty
        });

        let best = empty_points
            .chain(std::iter::once(PASS_INDEX as usize))
            .max_by(|&a, &b| scores[a].total_cmp(&scores[b]))
            .unwrap_or(PASS_INDEX as usize);
        let mv = Move::from_policy_index(best)?;
        log::info!("🎯 Greedy choice {} (score {:.3})", mv, scores[best]);
        Ok(mv)
    }
}
