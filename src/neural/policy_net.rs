use tch::{nn, Tensor};

use crate::neural::res_net_block::{ResidualBlock, ResidualBlockConfig};
use crate::{Error, Result};

pub const BOARD_SIZE: i64 = 5;
pub const INPUT_PLANES: i64 = 5;
/// One slot per intersection plus pass
pub const POLICY_SIZE: i64 = BOARD_SIZE * BOARD_SIZE + 1;
pub const PASS_INDEX: i64 = BOARD_SIZE * BOARD_SIZE;

const STEM_CHANNELS: i64 = 64;
const BLOCK_CHANNELS: &[i64] = &[64, 64, 1];
const HIDDEN_UNITS: i64 = 128;

/// Residual policy tower: stem conv → 3 residual blocks → flatten → 2-layer head.
#[derive(Debug)]
pub struct PolicyNet {
    stem: nn::Conv2D,
    res_blocks: Vec<ResidualBlock>,
    fc1: nn::Linear,
    policy_head: nn::Linear,
}

impl PolicyNet {
    pub fn new(p: &nn::Path) -> Result<Self> {
        let stem = nn::conv2d(
            p / "stem",
            INPUT_PLANES,
            STEM_CHANNELS,
            3,
            nn::ConvConfig {
                padding: 1,
                ..Default::default()
            },
        );

        let mut res_blocks = Vec::with_capacity(BLOCK_CHANNELS.len());
        let mut in_channels = STEM_CHANNELS;
        for (idx, &out_channels) in BLOCK_CHANNELS.iter().enumerate() {
            res_blocks.push(ResidualBlock::new(
                &(p / format!("block_{idx}")),
                in_channels,
                out_channels,
                ResidualBlockConfig::default(),
            )?);
            in_channels = out_channels;
        }

        // Stride 1 everywhere: the tower keeps the 5×5 resolution
        let flatten_size = in_channels * BOARD_SIZE * BOARD_SIZE;
        log::debug!(
            "PolicyNet flatten_size: {} (channels={}, board={}x{})",
            flatten_size,
            in_channels,
            BOARD_SIZE,
            BOARD_SIZE
        );
        let fc1 = nn::linear(p / "fc1", flatten_size, HIDDEN_UNITS, Default::default());
        let policy_head = nn::linear(p / "policy_head", HIDDEN_UNITS, POLICY_SIZE, Default::default());

        Ok(Self {
            stem,
            res_blocks,
            fc1,
            policy_head,
        })
    }

    pub fn res_blocks(&self) -> &[ResidualBlock] {
        &self.res_blocks
    }

    /// Raw move scores `[N, 26]`. A single `[5, 5, 5]` board is batched to N = 1.
    pub fn forward_checked(&self, x: &Tensor, train: bool) -> Result<Tensor> {
        let x = match x.size().as_slice() {
            [INPUT_PLANES, BOARD_SIZE, BOARD_SIZE] => x.unsqueeze(0),
            [_, INPUT_PLANES, BOARD_SIZE, BOARD_SIZE] => x.shallow_clone(),
            _ => {
                return Err(Error::ShapeMismatch {
                    context: "PolicyNet input",
                    expected: format!("[N, {INPUT_PLANES}, {BOARD_SIZE}, {BOARD_SIZE}]"),
                    actual: x.size(),
                })
            }
        };

        let mut h = x.apply(&self.stem).relu();
        for block in &self.res_blocks {
            h = block.forward_unchecked(&h, train);
        }

        Ok(h
            .flatten(1, -1)
            .apply(&self.fc1)
            .relu()
            .apply(&self.policy_head))
    }
}

impl nn::ModuleT for PolicyNet {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        match self.forward_checked(xs, train) {
            Ok(out) => out,
            Err(e) => panic!("{e}"),
        }
    }
}

/// Xavier-uniform conv/linear weights, zero biases. Normalization scales stay at 1.
pub fn initialize_weights(vs: &nn::VarStore) {
    // Sorted so a seeded generator always fills the same tensors in the same order
    let mut variables: Vec<(String, Tensor)> = vs.variables().into_iter().collect();
    variables.sort_by(|a, b| a.0.cmp(&b.0));

    for (name, mut param) in variables {
        let size = param.size();

        if size.len() == 4 {
            let fan_in = (size[1] * size[2] * size[3]) as f64;
            let fan_out = (size[0] * size[2] * size[3]) as f64;
            let bound = (6.0 / (fan_in + fan_out)).sqrt();
            tch::no_grad(|| {
                let _ = param.uniform_(-bound, bound);
            });
        } else if size.len() == 2 {
            let fan_in = size[1] as f64;
            let fan_out = size[0] as f64;
            let bound = (6.0 / (fan_in + fan_out)).sqrt();
            tch::no_grad(|| {
                let _ = param.uniform_(-bound, bound);
            });
        } else if size.len() == 1 && name.ends_with("bias") {
            tch::no_grad(|| {
                let _ = param.zero_();
            });
        }
    }
}
