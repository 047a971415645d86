use std::path::Path;

use rand::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tch::{Device, Kind, Tensor};

use crate::neural::{BOARD_SIZE, INPUT_PLANES, POLICY_SIZE};
use crate::training::evaluator::BatchInput;
use crate::{Error, Result};

/// Board encodings `[N, 5, 5, 5]` paired with per-slot labels `[N, 26]`, kept in memory.
#[derive(Debug)]
pub struct TensorDataset {
    inputs: Tensor,
    labels: Tensor,
}

impl TensorDataset {
    pub fn new(inputs: Tensor, labels: Tensor) -> Result<Self> {
        let input_size = inputs.size();
        if input_size.len() != 4 || input_size[1..] != [INPUT_PLANES, BOARD_SIZE, BOARD_SIZE] {
            return Err(Error::ShapeMismatch {
                context: "dataset inputs",
                expected: format!("[N, {INPUT_PLANES}, {BOARD_SIZE}, {BOARD_SIZE}]"),
                actual: input_size,
            });
        }
        let label_size = labels.size();
        if label_size != [input_size[0], POLICY_SIZE] {
            return Err(Error::ShapeMismatch {
                context: "dataset labels",
                expected: format!("[{}, {POLICY_SIZE}]", input_size[0]),
                actual: label_size,
            });
        }
        Ok(Self {
            inputs: inputs.to_kind(Kind::Float),
            labels: labels.to_kind(Kind::Float),
        })
    }

    /// Reads the `inputs` and `labels` arrays of an `.npz` archive
    pub fn from_npz(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let arrays = Tensor::read_npz(path)?;
        let find = |name: &str| {
            arrays
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, t)| t.shallow_clone())
                .ok_or_else(|| Error::Parse(format!("{} has no `{name}` array", path.display())))
        };
        let dataset = Self::new(find("inputs")?, find("labels")?)?;
        log::info!("📂 Loaded {} positions from {}", dataset.len(), path.display());
        Ok(dataset)
    }

    pub fn len(&self) -> usize {
        self.inputs.size()[0] as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_device(&self, device: Device) -> TensorDataset {
        TensorDataset {
            inputs: self.inputs.to_device(device),
            labels: self.labels.to_device(device),
        }
    }

    pub fn inputs(&self) -> &Tensor {
        &self.inputs
    }

    pub fn labels(&self) -> &Tensor {
        &self.labels
    }

    /// Shuffles with `seed`, then keeps the last `valid_fraction` of rows apart.
    pub fn split(&self, valid_fraction: f64, seed: u64) -> Result<(TensorDataset, TensorDataset)> {
        if !(0.0..1.0).contains(&valid_fraction) {
            return Err(Error::InvalidConfig(format!(
                "validation fraction must lie in [0, 1), got {valid_fraction}"
            )));
        }
        let n = self.len();
        let mut indices: Vec<i64> = (0..n as i64).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        indices.shuffle(&mut rng);

        let split_idx = ((1.0 - valid_fraction) * n as f64).round() as usize;
        let (train_idx, valid_idx) = indices.split_at(split_idx);
        Ok((self.select(train_idx), self.select(valid_idx)))
    }

    /// Mini-batches in order, or shuffled when an rng is given
    pub fn batches(&self, batch_size: usize, rng: Option<&mut StdRng>) -> Result<Vec<(BatchInput, Tensor)>> {
        if batch_size == 0 {
            return Err(Error::InvalidConfig("batch size must be positive".to_string()));
        }
        let mut indices: Vec<i64> = (0..self.len() as i64).collect();
        if let Some(rng) = rng {
            indices.shuffle(rng);
        }
        Ok(indices
            .chunks(batch_size)
            .map(|chunk| {
                let idx = Tensor::from_slice(chunk).to_device(self.inputs.device());
                (
                    BatchInput::Single(self.inputs.index_select(0, &idx)),
                    self.labels.index_select(0, &idx),
                )
            })
            .collect())
    }

    fn select(&self, indices: &[i64]) -> TensorDataset {
        let idx = Tensor::from_slice(indices).to_device(self.inputs.device());
        TensorDataset {
            inputs: self.inputs.index_select(0, &idx),
            labels: self.labels.index_select(0, &idx),
        }
    }
}
