use std::ops::Index;

use crate::{Error, Result};

/// Running sums over a fixed number of metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct Accumulator {
    data: Vec<f64>,
}

impl Accumulator {
    pub fn new(n: usize) -> Self {
        Self { data: vec![0.0; n] }
    }

    /// Element-wise add. Nothing is added when the arity is wrong.
    pub fn add(&mut self, values: &[f64]) -> Result<()> {
        if values.len() != self.data.len() {
            return Err(Error::ArityMismatch {
                expected: self.data.len(),
                actual: values.len(),
            });
        }
        for (slot, value) in self.data.iter_mut().zip(values) {
            *slot += value;
        }
        Ok(())
    }

    /// Fold another accumulator's sums into this one
    pub fn merge(&mut self, other: &Accumulator) -> Result<()> {
        self.add(&other.data)
    }

    pub fn reset(&mut self) {
        self.data.iter_mut().for_each(|slot| *slot = 0.0);
    }

    pub fn get(&self, idx: usize) -> Option<f64> {
        self.data.get(idx).copied()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.data
    }
}

impl Index<usize> for Accumulator {
    type Output = f64;

    fn index(&self, idx: usize) -> &f64 {
        &self.data[idx]
    }
}
