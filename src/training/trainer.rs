use std::fs::File;
use std::path::Path;

use rand::prelude::*;
use rand::rngs::StdRng;
use serde::Serialize;
use tch::{nn, Device, Reduction, Tensor};

use crate::neural::PolicyModel;
use crate::training::accumulator::Accumulator;
use crate::training::animator::{Animator, AnimatorConfig, PlotSink};
use crate::training::dataset::TensorDataset;
use crate::training::evaluator::{accuracy, evaluate_accuracy};
use crate::training::timer::Timer;
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub weight_decay: f64,
    /// Seeds the batch shuffling
    pub seed: u64,
    pub device: Device,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 10,
            batch_size: 64,
            learning_rate: 1e-3,
            weight_decay: 0.0,
            seed: 42,
            device: Device::cuda_if_available(),
        }
    }
}

impl TrainConfig {
    fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(Error::InvalidConfig("epochs must be positive".to_string()));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch size must be positive".to_string()));
        }
        if self.learning_rate.is_nan() || self.learning_rate <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "learning rate must be positive, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EpochStats {
    pub epoch: usize,
    /// Mean binary cross-entropy per sample
    pub train_loss: f64,
    /// Fraction of correct output slots
    pub train_acc: f64,
    pub valid_acc: Option<f64>,
    pub seconds: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TrainingHistory {
    /// RFC 3339 start time of the run
    pub started_at: String,
    pub epochs: Vec<EpochStats>,
    pub total_seconds: f64,
}

impl TrainingHistory {
    pub fn last(&self) -> Option<&EpochStats> {
        self.epochs.last()
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path.as_ref())?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

/// Legend used by `fit` for its three curves
pub fn training_animator_config(epochs: usize) -> AnimatorConfig {
    AnimatorConfig {
        xlabel: Some("epoch".to_string()),
        title: Some("policy network training".to_string()),
        xlim: Some((0.0, epochs.max(1) as f64)),
        ..AnimatorConfig::with_legend(["train loss", "train acc", "valid acc"])
    }
}

/// One pass over `dataset` in training mode.
///
/// Returns the partial `EpochStats` with `epoch`, `valid_acc` and `seconds` left for the caller.
pub fn train_epoch(
    model: &PolicyModel,
    optimizer: &mut nn::Optimizer,
    dataset: &TensorDataset,
    config: &TrainConfig,
    rng: &mut StdRng,
) -> Result<EpochStats> {
    if dataset.is_empty() {
        return Err(Error::EmptyDataset);
    }
    let device = model.device();
    // Loss summed over samples, correct slots, total slots, samples
    let mut metric = Accumulator::new(4);

    for (x, y) in dataset.batches(config.batch_size, Some(rng))? {
        let x = x.to_device(device).into_tensor()?;
        let y = y.to_device(device);
        let logits = model.forward(&x, true)?;
        let loss = logits.binary_cross_entropy_with_logits::<Tensor>(&y, None, None, Reduction::Mean);
        optimizer.backward_step(&loss);

        let samples = y.size()[0] as f64;
        let correct = tch::no_grad(|| accuracy(&logits, &y))?;
        let batch_loss = loss.double_value(&[]);
        log::debug!("batch loss {:.4}, {} / {} slots correct", batch_loss, correct, y.numel());
        metric.add(&[batch_loss * samples, correct, y.numel() as f64, samples])?;
    }

    let train_loss = metric[0] / metric[3];
    if !train_loss.is_finite() {
        log::warn!("⚠️ Non-finite training loss {}", train_loss);
    }
    Ok(EpochStats {
        epoch: 0,
        train_loss,
        train_acc: metric[1] / metric[2],
        valid_acc: None,
        seconds: 0.0,
    })
}

/// Trains for `config.epochs` epochs, feeding `(loss, train acc, valid acc)` to the animator.
///
/// An empty or missing validation set leaves the third curve blank.
pub fn fit<S: PlotSink>(
    model: &PolicyModel,
    train: &TensorDataset,
    valid: Option<&TensorDataset>,
    config: &TrainConfig,
    animator: &mut Animator<S>,
    timer: &mut Timer,
) -> Result<TrainingHistory> {
    config.validate()?;
    if train.is_empty() {
        return Err(Error::EmptyDataset);
    }
    let valid = valid.filter(|v| !v.is_empty());
    if valid.is_none() {
        log::warn!("⚠️ No validation data, validation accuracy will not be tracked");
    }

    // Intervals the caller recorded before this run are not ours
    let first_interval = timer.len();
    let mut optimizer = model.adam(config.learning_rate, config.weight_decay)?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut history = TrainingHistory {
        started_at: chrono::Utc::now().to_rfc3339(),
        ..TrainingHistory::default()
    };
    log::info!(
        "🚀 Training on {} positions for {} epochs (batch {}, lr {})",
        train.len(),
        config.epochs,
        config.batch_size,
        config.learning_rate
    );

    for epoch in 1..=config.epochs {
        timer.start();
        let mut stats = train_epoch(model, &mut optimizer, train, config, &mut rng)?;
        stats.valid_acc = match valid {
            Some(valid) => Some(evaluate_accuracy(
                model,
                valid.batches(config.batch_size, None)?,
                Some(model.device()),
            )?),
            None => None,
        };
        stats.seconds = timer.stop()?;
        stats.epoch = epoch;

        animator.add(
            epoch as f64,
            &[Some(stats.train_loss), Some(stats.train_acc), stats.valid_acc],
        )?;
        log::info!(
            "📊 Epoch {}/{}: loss {:.4}, train acc {:.3}, valid acc {}, {:.1}s",
            epoch,
            config.epochs,
            stats.train_loss,
            stats.train_acc,
            stats.valid_acc.map_or("n/a".to_string(), |acc| format!("{acc:.3}")),
            stats.seconds
        );
        history.epochs.push(stats);
    }

    let run_seconds: f64 = timer.times()[first_interval..].iter().sum();
    history.total_seconds = run_seconds;
    let throughput = (train.len() * config.epochs) as f64 / run_seconds.max(f64::EPSILON);
    log::info!(
        "⏱️ {:.2}s per epoch, {:.0} positions/s",
        run_seconds / config.epochs as f64,
        throughput
    );
    Ok(history)
}
