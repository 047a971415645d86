use tch::{Device, Kind, Tensor};

use crate::neural::PolicyModel;
use crate::training::accumulator::Accumulator;
use crate::{Error, Result};

/// Anything that can score a batch in evaluation mode
pub trait Evaluate {
    /// Device holding the model's parameters
    fn device(&self) -> Device;
    /// Forward pass with normalization statistics frozen
    fn predict(&self, xs: &Tensor) -> Result<Tensor>;
}

impl Evaluate for PolicyModel {
    fn device(&self) -> Device {
        PolicyModel::device(self)
    }

    fn predict(&self, xs: &Tensor) -> Result<Tensor> {
        self.forward(xs, false)
    }
}

/// Model input for one batch: a single tensor or several chunks of the batch
#[derive(Debug)]
pub enum BatchInput {
    Single(Tensor),
    Many(Vec<Tensor>),
}

impl BatchInput {
    /// Moves every element to `device` individually
    pub fn to_device(&self, device: Device) -> BatchInput {
        match self {
            BatchInput::Single(x) => BatchInput::Single(x.to_device(device)),
            BatchInput::Many(xs) => BatchInput::Many(xs.iter().map(|x| x.to_device(device)).collect()),
        }
    }

    /// One tensor for the forward pass; chunks are concatenated along the batch dimension
    pub fn into_tensor(self) -> Result<Tensor> {
        match self {
            BatchInput::Single(x) => Ok(x),
            BatchInput::Many(xs) if xs.is_empty() => Err(Error::ShapeMismatch {
                context: "BatchInput",
                expected: "at least one tensor".to_string(),
                actual: Vec::new(),
            }),
            BatchInput::Many(xs) => Ok(Tensor::cat(&xs, 0)),
        }
    }
}

impl From<Tensor> for BatchInput {
    fn from(x: Tensor) -> Self {
        BatchInput::Single(x)
    }
}

impl From<Vec<Tensor>> for BatchInput {
    fn from(xs: Vec<Tensor>) -> Self {
        BatchInput::Many(xs)
    }
}

/// Number of output slots whose thresholded sigmoid matches the label.
///
/// Every one of the 26 outputs is read as an independent binary indicator,
/// not as one categorical move choice.
pub fn accuracy(y_hat: &Tensor, y: &Tensor) -> Result<f64> {
    if y_hat.size() != y.size() {
        return Err(Error::ShapeMismatch {
            context: "accuracy labels",
            expected: format!("{:?}", y_hat.size()),
            actual: y.size(),
        });
    }
    let predicted = y_hat.sigmoid().gt(0.5).to_kind(y.kind());
    let cmp = predicted.eq_tensor(y);
    Ok(cmp.sum(Kind::Float).double_value(&[]))
}

/// Fraction of correctly predicted slots over a whole dataset.
///
/// When `device` is `None` the device of the model's parameters is used.
pub fn evaluate_accuracy<M, I>(net: &M, data_iter: I, device: Option<Device>) -> Result<f64>
where
    M: Evaluate + ?Sized,
    I: IntoIterator<Item = (BatchInput, Tensor)>,
{
    let device = device.unwrap_or_else(|| net.device());
    // Correct predictions, total predictions
    let mut metric = Accumulator::new(2);

    tch::no_grad(|| -> Result<()> {
        for (x, y) in data_iter {
            let x = x.to_device(device).into_tensor()?;
            let y = y.to_device(device);
            let y_hat = net.predict(&x)?;
            metric.add(&[accuracy(&y_hat, &y)?, y.numel() as f64])?;
        }
        Ok(())
    })?;

    if metric[1] == 0.0 {
        return Err(Error::EmptyDataset);
    }
    log::debug!("Evaluation: {} / {} slots correct", metric[0], metric[1]);
    Ok(metric[0] / metric[1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn cpu() -> (Kind, Device) {
        (Kind::Float, Device::Cpu)
    }

    #[test]
    fn test_accuracy_thresholds_at_half() {
        let scores = Tensor::from_slice(&[2.0f32, -1.0, 0.3, -0.2]).view([1, 4]);
        let labels = Tensor::from_slice(&[1.0f32, 0.0, 0.0, 0.0]).view([1, 4]);

        assert_eq!(accuracy(&scores, &labels).unwrap(), 3.0);
    }

    #[test]
    fn test_accuracy_casts_to_label_kind() {
        let scores = Tensor::from_slice(&[5.0f32, -5.0]).view([1, 2]);
        let labels = Tensor::from_slice(&[1i64, 1]).view([1, 2]);

        assert_eq!(accuracy(&scores, &labels).unwrap(), 1.0);
    }

    #[test]
    fn test_accuracy_bounds() {
        for _ in 0..5 {
            let scores = Tensor::randn([8, 26], cpu());
            let labels = Tensor::randint(2, [8, 26], cpu());
            let correct = accuracy(&scores, &labels).unwrap();
            assert!((0.0..=(8.0 * 26.0)).contains(&correct));
        }
    }

    #[test]
    fn test_accuracy_shape_mismatch() {
        let scores = Tensor::zeros([2, 26], cpu());
        let labels = Tensor::zeros([2, 25], cpu());
        assert_matches!(accuracy(&scores, &labels), Err(Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_own_predictions_are_fully_correct() {
        let model = PolicyModel::seeded(Device::Cpu, 3).unwrap();
        let boards = Tensor::rand([6, 5, 5, 5], cpu());
        let labels = tch::no_grad(|| model.predict(&boards).unwrap().sigmoid().gt(0.5).to_kind(Kind::Float));

        let acc = evaluate_accuracy(&model, vec![(BatchInput::from(boards), labels)], None).unwrap();
        assert_eq!(acc, 1.0);
    }

    #[test]
    fn test_many_input_batches_are_concatenated() {
        let model = PolicyModel::seeded(Device::Cpu, 4).unwrap();
        let a = Tensor::rand([2, 5, 5, 5], cpu());
        let b = Tensor::rand([3, 5, 5, 5], cpu());
        let joined = Tensor::cat(&[&a, &b], 0);
        let labels = tch::no_grad(|| model.predict(&joined).unwrap().sigmoid().gt(0.5).to_kind(Kind::Float));

        let acc = evaluate_accuracy(
            &model,
            vec![(BatchInput::from(vec![a, b]), labels)],
            Some(Device::Cpu),
        )
        .unwrap();
        assert_eq!(acc, 1.0);
    }

    #[test]
    fn test_empty_dataset_is_an_error() {
        let model = PolicyModel::seeded(Device::Cpu, 5).unwrap();
        let result = evaluate_accuracy(&model, Vec::<(BatchInput, Tensor)>::new(), None);
        assert_matches!(result, Err(Error::EmptyDataset));
    }

    #[test]
    fn test_evaluation_does_not_touch_running_stats() {
        let model = PolicyModel::seeded(Device::Cpu, 6).unwrap();
        let snapshot = |model: &PolicyModel| {
            let mut stats: Vec<(String, Tensor)> = model
                .var_store()
                .variables()
                .into_iter()
                .filter(|(name, _)| name.contains("running"))
                .map(|(name, t)| (name, t.copy()))
                .collect();
            stats.sort_by(|a, b| a.0.cmp(&b.0));
            stats
        };

        let before = snapshot(&model);
        let boards = Tensor::rand([4, 5, 5, 5], cpu()) * 3.0;
        let labels = Tensor::zeros([4, 26], cpu());
        evaluate_accuracy(&model, vec![(BatchInput::from(boards), labels)], None).unwrap();
        let after = snapshot(&model);

        assert!(!before.is_empty());
        for ((name, b), (_, a)) in before.iter().zip(&after) {
            assert!(b.equal(a), "{name} changed during evaluation");
        }
    }
}
