pub mod accumulator;
pub mod animator;
pub mod dataset;
pub mod evaluator;
pub mod timer;
pub mod trainer;

// Re-export key components for convenience
pub use accumulator::Accumulator;
#[cfg(feature = "plots")]
pub use animator::SvgSink;
pub use animator::{Animator, AnimatorConfig, LogSink, NullSink, PlotSink, RecordingSink};
pub use dataset::TensorDataset;
pub use evaluator::{accuracy, evaluate_accuracy, BatchInput, Evaluate};
pub use timer::Timer;
pub use trainer::{fit, train_epoch, training_animator_config, EpochStats, TrainConfig, TrainingHistory};
