//! # Go Policy Network
//!
//! A small residual convolutional policy network for 5×5 Go, together with the
//! harness used to train and evaluate it.
//!
//! ## Features
//!
//! - **Neural**: `ConvBnAct` units, residual blocks and the 26-way policy network
//! - **Training**: metric accumulation, timing, live training curves, accuracy
//!   evaluation and a small supervised training loop
//! - **Game boundary**: referee file format, board plane encoding, move translation
//! - **Engine boundary**: the native search library and a greedy policy fallback
//!
//! ## Usage
//!
//! ```rust,no_run
//! use go_policy_net::{
//!     neural::PolicyModel,
//!     training::evaluator::{evaluate_accuracy, BatchInput},
//! };
//! use tch::{Device, Kind, Tensor};
//!
//! let model = PolicyModel::seeded(Device::Cpu, 42)?;
//! let boards = Tensor::rand([4, 5, 5, 5], (Kind::Float, Device::Cpu));
//! let labels = Tensor::zeros([4, 26], (Kind::Float, Device::Cpu));
//! let acc = evaluate_accuracy(&model, vec![(BatchInput::Single(boards), labels)], None)?;
//! println!("accuracy = {acc:.3}");
//! # Ok::<(), go_policy_net::Error>(())
//! ```

// ============================================================================
// PUBLIC API MODULES
// ============================================================================

/// Neural network layers and the policy model
pub mod neural;

/// Training and evaluation harness
pub mod training;

/// Board state, moves and the referee file format
pub mod game;

/// Move selection engines (native search library, greedy policy)
pub mod engine;

/// Logger setup shared by the binaries
pub mod logging;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

pub use game::{Board, GameInput, Move, Stone};
pub use neural::{PolicyModel, PolicyNet};
pub use training::{Accumulator, Animator, Timer};

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Main error type for the library
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Shape mismatch in {context}: expected {expected}, got {actual:?}")]
    ShapeMismatch {
        context: &'static str,
        expected: String,
        actual: Vec<i64>,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Expected {expected} values, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },

    #[error("Timer stopped without a matching start")]
    TimerNotStarted,

    #[error("No interval has been recorded")]
    EmptyHistory,

    #[error("Evaluation saw no labelled slots")]
    EmptyDataset,

    #[error("Invalid move index: {0}")]
    InvalidMove(i32),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Plot error: {0}")]
    Plot(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Torch error: {0}")]
    Torch(#[from] tch::TchError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;

// ============================================================================
// LIBRARY VERSION INFO
// ============================================================================

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Library description
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
