//! Supervised training of the policy network from an `.npz` archive of positions.
//!
//! Usage: cargo run --release --bin train -- --data data/positions.npz --epochs 20

use std::path::PathBuf;

use clap::Parser;
use tch::Device;

use go_policy_net::logging::setup_logging;
use go_policy_net::neural::PolicyModel;
use go_policy_net::training::{
    fit, training_animator_config, Animator, LogSink, PlotSink, TensorDataset, Timer, TrainConfig,
};

#[derive(Parser, Debug)]
#[command(name = "train", version, about = "Train the 5x5 Go policy network")]
struct Args {
    /// Archive holding `inputs` [N,5,5,5] and `labels` [N,26]
    #[arg(long)]
    data: PathBuf,

    #[arg(long, default_value_t = 10)]
    epochs: usize,

    #[arg(long, default_value_t = 64)]
    batch_size: usize,

    #[arg(long, default_value_t = 0.001)]
    lr: f64,

    #[arg(long, default_value_t = 0.0)]
    weight_decay: f64,

    /// Share of positions held out for validation
    #[arg(long, default_value_t = 0.1)]
    val_split: f64,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Force CPU even when CUDA is available
    #[arg(long, default_value_t = false)]
    cpu: bool,

    #[arg(long, default_value = "model_weights/policy.ot")]
    save_path: PathBuf,

    /// Training curves as `series,x,y` rows
    #[arg(long)]
    curves_csv: Option<PathBuf>,

    /// Training curves rendered to SVG (requires the `plots` feature)
    #[arg(long)]
    curves_svg: Option<PathBuf>,

    /// Per-epoch statistics as JSON
    #[arg(long)]
    history: Option<PathBuf>,

    /// Log to rotating files in this directory instead of stderr
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn curve_sink(args: &Args) -> Box<dyn PlotSink> {
    match &args.curves_svg {
        #[cfg(feature = "plots")]
        Some(path) => Box::new(go_policy_net::training::SvgSink::new(path)),
        #[cfg(not(feature = "plots"))]
        Some(path) => {
            log::warn!("⚠️ Built without `plots`, not rendering {}", path.display());
            Box::new(LogSink)
        }
        None => Box::new(LogSink),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let _logger = setup_logging(args.log_dir.as_deref())?;

    let config = TrainConfig {
        epochs: args.epochs,
        batch_size: args.batch_size,
        learning_rate: args.lr,
        weight_decay: args.weight_decay,
        seed: args.seed,
        device: if args.cpu { Device::Cpu } else { Device::cuda_if_available() },
    };

    let dataset = TensorDataset::from_npz(&args.data)?.to_device(config.device);
    let (train, valid) = dataset.split(args.val_split, args.seed)?;
    log::info!("📂 Train: {} positions, validation: {}", train.len(), valid.len());

    let model = PolicyModel::seeded(config.device, args.seed as i64)?;
    let mut animator = Animator::new(training_animator_config(config.epochs), curve_sink(&args));
    let mut timer = Timer::new();

    let history = fit(&model, &train, Some(&valid), &config, &mut animator, &mut timer)?;
    if let Some(last) = history.last() {
        log::info!(
            "🏁 Final loss {:.4}, train acc {:.3}, valid acc {:?}",
            last.train_loss,
            last.train_acc,
            last.valid_acc
        );
    }

    model.save(&args.save_path)?;
    log::info!("💾 Saved weights to {}", args.save_path.display());
    if let Some(path) = &args.curves_csv {
        animator.write_csv(path)?;
    }
    if let Some(path) = &args.history {
        history.save_json(path)?;
    }
    Ok(())
}
