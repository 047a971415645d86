//! Referee-facing player: reads `input.txt`, picks a move, writes `output.txt`.
//!
//! Usage: cargo run --release --bin my_player -- --weights data/policy.ot

use std::path::PathBuf;

use clap::Parser;

use go_policy_net::engine::{GreedyPolicyEngine, MoveEngine};
use go_policy_net::game::{read_input, write_output};
use go_policy_net::logging::setup_logging;
use go_policy_net::neural::PolicyModel;

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum EngineChoice {
    /// Highest policy score among empty points and pass
    Greedy,
    /// Native search library (requires the `native-engine` feature)
    Native,
}

#[derive(Parser, Debug)]
#[command(name = "my_player", version, about = "Play one 5x5 Go move for the referee")]
struct Args {
    /// Board state written by the referee
    #[arg(long, default_value = "input.txt")]
    input: PathBuf,

    /// Where the chosen move is written
    #[arg(long, default_value = "output.txt")]
    output: PathBuf,

    /// Trained weights (VarStore file for greedy, exported model for native)
    #[arg(long, default_value = "data/policy.ot")]
    weights: PathBuf,

    #[arg(long, value_enum, default_value = "greedy")]
    engine: EngineChoice,

    /// Search budget in seconds for the native engine
    #[arg(long, default_value_t = 12)]
    time_limit: u32,

    /// Log to rotating files in this directory instead of stderr
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn build_engine(args: &Args) -> Result<Box<dyn MoveEngine>, Box<dyn std::error::Error>> {
    match args.engine {
        EngineChoice::Greedy => {
            let model = PolicyModel::load(tch::Device::Cpu, &args.weights)?;
            Ok(Box::new(GreedyPolicyEngine::new(model)))
        }
        #[cfg(feature = "native-engine")]
        EngineChoice::Native => {
            let log_dir = args.log_dir.clone().unwrap_or_else(|| PathBuf::from("data"));
            Ok(Box::new(go_policy_net::engine::NativeEngine::new(
                &args.weights,
                log_dir,
                args.time_limit,
            )?))
        }
        #[cfg(not(feature = "native-engine"))]
        EngineChoice::Native => Err("this binary was built without the `native-engine` feature".into()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let _logger = setup_logging(args.log_dir.as_deref())?;

    let input = read_input(&args.input)?;
    log::info!(
        "🎮 {:?} to move, {} stones on the board",
        input.piece,
        input.current.stone_count()
    );

    let engine = build_engine(&args)?;
    let mv = engine.select_move(&input)?;
    write_output(&args.output, &mv)?;
    Ok(())
}
