use chessenv::{EngineConfig, EnvConfig, FailurePolicy, IllegalMovePolicy};
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Clone)]
pub struct EnvArgs {
    /// Number of games played in parallel
    #[arg(long, default_value = "64")]
    pub slots: usize,

    /// Seed for the random moves, random if not given
    #[arg(long)]
    pub seed: Option<u64>,

    /// Leave the position untouched on an illegal move instead of playing a placeholder
    #[arg(long, default_value = "false")]
    pub reject_illegal: bool,
}

impl EnvArgs {
    pub fn config(&self) -> EnvConfig {
        let mut config = EnvConfig::default().capacity(self.slots);
        if let Some(seed) = self.seed {
            config = config.seed(seed);
        }
        if self.reject_illegal {
            config = config.illegal_move(IllegalMovePolicy::Reject);
        }
        config
    }
}

#[derive(Args, Clone)]
pub struct EngineArgs {
    /// UCI engine executable
    #[arg(long, value_name = "path", default_value = "stockfish")]
    pub engine: PathBuf,

    /// Extra argument for the engine, may be repeated
    #[arg(long = "engine-arg", value_name = "arg")]
    pub engine_args: Vec<String>,

    /// Search depth
    #[arg(long, default_value = "1")]
    pub depth: u32,

    /// Number of engine processes
    #[arg(long, default_value = "1")]
    pub workers: usize,

    /// Answer with the first legal move when an engine breaks, instead of asking again
    #[arg(long, default_value = "false")]
    pub placeholder: bool,
}

impl EngineArgs {
    pub fn config(&self) -> EngineConfig {
        EngineConfig::default()
            .program(self.engine.clone())
            .args(self.engine_args.iter().cloned())
            .depth(self.depth)
            .workers(self.workers)
            .on_failure(if self.placeholder {
                FailurePolicy::Placeholder
            } else {
                FailurePolicy::Retry
            })
    }
}
