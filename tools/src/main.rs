mod args;
mod bench;
mod encode;
mod oracle;
mod selfplay;

use bench::{bench, BenchCommand};
use clap::{Parser, Subcommand};
use encode::{encode, EncodeCommand};
use oracle::{oracle, OracleCommand};
use selfplay::{selfplay, SelfplayCommand};
use std::error::Error;

#[derive(Parser)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Steps a batch of games with random moves and reports the throughput
    Bench(BenchCommand),
    /// Prints the tensor, the mirrored tensor and the legal action ids of a FEN
    Encode(EncodeCommand),
    /// Asks an engine pool for the best moves of randomized positions
    Oracle(OracleCommand),
    /// Plays a random agent against an opponent and reports the rewards
    Selfplay(SelfplayCommand),
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Cli::parse();

    match args.command {
        Commands::Bench(cmd) => bench(cmd),
        Commands::Encode(cmd) => encode(cmd),
        Commands::Oracle(cmd) => oracle(cmd),
        Commands::Selfplay(cmd) => selfplay(cmd),
    }
}
