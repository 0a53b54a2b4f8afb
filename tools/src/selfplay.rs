use crate::args::{EngineArgs, EnvArgs};
use chessenv::{
    BatchEnvironment, EngineOpponent, EnginePool, EpisodeConfig, EpisodeRunner, Opponent,
    RandomOpponent,
};
use clap::{Args, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::seq::IteratorRandom;
use rand::SeedableRng;
use std::error::Error;

#[derive(Clone, Copy, ValueEnum)]
pub enum OpponentKind {
    Random,
    Engine,
}

#[derive(Args)]
pub struct SelfplayCommand {
    #[clap(flatten)]
    env: EnvArgs,

    /// Who answers the agent's moves
    #[arg(long, value_enum, default_value = "random")]
    opponent: OpponentKind,

    #[clap(flatten)]
    engine: EngineArgs,

    /// Number of rounds (agent move and reply) to play
    #[arg(long, default_value = "1000")]
    rounds: u64,

    /// Agent moves after which a game is called a draw
    #[arg(long, default_value = "100")]
    max_steps: u32,

    /// Reward of a game called a draw
    #[arg(long, default_value = "0")]
    draw_reward: f32,
}

#[derive(Default)]
struct Tally {
    games: u64,
    wins: u64,
    losses: u64,
    total_reward: f64,
}

pub fn selfplay(cmd: SelfplayCommand) -> Result<(), Box<dyn Error>> {
    let env = BatchEnvironment::new(cmd.env.config())?;
    let config = EpisodeConfig::default()
        .max_steps(cmd.max_steps)
        .draw_reward(cmd.draw_reward);

    let tally = match cmd.opponent {
        OpponentKind::Random => run(EpisodeRunner::new(env, RandomOpponent, config), &cmd)?,
        OpponentKind::Engine => {
            let pool = EnginePool::new(cmd.engine.config())?;
            run(EpisodeRunner::new(env, EngineOpponent::new(pool), config), &cmd)?
        }
    };

    println!(
        "Done. {} games, {} won, {} lost, {} drawn, mean reward {:.3}",
        tally.games,
        tally.wins,
        tally.losses,
        tally.games - tally.wins - tally.losses,
        tally.total_reward / tally.games.max(1) as f64
    );

    Ok(())
}

/// Plays uniformly random legal actions for the agent
fn run<O: Opponent>(
    mut runner: EpisodeRunner<O>,
    cmd: &SelfplayCommand,
) -> Result<Tally, Box<dyn Error>> {
    let mut rng = match cmd.env.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    runner.reset(cmd.env.slots)?;

    let bar = ProgressBar::new(cmd.rounds).with_style(
        ProgressStyle::default_bar()
            .template("{bar:40.cyan/blue} [Elapsed {elapsed_precise}] [Rounds {human_pos}/{human_len}] {msg}")?,
    );

    let mut tally = Tally::default();

    for _ in 0..cmd.rounds {
        let actions: Vec<u32> = runner
            .env()
            .legality_mask()
            .iter()
            .map(|mask| mask.ones().choose(&mut rng).unwrap_or(0) as u32)
            .collect();

        let step = runner.step_actions(&actions)?;

        for (&reward, &done) in step.rewards.iter().zip(&step.dones) {
            if !done {
                continue;
            }
            tally.games += 1;
            tally.total_reward += reward as f64;
            if reward > 0.0 {
                tally.wins += 1;
            } else if reward < 0.0 {
                tally.losses += 1;
            }
        }

        bar.inc(1);
        bar.set_message(format!("[Games {}]", tally.games));
    }
    bar.finish();

    Ok(tally)
}
