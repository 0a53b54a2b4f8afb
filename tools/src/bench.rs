use crate::args::EnvArgs;
use chessenv::BatchEnvironment;
use clap::Args;
use indicatif::{HumanCount, ProgressBar, ProgressStyle};
use std::error::Error;
use std::time::Instant;

#[derive(Args)]
pub struct BenchCommand {
    #[clap(flatten)]
    env: EnvArgs,

    /// Number of batch steps
    #[arg(long, default_value = "1000")]
    steps: u64,

    /// Worker threads, all cores if not given
    #[arg(long)]
    threads: Option<usize>,
}

pub fn bench(cmd: BenchCommand) -> Result<(), Box<dyn Error>> {
    if let Some(threads) = cmd.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()?;
    }

    let mut env = BatchEnvironment::new(cmd.env.config())?;
    env.reset(cmd.env.slots)?;

    println!("Slots: {}", cmd.env.slots);
    println!("Threads: {}", rayon::current_num_threads());

    let bar = ProgressBar::new(cmd.steps).with_style(
        ProgressStyle::default_bar()
            .template("{bar:40.cyan/blue} [Elapsed {elapsed_precise}] [Steps {human_pos}/{human_len} @ {per_sec}] {msg}")?,
    );

    let start = Instant::now();
    let mut games = 0;

    for _ in 0..cmd.steps {
        let dones: Vec<bool> = env.step_random().iter().map(|o| o.done).collect();
        games += dones.iter().filter(|&&done| done).count() as u64;
        env.reset_subset(&dones)?;

        bar.inc(1);
        bar.set_message(format!("[Games {}]", HumanCount(games)));
    }
    bar.finish();

    let elapsed = start.elapsed().as_secs_f64();
    let moves = cmd.steps * cmd.env.slots as u64;
    println!(
        "Done. {} moves in {:.2}s ({} moves/s), {} finished games",
        HumanCount(moves),
        elapsed,
        HumanCount((moves as f64 / elapsed) as u64),
        HumanCount(games)
    );

    Ok(())
}
