use crate::args::{EngineArgs, EnvArgs};
use chessenv::action;
use chessenv::{BatchEnvironment, EnginePool, PoolError, SquareMove};
use clap::Args;
use log::warn;
use std::error::Error;
use std::time::Instant;

#[derive(Args)]
pub struct OracleCommand {
    #[clap(flatten)]
    env: EnvArgs,

    #[clap(flatten)]
    engine: EngineArgs,

    /// Fewest random moves played from the start position
    #[arg(long, default_value = "4")]
    min_ply: usize,

    /// Most random moves played from the start position
    #[arg(long, default_value = "40")]
    max_ply: usize,
}

pub fn oracle(cmd: OracleCommand) -> Result<(), Box<dyn Error>> {
    let mut env = BatchEnvironment::new(cmd.env.config())?;
    env.reset(cmd.env.slots)?;
    env.randomize_subset(&vec![true; cmd.env.slots], cmd.min_ply, cmd.max_ply)?;

    let pool = EnginePool::new(cmd.engine.config())?;
    println!("Engine: {}", cmd.engine.engine.display());
    println!("Workers: {}, depth {}", pool.workers(), pool.depth());

    let start = Instant::now();
    let positions = env.positions();
    let answers = pool.query_batch(&positions);
    let elapsed = start.elapsed();

    let failed = print_answers(&env.fens(), answers)?;

    println!(
        "Done. {} positions in {:.2?}, {} without an answer",
        positions.len(),
        elapsed,
        failed
    );

    Ok(())
}

/// Prints `fen move action` for every answer, logs the failed ones and returns how many failed
fn print_answers(
    fens: &[String],
    answers: Vec<Result<SquareMove, PoolError>>,
) -> Result<usize, Box<dyn Error>> {
    let mut failed = 0;
    for (fen, answer) in fens.iter().zip(answers) {
        match answer {
            Ok(m) => println!("{} {} {}", fen, m, action::encode(&m)?),
            Err(err) => {
                failed += 1;
                warn!("no answer for {}: {}", fen, err);
            }
        }
    }
    Ok(failed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_answers_are_counted() {
        let fens = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let answers = vec![
            Ok("e2e4".parse().unwrap()),
            Err(PoolError::BadMove {
                index: 1,
                text: "(none)".to_string(),
            }),
            Err(PoolError::EngineUnavailable {
                index: 2,
                reason: "gone".to_string(),
            }),
        ];

        assert_eq!(print_answers(&fens, answers).unwrap(), 2);
    }

    #[test]
    fn unencodable_answer_is_an_error() {
        let fens = vec!["a".to_string()];
        assert!(print_answers(&fens, vec![Ok("a1b4".parse().unwrap())]).is_err());
    }
}
