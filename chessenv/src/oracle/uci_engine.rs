use crate::moves::SquareMove;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use thiserror::Error;

/// Score of a position, given by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    /// Centipawn
    Cp(i32),

    /// Mate/Mated in n
    Mate(i32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineResult {
    pub best_move: SquareMove,
    /// Last score reported before the best move, if any
    pub score: Option<Score>,
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("engine i/o failed: {0}")]
    Io(#[from] io::Error),

    #[error("engine closed its output")]
    Closed,

    #[error("engine answered with an unusable move {0:?}")]
    BadMove(String),
}

/// A running UCI engine process, answering one search at a time
/// https://www.wbec-ridderkerk.nl/html/UCIProtocol.html
pub struct UciWorker {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl UciWorker {
    pub fn spawn(program: &Path, args: &[String]) -> Result<Self, WorkerError> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        // both were requested as piped above
        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(WorkerError::Closed);
        };

        Ok(UciWorker {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }

    /// Process id of the engine
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Searches the position to the given depth and waits for the best move
    pub fn evaluate(&mut self, fen: &str, depth: u32) -> Result<EngineResult, WorkerError> {
        // start search
        writeln!(self.stdin, "position fen {}", fen)?;
        writeln!(self.stdin, "go depth {}", depth)?;
        self.stdin.flush()?;

        // read until the search is over, keeping the last score seen
        let mut line = String::new();
        let mut score = None;

        loop {
            line.clear();
            if self.stdout.read_line(&mut line)? == 0 {
                return Err(WorkerError::Closed);
            }

            let mut parts = line.split_whitespace();
            match parts.next() {
                Some("info") => {
                    if let Some(s) = parse_score(parts) {
                        score = Some(s);
                    }
                }
                Some("bestmove") => {
                    let text = parts.next().unwrap_or_default();
                    let best_move = match text {
                        "(none)" | "0000" => None,
                        _ => text.parse::<SquareMove>().ok(),
                    }
                    .ok_or_else(|| WorkerError::BadMove(text.to_string()))?;

                    return Ok(EngineResult { best_move, score });
                }
                _ => {}
            }
        }
    }
}

impl Drop for UciWorker {
    fn drop(&mut self) {
        // the process may already be gone
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Score of an `info` line, `None` if the line carries no (readable) score
fn parse_score<'a>(mut parts: impl Iterator<Item = &'a str>) -> Option<Score> {
    parts.position(|p| p == "score")?;

    let kind = parts.next()?;
    let value = parts.next()?.parse::<i32>().ok()?;

    match kind {
        "cp" => Some(Score::Cp(value)),
        "mate" => Some(Score::Mate(value)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sh(script: &str) -> UciWorker {
        UciWorker::spawn(
            &PathBuf::from("sh"),
            &["-c".to_string(), script.to_string()],
        )
        .unwrap()
    }

    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    #[test]
    fn scores() {
        let score = |line: &str| parse_score(line.split_whitespace());

        assert_eq!(
            score("info depth 12 seldepth 18 multipv 1 score cp 31 nodes 1000 pv e2e4"),
            Some(Score::Cp(31))
        );
        assert_eq!(score("info depth 5 score mate -3"), Some(Score::Mate(-3)));
        assert_eq!(score("info string hello"), None);
        assert_eq!(score("info depth 3 score cp"), None);
    }

    #[test]
    fn reads_until_best_move() {
        let mut worker = sh(r#"while read -r line; do
            case "$line" in
                go*) echo "info depth 1 score cp 20"; echo "info depth 2 score mate 4"; echo "bestmove g1f3 ponder g8f6";;
            esac
        done"#);

        let result = worker.evaluate(START, 2).unwrap();
        assert_eq!(result.best_move, "g1f3".parse().unwrap());
        assert_eq!(result.score, Some(Score::Mate(4)));

        // the worker keeps answering
        assert!(worker.evaluate(START, 2).is_ok());
    }

    #[test]
    fn closed_output() {
        let mut worker = sh("read -r line; exit 0");
        assert!(worker.evaluate(START, 1).is_err());
    }

    #[test]
    fn null_move_is_rejected() {
        let mut worker = sh(r#"while read -r line; do
            case "$line" in
                go*) echo "bestmove (none)";;
            esac
        done"#);

        assert!(matches!(
            worker.evaluate(START, 1),
            Err(WorkerError::BadMove(text)) if text == "(none)"
        ));
    }
}
