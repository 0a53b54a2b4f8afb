mod limits;
mod picker;

use chessenv::encoding::from_fen;
use chessenv::oracle::Score;
use clap::Parser;
use limits::SearchLimits;
use log::debug;
use picker::MovePicker;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, Position};
use std::error::Error;
use std::io::{self, BufRead, Write};
use vampirc_uci::{parse_one, UciFen, UciMessage, UciMove as VampircMove};

/// Minimal UCI engine answering every search immediately
#[derive(Parser)]
struct Cli {
    /// Always play the first of the best moves instead of a random one
    #[arg(long)]
    deterministic: bool,

    /// Seed for the random choices
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Cli::parse();

    let mut picker = MovePicker::new(args.seed, args.deterministic);
    let mut position = Chess::default();

    let stdout = io::stdout();
    let mut out = stdout.lock();

    for line in io::stdin().lock().lines() {
        let line = line?;
        let msg: UciMessage = parse_one(line.trim());
        debug!("received {:?}", msg);

        match msg {
            UciMessage::IsReady => writeln!(out, "{}", UciMessage::ReadyOk)?,
            UciMessage::Quit => break,
            UciMessage::Uci => {
                writeln!(
                    out,
                    "{}",
                    UciMessage::Id {
                        name: Some("chessenv-engine".to_string()),
                        author: None
                    }
                )?;
                writeln!(out, "{}", UciMessage::UciOk)?;
            }
            UciMessage::UciNewGame => position = Chess::default(),
            UciMessage::Position {
                startpos,
                fen,
                moves,
            } => match set_position(startpos, fen, &moves) {
                Ok(new) => position = new,
                Err(reason) => writeln!(out, "info string ignoring position: {}", reason)?,
            },
            UciMessage::Go { search_control, .. } => {
                let limits = SearchLimits::from_uci(search_control);

                match picker.pick(&position, &limits) {
                    Some((best, score)) => {
                        let score = match score {
                            Score::Cp(cp) => format!("cp {}", cp),
                            Score::Mate(n) => format!("mate {}", n),
                        };
                        writeln!(out, "info depth {} score {}", limits.depth, score)?;
                        writeln!(out, "bestmove {}", best.to_uci(CastlingMode::Standard))?;
                    }
                    None => writeln!(out, "bestmove (none)")?,
                }
            }
            _ => {}
        }

        out.flush()?;
    }

    Ok(())
}

/// Position of a UCI `position` command, with its moves played
fn set_position(
    startpos: bool,
    fen: Option<UciFen>,
    moves: &[VampircMove],
) -> Result<Chess, String> {
    let mut position = match (startpos, fen) {
        (false, Some(fen)) => from_fen(&fen.0).map_err(|e| e.to_string())?,
        _ => Chess::default(),
    };

    for m in moves {
        let uci: UciMove = m
            .to_string()
            .parse()
            .map_err(|_| format!("bad move {}", m))?;
        let m = uci
            .to_move(&position)
            .map_err(|_| format!("illegal move {}", uci))?;
        position.play_unchecked(&m);
    }

    Ok(position)
}
