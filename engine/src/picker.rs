use crate::limits::SearchLimits;
use chessenv::oracle::Score;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use shakmaty::{Board, Chess, Color, Move, Position, Role};

const PIECE_VALUES: [(Role, i32); 5] = [
    (Role::Pawn, 100),
    (Role::Knight, 300),
    (Role::Bishop, 300),
    (Role::Rook, 500),
    (Role::Queen, 900),
];

/// Chooses moves without searching.
/// At depth 1 any legal move is played, deeper it takes the move with the best
/// material balance after it, preferring mates.
pub struct MovePicker {
    rng: StdRng,
    /// Always take the first of the candidates instead of a random one
    deterministic: bool,
}

impl MovePicker {
    pub fn new(seed: Option<u64>, deterministic: bool) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        MovePicker { rng, deterministic }
    }

    /// Best move and its score from the side to move, `None` if there are no legal moves
    pub fn pick(&mut self, position: &Chess, limits: &SearchLimits) -> Option<(Move, Score)> {
        let legal = position.legal_moves();
        if legal.is_empty() {
            return None;
        }

        let candidates: Vec<(Move, Score)> = if limits.depth <= 1 {
            let balance = Score::Cp(material_balance(position.board(), position.turn()));
            legal.iter().map(|m| (m.clone(), balance)).collect()
        } else {
            let scored: Vec<(Move, Score)> =
                legal.iter().map(|m| (m.clone(), score_after(position, m))).collect();
            let best = scored.iter().map(|(_, s)| rank(*s)).max()?;
            scored.into_iter().filter(|(_, s)| rank(*s) == best).collect()
        };

        if self.deterministic {
            candidates.into_iter().next()
        } else {
            candidates.choose(&mut self.rng).cloned()
        }
    }
}

/// Ordering key of a score, any mate above any material balance
fn rank(score: Score) -> i32 {
    match score {
        Score::Mate(_) => i32::MAX,
        Score::Cp(cp) => cp,
    }
}

fn score_after(position: &Chess, m: &Move) -> Score {
    let us = position.turn();
    let mut after = position.clone();
    after.play_unchecked(m);

    if after.is_checkmate() {
        Score::Mate(1)
    } else {
        Score::Cp(material_balance(after.board(), us))
    }
}

/// Material of `color` minus the material of the other side, in centipawns
fn material_balance(board: &Board, color: Color) -> i32 {
    let material = |color: Color| -> i32 {
        PIECE_VALUES
            .iter()
            .map(|&(role, value)| {
                (board.by_color(color) & board.by_role(role)).count() as i32 * value
            })
            .sum()
    };

    material(color) - material(color.other())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chessenv::encoding::from_fen;
    use chessenv::SquareMove;

    fn pick(fen: &str, depth: u32) -> Option<(SquareMove, Score)> {
        let mut picker = MovePicker::new(Some(1), true);
        picker
            .pick(&from_fen(fen).unwrap(), &SearchLimits { depth })
            .map(|(m, s)| (SquareMove::from_move(&m), s))
    }

    #[test]
    fn takes_the_queen() {
        let (m, score) = pick("4k3/8/8/3q4/8/8/8/3RK3 w - - 0 1", 2).unwrap();
        assert_eq!(m, "d1d5".parse().unwrap());
        assert_eq!(score, Score::Cp(500));
    }

    #[test]
    fn prefers_mate() {
        let (m, score) = pick("6k1/5ppp/8/8/8/8/8/R3K3 w - - 0 1", 2).unwrap();
        assert_eq!(m, "a1a8".parse().unwrap());
        assert_eq!(score, Score::Mate(1));
    }

    #[test]
    fn shallow_plays_any_legal_move() {
        let (m, score) = pick("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1", 1).unwrap();
        assert!(chessenv::moves::legal_square_moves(&Chess::default()).contains(&m));
        assert_eq!(score, Score::Cp(0));
    }

    #[test]
    fn no_move_when_mated() {
        assert!(pick("R5k1/5ppp/8/8/8/8/8/4K3 b - - 0 1", 3).is_none());
    }
}
