use crate::env::{IllegalMovePolicy, StepOutcome, MAX_RANDOMIZE_RETRIES};
use crate::moves::{legal_square_moves, SquareMove};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use shakmaty::{Chess, Move, MoveList, Position, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// The game goes on, the slot accepts moves
    Active,
    /// The last step ended the episode, the slot waits for a reset
    Terminal,
}

/// One independent game of the batch, with its own random stream
pub(crate) struct Slot {
    pub position: Chess,
    pub state: SlotState,
    rng: StdRng,
}

impl Slot {
    pub fn new(rng: StdRng) -> Self {
        Slot {
            position: Chess::default(),
            state: SlotState::Active,
            rng,
        }
    }

    pub fn reset(&mut self) {
        self.position = Chess::default();
        self.state = SlotState::Active;
    }

    pub fn set_position(&mut self, position: Chess) {
        self.position = position;
        self.state = SlotState::Active;
    }

    pub fn legal_moves(&self) -> Vec<SquareMove> {
        legal_square_moves(&self.position)
    }

    pub fn random_move(&mut self) -> Option<SquareMove> {
        let legal = self.position.legal_moves();
        legal.choose(&mut self.rng).map(SquareMove::from_move)
    }

    /// Plays one move. `None` stands for input that could not even be decoded into a move.
    pub fn step(&mut self, supplied: Option<&SquareMove>, policy: IllegalMovePolicy) -> StepOutcome {
        if self.state == SlotState::Terminal {
            return StepOutcome::STALE;
        }

        let legal = self.position.legal_moves();
        if legal.is_empty() {
            // loaded or left in a finished game, there is nothing to play
            self.state = SlotState::Terminal;
            return StepOutcome::STALE;
        }

        match supplied.and_then(|m| resolve(&legal, m)) {
            Some(m) => {
                self.position.play_unchecked(&m);

                if self.position.legal_moves().is_empty() {
                    // checkmate or stalemate
                    self.state = SlotState::Terminal;
                    StepOutcome::FINISHED
                } else {
                    StepOutcome::ONGOING
                }
            }
            None => {
                if policy == IllegalMovePolicy::Penalize {
                    self.position.play_unchecked(&legal[0]);
                }
                self.state = SlotState::Terminal;
                StepOutcome::ILLEGAL
            }
        }
    }

    /// Resets the slot and plays a random number of random moves in `min_ply..=max_ply`.
    /// Returns false if every attempt ran into a finished game, leaving the start position.
    pub fn randomize(&mut self, min_ply: usize, max_ply: usize) -> bool {
        self.randomize_from(&Chess::default(), min_ply, max_ply)
    }

    /// Same as `randomize`, starting every attempt from `start` instead of the start position
    pub(crate) fn randomize_from(&mut self, start: &Chess, min_ply: usize, max_ply: usize) -> bool {
        for _ in 0..MAX_RANDOMIZE_RETRIES {
            self.set_position(start.clone());

            let plies = self.rng.gen_range(min_ply..=max_ply);
            if self.play_random(plies) {
                return true;
            }
        }

        self.set_position(start.clone());
        false
    }

    /// Plays `plies` random moves, false if the game ended on the way
    fn play_random(&mut self, plies: usize) -> bool {
        for _ in 0..plies {
            let legal = self.position.legal_moves();
            match legal.choose(&mut self.rng) {
                Some(m) => self.position.play_unchecked(m),
                None => return false,
            }
        }

        !self.position.legal_moves().is_empty()
    }
}

/// Finds the legal move with the same squares as the supplied one.
/// The supplied promotion wins when it is legal, otherwise the queen is taken.
fn resolve(legal: &MoveList, supplied: &SquareMove) -> Option<Move> {
    let mut fallback = None;

    for m in legal {
        let candidate = SquareMove::from_move(m);
        if !candidate.same_squares(supplied) {
            continue;
        }

        if candidate.promotion == supplied.promotion {
            return Some(m.clone());
        }
        if fallback.is_none() || candidate.promotion == Some(Role::Queen) {
            fallback = Some(m.clone());
        }
    }

    fallback
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{from_fen, to_fen};
    use rand::SeedableRng;

    fn slot_at(fen: &str) -> Slot {
        let mut slot = Slot::new(StdRng::seed_from_u64(1));
        slot.set_position(from_fen(fen).unwrap());
        slot
    }

    #[test]
    fn promotion_defaults_to_queen() {
        let mut slot = slot_at("8/4P3/8/8/8/k7/8/K7 w - - 0 1");
        let outcome = slot.step(Some(&"e7e8".parse().unwrap()), IllegalMovePolicy::Penalize);

        assert_eq!(outcome, StepOutcome::ONGOING);
        assert_eq!(
            slot.position.board().role_at(shakmaty::Square::E8),
            Some(Role::Queen)
        );
    }

    #[test]
    fn underpromotion_is_kept() {
        let mut slot = slot_at("8/4P3/8/8/8/k7/8/K7 w - - 0 1");
        slot.step(Some(&"e7e8n".parse().unwrap()), IllegalMovePolicy::Penalize);

        assert_eq!(
            slot.position.board().role_at(shakmaty::Square::E8),
            Some(Role::Knight)
        );
    }

    #[test]
    fn rejected_move_keeps_position() {
        let mut slot = slot_at("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        let before = to_fen(&slot.position);

        let outcome = slot.step(Some(&"e2e5".parse().unwrap()), IllegalMovePolicy::Reject);
        assert_eq!(outcome, StepOutcome::ILLEGAL);
        assert_eq!(to_fen(&slot.position), before);
        assert_eq!(slot.state, SlotState::Terminal);
    }

    #[test]
    fn stalemate_counts_as_finished() {
        // Qb6 stalemates the black king on a8
        let mut slot = slot_at("k7/8/8/2Q5/8/8/8/K7 w - - 0 1");
        let outcome = slot.step(Some(&"c5b6".parse().unwrap()), IllegalMovePolicy::Penalize);
        assert_eq!(outcome, StepOutcome::FINISHED);
    }

    #[test]
    fn randomize_gives_up_on_finished_games() {
        // back rank mate, there is no move to play
        let mated = from_fen("R5k1/5ppp/8/8/8/8/8/4K3 b - - 0 1").unwrap();
        let mut slot = Slot::new(StdRng::seed_from_u64(2));

        assert!(!slot.randomize_from(&mated, 1, 1));
        assert!(!slot.randomize_from(&mated, 0, 0));
        assert_eq!(to_fen(&slot.position), to_fen(&mated));
        assert_eq!(slot.state, SlotState::Active);

        let start = Chess::default();
        assert!(slot.randomize_from(&start, 1, 1));
        assert_eq!(slot.position.turn(), shakmaty::Color::Black);
    }

    #[test]
    fn randomize_stays_in_range() {
        let mut slot = Slot::new(StdRng::seed_from_u64(3));
        for _ in 0..20 {
            assert!(slot.randomize(2, 6));
            let played = slot.position.fullmoves().get() * 2 - 2
                + if slot.position.turn().is_black() { 1 } else { 0 };
            assert!((2..=6).contains(&played), "played {} plies", played);
        }
    }
}
