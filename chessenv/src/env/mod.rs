//! Batch of independent chess games stepped in parallel.
//!
//! The environment owns a fixed arena of slots allocated once at construction.
//! Only the first `len()` slots are active; every operation works on them in
//! parallel and never lets one slot observe another.

pub mod episode;
mod slot;

pub use slot::SlotState;

use crate::action::{self, ActionId, ACTION_SPACE};
use crate::encoding::{self, BoardTensor, EncodingError};
use crate::moves::SquareMove;
use fixedbitset::FixedBitSet;
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use shakmaty::Chess;
use slot::Slot;
use thiserror::Error;

/// Upper bound for the number of slots of an environment
pub const MAX_CAPACITY: usize = 1024;

/// Attempts per slot in `randomize_subset` before giving up on a slot
pub const MAX_RANDOMIZE_RETRIES: usize = 16;

/// What `step` does with a move that is not legal in its slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IllegalMovePolicy {
    /// Play the first legal move instead and end the episode with a penalty
    #[default]
    Penalize,
    /// Leave the position untouched and end the episode with a penalty
    Reject,
}

#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// Number of pre-allocated slots, at most `MAX_CAPACITY`
    pub capacity: usize,
    /// Seed for the per-slot random streams, random if not set
    pub seed: Option<u64>,
    pub illegal_move: IllegalMovePolicy,
}

impl Default for EnvConfig {
    fn default() -> Self {
        EnvConfig {
            capacity: MAX_CAPACITY,
            seed: None,
            illegal_move: IllegalMovePolicy::default(),
        }
    }
}

impl EnvConfig {
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn illegal_move(mut self, policy: IllegalMovePolicy) -> Self {
        self.illegal_move = policy;
        self
    }
}

/// Result of a step for one slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepOutcome {
    /// 1 if the move ended the game, -1 for an illegal move, 0 otherwise
    pub reward: i32,
    pub done: bool,
    /// Whether the supplied move was illegal (or not a move at all)
    pub illegal: bool,
}

impl StepOutcome {
    pub const ONGOING: StepOutcome = StepOutcome {
        reward: 0,
        done: false,
        illegal: false,
    };
    pub const FINISHED: StepOutcome = StepOutcome {
        reward: 1,
        done: true,
        illegal: false,
    };
    pub const ILLEGAL: StepOutcome = StepOutcome {
        reward: -1,
        done: true,
        illegal: true,
    };
    /// The slot was already terminal, nothing was played
    pub const STALE: StepOutcome = StepOutcome {
        reward: 0,
        done: true,
        illegal: false,
    };
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvError {
    #[error("{requested} slots requested but the capacity is {capacity}")]
    CapacityExceeded { requested: usize, capacity: usize },

    #[error("an environment needs at least one slot")]
    ZeroCapacity,

    #[error("expected {expected} entries, one per active slot, got {got}")]
    BatchSize { expected: usize, got: usize },

    #[error("invalid ply range {min}..={max}")]
    InvalidPlyRange { min: usize, max: usize },

    #[error("slot {slot} is not active ({active} active slots)")]
    SlotOutOfRange { slot: usize, active: usize },

    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

pub struct BatchEnvironment {
    slots: Vec<Slot>,
    active: usize,
    illegal_move: IllegalMovePolicy,
}

impl BatchEnvironment {
    pub fn new(config: EnvConfig) -> Result<Self, EnvError> {
        if config.capacity == 0 {
            return Err(EnvError::ZeroCapacity);
        }
        if config.capacity > MAX_CAPACITY {
            return Err(EnvError::CapacityExceeded {
                requested: config.capacity,
                capacity: MAX_CAPACITY,
            });
        }

        let seed = config.seed.unwrap_or_else(rand::random);
        debug!(
            "creating environment with {} slots, seed {}",
            config.capacity, seed
        );

        // slot streams are drawn from one generator, so nearby seeds share no slot
        let mut seeder = StdRng::seed_from_u64(seed);
        let slots = (0..config.capacity)
            .map(|_| Slot::new(StdRng::seed_from_u64(seeder.gen())))
            .collect();

        Ok(BatchEnvironment {
            slots,
            active: 0,
            illegal_move: config.illegal_move,
        })
    }

    /// Number of active slots
    pub fn len(&self) -> usize {
        self.active
    }

    pub fn is_empty(&self) -> bool {
        self.active == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn illegal_move_policy(&self) -> IllegalMovePolicy {
        self.illegal_move
    }

    fn active_slots(&self) -> &[Slot] {
        &self.slots[..self.active]
    }

    fn active_slots_mut(&mut self) -> &mut [Slot] {
        &mut self.slots[..self.active]
    }

    fn check_batch(&self, got: usize) -> Result<(), EnvError> {
        if got != self.active {
            return Err(EnvError::BatchSize {
                expected: self.active,
                got,
            });
        }
        Ok(())
    }

    fn check_slot(&self, slot: usize) -> Result<(), EnvError> {
        if slot >= self.active {
            return Err(EnvError::SlotOutOfRange {
                slot,
                active: self.active,
            });
        }
        Ok(())
    }

    /// Activates `n` slots, all at the start position
    pub fn reset(&mut self, n: usize) -> Result<(), EnvError> {
        if n > self.capacity() {
            return Err(EnvError::CapacityExceeded {
                requested: n,
                capacity: self.capacity(),
            });
        }

        self.active = n;
        self.active_slots_mut().par_iter_mut().for_each(Slot::reset);
        debug!("reset {} slots", n);
        Ok(())
    }

    /// Resets the slots whose mask entry is set
    pub fn reset_subset(&mut self, mask: &[bool]) -> Result<(), EnvError> {
        self.check_batch(mask.len())?;

        self.active_slots_mut()
            .par_iter_mut()
            .zip(mask.par_iter())
            .filter(|(_, reset)| **reset)
            .for_each(|(slot, _)| slot.reset());
        Ok(())
    }

    /// Resets the masked slots and plays between `min_ply` and `max_ply` random moves in each
    pub fn randomize_subset(
        &mut self,
        mask: &[bool],
        min_ply: usize,
        max_ply: usize,
    ) -> Result<(), EnvError> {
        self.check_batch(mask.len())?;
        if min_ply > max_ply {
            return Err(EnvError::InvalidPlyRange {
                min: min_ply,
                max: max_ply,
            });
        }

        let failed = self
            .active_slots_mut()
            .par_iter_mut()
            .zip(mask.par_iter())
            .filter(|(_, randomize)| **randomize)
            .map(|(slot, _)| slot.randomize(min_ply, max_ply))
            .filter(|done| !done)
            .count();

        if failed > 0 {
            warn!(
                "{} slots reached a finished game in all {} randomization attempts, left at the start position",
                failed, MAX_RANDOMIZE_RETRIES
            );
        }
        Ok(())
    }

    /// Plays one move in every active slot
    pub fn step(&mut self, moves: &[SquareMove]) -> Result<Vec<StepOutcome>, EnvError> {
        self.check_batch(moves.len())?;
        let policy = self.illegal_move;

        Ok(self
            .active_slots_mut()
            .par_iter_mut()
            .zip(moves.par_iter())
            .map(|(slot, m)| slot.step(Some(m), policy))
            .collect())
    }

    /// Like `step`, for batches where some slots have no move.
    /// A missing move counts as illegal unless its slot is already terminal.
    pub fn step_optional(
        &mut self,
        moves: &[Option<SquareMove>],
    ) -> Result<Vec<StepOutcome>, EnvError> {
        self.check_batch(moves.len())?;
        let policy = self.illegal_move;

        Ok(self
            .active_slots_mut()
            .par_iter_mut()
            .zip(moves.par_iter())
            .map(|(slot, m)| slot.step(m.as_ref(), policy))
            .collect())
    }

    /// Plays one action in every active slot. Ids that do not decode to a move count as illegal.
    pub fn step_actions(&mut self, actions: &[ActionId]) -> Result<Vec<StepOutcome>, EnvError> {
        self.check_batch(actions.len())?;
        let policy = self.illegal_move;

        Ok(self
            .active_slots_mut()
            .par_iter_mut()
            .zip(actions.par_iter())
            .map(|(slot, &id)| slot.step(action::decode(id).ok().as_ref(), policy))
            .collect())
    }

    /// Plays a random legal move in every active slot
    pub fn step_random(&mut self) -> Vec<StepOutcome> {
        let policy = self.illegal_move;

        self.active_slots_mut()
            .par_iter_mut()
            .map(|slot| {
                let m = slot.random_move();
                slot.step(m.as_ref(), policy)
            })
            .collect()
    }

    /// Legal moves per slot. Terminal slots still list the moves of their last
    /// position, but ignore them until they are reset.
    pub fn legal_moves(&self) -> Vec<Vec<SquareMove>> {
        self.active_slots()
            .par_iter()
            .map(Slot::legal_moves)
            .collect()
    }

    /// One bit per action id for every slot, set where the action is legal.
    /// The mask of a terminal slot is only meaningful after a reset.
    pub fn legality_mask(&self) -> Vec<FixedBitSet> {
        self.active_slots()
            .par_iter()
            .map(|slot| {
                let mut mask = FixedBitSet::with_capacity(ACTION_SPACE);
                // moves of the rules engine always have an id
                for id in slot.legal_moves().iter().filter_map(|m| action::encode(m).ok()) {
                    mask.insert(id as usize);
                }
                mask
            })
            .collect()
    }

    /// A uniformly random legal move per slot, `None` where there is no legal move.
    /// Terminal slots get a move too, which `step` ignores until a reset.
    pub fn random_moves(&mut self) -> Vec<Option<SquareMove>> {
        self.active_slots_mut()
            .par_iter_mut()
            .map(Slot::random_move)
            .collect()
    }

    pub fn tensors(&self) -> Vec<BoardTensor> {
        self.active_slots()
            .par_iter()
            .map(|slot| encoding::to_tensor(&slot.position))
            .collect()
    }

    /// Board tensors of all active slots, concatenated
    pub fn tensors_flat(&self) -> Vec<i32> {
        self.tensors().concat()
    }

    pub fn fens(&self) -> Vec<String> {
        self.active_slots()
            .par_iter()
            .map(|slot| encoding::to_fen(&slot.position))
            .collect()
    }

    pub fn positions(&self) -> Vec<Chess> {
        self.active_slots()
            .iter()
            .map(|slot| slot.position.clone())
            .collect()
    }

    pub fn position(&self, slot: usize) -> Result<&Chess, EnvError> {
        self.check_slot(slot)?;
        Ok(&self.slots[slot].position)
    }

    pub fn states(&self) -> Vec<SlotState> {
        self.active_slots().iter().map(|slot| slot.state).collect()
    }

    pub fn is_terminal(&self, slot: usize) -> Result<bool, EnvError> {
        self.check_slot(slot)?;
        Ok(self.slots[slot].state == SlotState::Terminal)
    }

    /// Replaces the position of a slot and makes it active again
    pub fn set_position(&mut self, slot: usize, position: Chess) -> Result<(), EnvError> {
        self.check_slot(slot)?;
        self.slots[slot].set_position(position);
        Ok(())
    }

    pub fn set_fen(&mut self, slot: usize, fen: &str) -> Result<(), EnvError> {
        let position = encoding::from_fen(fen)?;
        self.set_position(slot, position)
    }

    pub fn set_tensor(&mut self, slot: usize, tensor: &BoardTensor) -> Result<(), EnvError> {
        let position = encoding::from_tensor(tensor)?;
        self.set_position(slot, position)
    }
}
