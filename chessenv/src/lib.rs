//! Batched chess simulation for reinforcement learning.
//!
//! - [`action`]: moves as dense integer ids
//! - [`encoding`]: positions as fixed-width integer tensors, and FEN
//! - [`env`]: many independent games stepped in parallel
//! - [`oracle`]: a pool of external UCI engines to ask for moves

pub mod action;
pub mod encoding;
pub mod env;
pub mod moves;
pub mod oracle;

pub use action::{ActionError, ActionId, ACTION_SPACE};
pub use encoding::{BoardTensor, EncodingError, TENSOR_LEN};
pub use env::episode::{
    EngineOpponent, EpisodeConfig, EpisodeRunner, EpisodeStep, Opponent, RandomOpponent,
};
pub use env::{BatchEnvironment, EnvConfig, EnvError, IllegalMovePolicy, SlotState, StepOutcome};
pub use moves::SquareMove;
pub use oracle::{EngineConfig, EnginePool, FailurePolicy, PoolError};
