//! Dense integer ids for moves, used as the discrete output space of a policy.
//!
//! An action id is `from_square * NUM_DISPLACEMENTS + displacement_index`, where the
//! displacement is one of the 88 shapes a single move can have on an empty board
//! (queen lines, knight jumps and the pawn steps that promote). Every move of the
//! game has exactly one id, and the mapping does not depend on the position.

mod table;

pub use table::{Displacement, DISPLACEMENTS, NUM_DISPLACEMENTS};

use crate::moves::SquareMove;
use shakmaty::{Move, Square};
use table::displacement_index;
use thiserror::Error;

pub type ActionId = u32;

/// Size of the action space, the output dimension of a policy
pub const ACTION_SPACE: usize = 64 * NUM_DISPLACEMENTS;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("no single move has the shape of {0}")]
    UnrepresentableMove(SquareMove),

    #[error("action id {0} is outside the action space")]
    InvalidActionId(ActionId),

    #[error("action id {0} points outside the board")]
    OffBoard(ActionId),
}

fn coords(square: Square) -> (i32, i32) {
    let index = square as i32;
    (index % 8, index / 8)
}

/// Action id of a move
pub fn encode(m: &SquareMove) -> Result<ActionId, ActionError> {
    let (from_file, from_rank) = coords(m.from);
    let (to_file, to_rank) = coords(m.to);

    let index = displacement_index(from_file - to_file, from_rank - to_rank, m.promotion)
        .ok_or(ActionError::UnrepresentableMove(*m))?;

    Ok((m.from as usize * NUM_DISPLACEMENTS + index) as ActionId)
}

/// Action id of a move generated by the rules engine
pub fn encode_move(m: &Move) -> Result<ActionId, ActionError> {
    encode(&SquareMove::from_move(m))
}

/// Move of an action id. The move is not checked for legality.
pub fn decode(action: ActionId) -> Result<SquareMove, ActionError> {
    if action as usize >= ACTION_SPACE {
        return Err(ActionError::InvalidActionId(action));
    }

    let from = action as usize / NUM_DISPLACEMENTS;
    let displacement = DISPLACEMENTS[action as usize % NUM_DISPLACEMENTS];

    let (from_file, from_rank) = (from as i32 % 8, from as i32 / 8);
    let to_file = from_file - displacement.file as i32;
    let to_rank = from_rank - displacement.rank as i32;

    if !(0..8).contains(&to_file) || !(0..8).contains(&to_rank) {
        return Err(ActionError::OffBoard(action));
    }

    Ok(SquareMove::new(
        Square::new(from as u32),
        Square::new((to_rank * 8 + to_file) as u32),
        displacement.promotion,
    ))
}

/// Action ids of a list of moves, failing on the first move without an id
pub fn encode_all<'a>(
    moves: impl IntoIterator<Item = &'a SquareMove>,
) -> Result<Vec<ActionId>, ActionError> {
    moves.into_iter().map(encode).collect()
}
