//! Fixed-width integer encoding of positions (the board tensor) and FEN helpers.
//!
//! Layout of a tensor (69 values):
//! - 64 piece codes from a8 to h1 (rank 8 first, file a first):
//!   0 empty, 1..=6 white pawn, knight, bishop, rook, queen, king, 7..=12 the black ones,
//!   13 on the en passant target square
//! - side to move: 14 white, 15 black
//! - castling rights, black queenside (22/23), black kingside (20/21),
//!   white queenside (18/19), white kingside (16/17), present/absent

use shakmaty::fen::Fen;
use shakmaty::{
    CastlingMode, CastlingSide, Chess, Color, EnPassantMode, Piece, Position, Role, Square,
};
use thiserror::Error;

pub const TENSOR_LEN: usize = 69;

pub type BoardTensor = [i32; TENSOR_LEN];

pub const EMPTY: i32 = 0;
pub const EN_PASSANT: i32 = 13;
pub const WHITE_TO_MOVE: i32 = 14;
pub const BLACK_TO_MOVE: i32 = 15;

const TURN_INDEX: usize = 64;

/// Castling fields in tensor order, with the code used when the right is present.
/// The absent code is always the present code + 1.
const CASTLING_FIELDS: [(Color, CastlingSide, i32); 4] = [
    (Color::Black, CastlingSide::QueenSide, 22),
    (Color::Black, CastlingSide::KingSide, 20),
    (Color::White, CastlingSide::QueenSide, 18),
    (Color::White, CastlingSide::KingSide, 16),
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodingError {
    #[error("malformed board tensor: {0}")]
    MalformedTensor(String),

    #[error("malformed FEN {fen:?}: {reason}")]
    MalformedFen { fen: String, reason: String },
}

const ROLES: [Role; 6] = [
    Role::Pawn,
    Role::Knight,
    Role::Bishop,
    Role::Rook,
    Role::Queen,
    Role::King,
];

fn piece_code(piece: Piece) -> i32 {
    let role = match piece.role {
        Role::Pawn => 1,
        Role::Knight => 2,
        Role::Bishop => 3,
        Role::Rook => 4,
        Role::Queen => 5,
        Role::King => 6,
    };

    match piece.color {
        Color::White => role,
        Color::Black => role + 6,
    }
}

fn code_piece(code: i32) -> Option<Piece> {
    match code {
        1..=6 => Some(ROLES[code as usize - 1].of(Color::White)),
        7..=12 => Some(ROLES[code as usize - 7].of(Color::Black)),
        _ => None,
    }
}

/// Tensor index of a square (rank 8 first)
pub fn tensor_index(square: Square) -> usize {
    let index = square as usize;
    (7 - index / 8) * 8 + index % 8
}

/// Square at a tensor index, the inverse of `tensor_index`
pub fn tensor_square(index: usize) -> Square {
    debug_assert!(index < 64);
    Square::new(((7 - index / 8) * 8 + index % 8) as u32)
}

/// Encodes a position into a board tensor
pub fn to_tensor(position: &Chess) -> BoardTensor {
    let mut tensor = [EMPTY; TENSOR_LEN];

    for (square, piece) in position.board().clone() {
        tensor[tensor_index(square)] = piece_code(piece);
    }

    if let Some(ep) = position.ep_square(EnPassantMode::Legal) {
        tensor[tensor_index(ep)] = EN_PASSANT;
    }

    tensor[TURN_INDEX] = match position.turn() {
        Color::White => WHITE_TO_MOVE,
        Color::Black => BLACK_TO_MOVE,
    };

    let castles = position.castles();
    for (i, &(color, side, present)) in CASTLING_FIELDS.iter().enumerate() {
        tensor[TURN_INDEX + 1 + i] = if castles.has(color, side) {
            present
        } else {
            present + 1
        };
    }

    tensor
}

/// FEN of a position, with the en passant square only when the capture is legal
pub fn to_fen(position: &Chess) -> String {
    Fen::from_position(position.clone(), EnPassantMode::Legal).to_string()
}

/// Parses a FEN into a standard chess position
pub fn from_fen(fen: &str) -> Result<Chess, EncodingError> {
    let malformed = |reason: String| EncodingError::MalformedFen {
        fen: fen.to_string(),
        reason,
    };

    let setup = Fen::from_ascii(fen.trim().as_bytes()).map_err(|e| malformed(e.to_string()))?;

    setup
        .into_position(CastlingMode::Standard)
        .map_err(|e| malformed(e.to_string()))
}

fn castling_rights(tensor: &BoardTensor) -> Result<[bool; 4], EncodingError> {
    let mut rights = [false; 4];

    for (i, &(_, _, present)) in CASTLING_FIELDS.iter().enumerate() {
        let value = tensor[TURN_INDEX + 1 + i];
        rights[i] = if value == present {
            true
        } else if value == present + 1 {
            false
        } else {
            return Err(EncodingError::MalformedTensor(format!(
                "castling field {} has value {}",
                i, value
            )));
        };
    }

    Ok(rights)
}

fn turn(tensor: &BoardTensor) -> Result<Color, EncodingError> {
    match tensor[TURN_INDEX] {
        WHITE_TO_MOVE => Ok(Color::White),
        BLACK_TO_MOVE => Ok(Color::Black),
        value => Err(EncodingError::MalformedTensor(format!(
            "side to move has value {}",
            value
        ))),
    }
}

/// Converts a board tensor to FEN. Clocks are not part of the tensor and are written as `0 1`.
pub fn tensor_to_fen(tensor: &BoardTensor) -> Result<String, EncodingError> {
    let mut placement = String::with_capacity(72);
    let mut ep_square = None;

    for row in 0..8 {
        let mut empty = 0;

        for col in 0..8 {
            let index = row * 8 + col;
            let code = tensor[index];

            if code == EN_PASSANT {
                if ep_square.is_some() {
                    return Err(EncodingError::MalformedTensor(
                        "more than one en passant square".to_string(),
                    ));
                }
                ep_square = Some(tensor_square(index));
            }

            match code_piece(code) {
                Some(piece) => {
                    if empty > 0 {
                        placement.push(char::from(b'0' + empty));
                        empty = 0;
                    }
                    placement.push(piece.char());
                }
                None if code == EMPTY || code == EN_PASSANT => empty += 1,
                None => {
                    return Err(EncodingError::MalformedTensor(format!(
                        "square {} has value {}",
                        tensor_square(index),
                        code
                    )))
                }
            }
        }

        if empty > 0 {
            placement.push(char::from(b'0' + empty));
        }
        if row < 7 {
            placement.push('/');
        }
    }

    let side = match turn(tensor)? {
        Color::White => 'w',
        Color::Black => 'b',
    };

    // FEN order is KQkq, the tensor stores them the other way around
    let rights = castling_rights(tensor)?;
    let castling: String = [(rights[3], 'K'), (rights[2], 'Q'), (rights[1], 'k'), (rights[0], 'q')]
        .iter()
        .filter(|(present, _)| *present)
        .map(|(_, c)| *c)
        .collect();

    Ok(format!(
        "{} {} {} {} 0 1",
        placement,
        side,
        if castling.is_empty() { "-" } else { &castling },
        ep_square.map_or("-".to_string(), |sq| sq.to_string()),
    ))
}

/// Decodes a board tensor into a position
pub fn from_tensor(tensor: &BoardTensor) -> Result<Chess, EncodingError> {
    let fen = tensor_to_fen(tensor)?;

    from_fen(&fen).map_err(|e| match e {
        EncodingError::MalformedFen { reason, .. } => EncodingError::MalformedTensor(reason),
        e => e,
    })
}

/// Parses a FEN and encodes it as a tensor
pub fn fen_to_tensor(fen: &str) -> Result<BoardTensor, EncodingError> {
    from_fen(fen).map(|pos| to_tensor(&pos))
}

/// Tensor of the same position seen from the other side: ranks flipped, colors swapped.
/// Mirroring twice gives back the original tensor.
pub fn mirror_tensor(tensor: &BoardTensor) -> Result<BoardTensor, EncodingError> {
    let mut mirrored = [EMPTY; TENSOR_LEN];

    for index in 0..64 {
        let code = tensor[index];
        let flipped = (7 - index / 8) * 8 + index % 8;

        mirrored[flipped] = match code {
            EMPTY | EN_PASSANT => code,
            1..=6 => code + 6,
            7..=12 => code - 6,
            _ => {
                return Err(EncodingError::MalformedTensor(format!(
                    "square {} has value {}",
                    tensor_square(index),
                    code
                )))
            }
        };
    }

    mirrored[TURN_INDEX] = match turn(tensor)? {
        Color::White => BLACK_TO_MOVE,
        Color::Black => WHITE_TO_MOVE,
    };

    // black queen/king side take the white rights and vice versa
    let rights = castling_rights(tensor)?;
    let swapped = [rights[2], rights[3], rights[0], rights[1]];
    for (i, &(_, _, present)) in CASTLING_FIELDS.iter().enumerate() {
        mirrored[TURN_INDEX + 1 + i] = if swapped[i] { present } else { present + 1 };
    }

    Ok(mirrored)
}
