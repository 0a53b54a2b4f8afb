use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, Move, Position, Role, Square};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A move described only by its squares and promotion piece, independent of any position.
///
/// Castling is stored as the king's walk (`e1g1`), the same way UCI describes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SquareMove {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<Role>,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid move text: {0:?}")]
pub struct ParseSquareMoveError(pub String);

impl SquareMove {
    pub fn new(from: Square, to: Square, promotion: Option<Role>) -> Self {
        SquareMove {
            from,
            to,
            promotion,
        }
    }

    /// Converts a move generated by the rules engine
    pub fn from_move(m: &Move) -> Self {
        match m.to_uci(CastlingMode::Standard) {
            UciMove::Normal {
                from,
                to,
                promotion,
            } => SquareMove::new(from, to, promotion),
            // standard chess never produces drops or null moves
            _ => unreachable!("unexpected move kind: {:?}", m),
        }
    }

    /// Converts a UCI move, rejecting drops and null moves
    pub fn from_uci(uci: &UciMove) -> Option<Self> {
        match *uci {
            UciMove::Normal {
                from,
                to,
                promotion,
            } => Some(SquareMove::new(from, to, promotion)),
            _ => None,
        }
    }

    pub fn to_uci(&self) -> UciMove {
        UciMove::Normal {
            from: self.from,
            to: self.to,
            promotion: self.promotion,
        }
    }

    /// Resolves the move in the given position, None if it is not legal there
    pub fn to_move(&self, position: &Chess) -> Option<Move> {
        self.to_uci().to_move(position).ok()
    }

    /// Whether source and destination squares are the same as the other move's
    pub fn same_squares(&self, other: &SquareMove) -> bool {
        self.from == other.from && self.to == other.to
    }
}

impl From<&Move> for SquareMove {
    fn from(m: &Move) -> Self {
        SquareMove::from_move(m)
    }
}

impl fmt::Display for SquareMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uci())
    }
}

impl FromStr for SquareMove {
    type Err = ParseSquareMoveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uci: UciMove = s
            .trim()
            .parse()
            .map_err(|_| ParseSquareMoveError(s.to_string()))?;

        SquareMove::from_uci(&uci).ok_or_else(|| ParseSquareMoveError(s.to_string()))
    }
}

/// Legal moves of a position, in the order the rules engine generates them
pub fn legal_square_moves(position: &Chess) -> Vec<SquareMove> {
    position
        .legal_moves()
        .iter()
        .map(SquareMove::from_move)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_uci_text() {
        let m: SquareMove = "e7e8q".parse().unwrap();
        assert_eq!(m.from, Square::E7);
        assert_eq!(m.to, Square::E8);
        assert_eq!(m.promotion, Some(Role::Queen));
        assert_eq!(m.to_string(), "e7e8q");

        assert!("0000".parse::<SquareMove>().is_err());
        assert!("e2".parse::<SquareMove>().is_err());
        assert!("(none)".parse::<SquareMove>().is_err());
    }

    #[test]
    fn castling_uses_king_destination() {
        let fen = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1";
        let pos: Chess = fen
            .parse::<shakmaty::fen::Fen>()
            .unwrap()
            .into_position(CastlingMode::Standard)
            .unwrap();

        let moves = legal_square_moves(&pos);
        assert!(moves.contains(&"e1g1".parse().unwrap()));
        assert!(moves.contains(&"e1c1".parse().unwrap()));

        let castle: SquareMove = "e1g1".parse().unwrap();
        assert!(castle.to_move(&pos).unwrap().is_castle());
    }

    #[test]
    fn start_position_has_twenty_moves() {
        let moves = legal_square_moves(&Chess::default());
        assert_eq!(moves.len(), 20);
        assert!(moves.contains(&SquareMove::new(Square::E2, Square::E4, None)));
    }
}
