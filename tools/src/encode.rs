use chessenv::action;
use chessenv::encoding::{fen_to_tensor, from_fen, mirror_tensor, tensor_to_fen};
use chessenv::moves::legal_square_moves;
use clap::Args;
use std::error::Error;

#[derive(Args)]
pub struct EncodeCommand {
    /// Position to encode
    #[arg(value_name = "fen")]
    fen: String,
}

pub fn encode(cmd: EncodeCommand) -> Result<(), Box<dyn Error>> {
    let position = from_fen(&cmd.fen)?;
    let tensor = fen_to_tensor(&cmd.fen)?;
    let mirrored = mirror_tensor(&tensor)?;

    println!("Tensor: {:?}", tensor);
    println!("Mirrored: {:?}", mirrored);
    println!("Mirrored FEN: {}", tensor_to_fen(&mirrored)?);

    let moves = legal_square_moves(&position);
    println!("Legal moves: {}", moves.len());
    for m in moves {
        println!("{} {}", m, action::encode(&m)?);
    }

    Ok(())
}
