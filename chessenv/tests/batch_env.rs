use chessenv::action::{self, ACTION_SPACE};
use chessenv::encoding::{self, BLACK_TO_MOVE, EN_PASSANT};
use chessenv::{BatchEnvironment, EnvConfig, IllegalMovePolicy, SquareMove, StepOutcome};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use shakmaty::{Chess, EnPassantMode, Position, Square};

fn env(n: usize, policy: IllegalMovePolicy) -> BatchEnvironment {
    let config = EnvConfig::default()
        .capacity(256)
        .seed(42)
        .illegal_move(policy);
    let mut env = BatchEnvironment::new(config).unwrap();
    env.reset(n).unwrap();
    env
}

#[test]
fn first_move_never_ends_a_game() {
    let mut env = env(20, IllegalMovePolicy::Penalize);
    let moves = env.legal_moves()[0].clone();
    assert_eq!(moves.len(), 20);

    let outcomes = env.step(&moves).unwrap();
    assert!(outcomes.iter().all(|o| *o == StepOutcome::ONGOING));
}

#[test]
fn e2e4_tensor() {
    let mut env = env(2, IllegalMovePolicy::Penalize);
    let e2e4: SquareMove = "e2e4".parse().unwrap();
    env.step(&[e2e4, "g1f3".parse().unwrap()]).unwrap();

    let tensor = env.tensors()[0];
    assert_eq!(tensor[encoding::tensor_index(Square::E4)], 1);
    assert_eq!(tensor[encoding::tensor_index(Square::E2)], 0);
    assert_eq!(tensor[64], BLACK_TO_MOVE);
    assert_eq!(tensor[65..], [22, 20, 18, 16]);
    assert!(!tensor.contains(&EN_PASSANT));
}

#[test]
fn illegal_moves_under_both_policies() {
    for policy in [IllegalMovePolicy::Penalize, IllegalMovePolicy::Reject] {
        let mut env = env(2, policy);
        let start = env.fens()[1].clone();

        let outcomes = env
            .step(&["e2e4".parse().unwrap(), "e1e3".parse().unwrap()])
            .unwrap();
        assert_eq!(outcomes[0], StepOutcome::ONGOING);
        assert_eq!(outcomes[1].reward, -1);
        assert!(outcomes[1].done);

        match policy {
            IllegalMovePolicy::Penalize => assert_ne!(env.fens()[1], start),
            IllegalMovePolicy::Reject => assert_eq!(env.fens()[1], start),
        }
    }
}

#[test]
fn tensors_survive_random_games() {
    let mut env = env(64, IllegalMovePolicy::Penalize);
    env.randomize_subset(&[true; 64], 0, 60).unwrap();

    for _ in 0..40 {
        for (tensor, position) in env.tensors().iter().zip(env.positions()) {
            let back = encoding::from_tensor(tensor).unwrap();
            assert_eq!(back.board(), position.board());
            assert_eq!(back.turn(), position.turn());
            assert_eq!(back.castles().castling_rights(), position.castles().castling_rights());
            assert_eq!(
                back.ep_square(EnPassantMode::Legal),
                position.ep_square(EnPassantMode::Legal)
            );
        }

        let dones: Vec<bool> = env.step_random().iter().map(|o| o.done).collect();
        env.reset_subset(&dones).unwrap();
    }
}

#[test]
fn masks_drive_action_steps() {
    let mut env = env(32, IllegalMovePolicy::Penalize);
    let mut rng = StdRng::seed_from_u64(9);

    for _ in 0..50 {
        let actions: Vec<_> = env
            .legality_mask()
            .iter()
            .map(|mask| {
                let legal: Vec<usize> = mask.ones().collect();
                *legal.choose(&mut rng).unwrap() as u32
            })
            .collect();

        let outcomes = env.step_actions(&actions).unwrap();
        assert!(outcomes.iter().all(|o| !o.illegal));

        let dones: Vec<bool> = outcomes.iter().map(|o| o.done).collect();
        env.reset_subset(&dones).unwrap();
    }
}

#[test]
fn legal_ids_of_a_position() {
    let position = Chess::default();
    let ids = action::encode_all(&chessenv::moves::legal_square_moves(&position)).unwrap();
    assert_eq!(ids.len(), 20);
    assert!(ids.iter().all(|&id| (id as usize) < ACTION_SPACE));
}
