use chessenv::encoding::from_fen;
use chessenv::moves::legal_square_moves;
use chessenv::oracle::{EngineConfig, EnginePool, PoolError, Score};
use shakmaty::Chess;
use std::process::Command;
use std::thread;

fn pool(workers: usize) -> EnginePool {
    let config = EngineConfig::default()
        .program(env!("CARGO_BIN_EXE_engine"))
        .args(["--seed", "3"])
        .depth(1)
        .workers(workers);
    EnginePool::new(config).unwrap()
}

#[test]
fn concurrent_queries() {
    let pool = pool(2);
    let position = Chess::default();
    let legal = legal_square_moves(&position);

    let (pool, position) = (&pool, &position);
    thread::scope(|s| {
        let handles: Vec<_> = (0..2)
            .map(|worker| {
                s.spawn(move || {
                    (0..10)
                        .map(|_| pool.query(worker, position))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        for handle in handles {
            for answer in handle.join().unwrap() {
                assert!(legal.contains(&answer.unwrap()));
            }
        }
    });
}

#[test]
fn killed_worker_recovers() {
    let pool = pool(2);
    let position = Chess::default();
    let pid = pool.worker_pid(0).unwrap().unwrap();

    assert!(Command::new("kill")
        .args(["-9", &pid.to_string()])
        .status()
        .unwrap()
        .success());

    match pool.query(0, &position) {
        Ok(m) => assert!(legal_square_moves(&position).contains(&m)),
        Err(err) => assert!(matches!(err, PoolError::EngineUnavailable { index: 0, .. })),
    }
    assert!(pool.query(1, &position).is_ok());
}

#[test]
fn deeper_search_finds_mate() {
    let pool = EnginePool::new(
        EngineConfig::default()
            .program(env!("CARGO_BIN_EXE_engine"))
            .args(["--deterministic"])
            .depth(2),
    )
    .unwrap();

    let position = from_fen("6k1/5ppp/8/8/8/8/8/R3K3 w - - 0 1").unwrap();
    let result = pool.query_full(0, &position).unwrap();
    assert_eq!(result.best_move, "a1a8".parse().unwrap());
    assert_eq!(result.score, Some(Score::Mate(1)));
}

#[test]
fn mated_position_has_no_move() {
    let pool = pool(1);
    let position = from_fen("R5k1/5ppp/8/8/8/8/8/4K3 b - - 0 1").unwrap();

    assert_eq!(
        pool.query(0, &position),
        Err(PoolError::BadMove {
            index: 0,
            text: "(none)".to_string()
        })
    );
}

#[test]
fn batch_over_random_positions() {
    use chessenv::{BatchEnvironment, EnvConfig};

    let mut env = BatchEnvironment::new(EnvConfig::default().capacity(12).seed(8)).unwrap();
    env.reset(12).unwrap();
    env.randomize_subset(&[true; 12], 4, 30).unwrap();

    let pool = pool(3);
    let positions = env.positions();
    let answers = pool.query_batch(&positions);

    assert_eq!(answers.len(), 12);
    for (position, answer) in positions.iter().zip(answers) {
        assert!(legal_square_moves(position).contains(&answer.unwrap()));
    }
}
