//! Pool of external UCI engines used as a move oracle.
//!
//! Each worker is a long-lived engine process owned by one index of the pool.
//! Queries to the same worker are serialized, queries to different workers
//! run concurrently. A worker whose pipes break is replaced by a fresh process.

mod uci_engine;

pub use uci_engine::{EngineResult, Score, UciWorker, WorkerError};

use crate::encoding;
use crate::moves::SquareMove;
use log::{debug, error, warn};
use shakmaty::{Chess, Position};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use thiserror::Error;

/// Upper bound for the number of workers of a pool
pub const MAX_WORKERS: usize = 256;

/// What a query returns when its worker broke and had to be restarted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Ask the restarted worker once more
    #[default]
    Retry,
    /// Answer with the first legal move of the position
    Placeholder,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Engine executable
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Search depth sent with every `go`
    pub depth: u32,
    pub workers: usize,
    pub on_failure: FailurePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            program: PathBuf::from("stockfish"),
            args: Vec::new(),
            depth: 1,
            workers: 1,
            on_failure: FailurePolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn on_failure(mut self, policy: FailurePolicy) -> Self {
        self.on_failure = policy;
        self
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("invalid number of engine workers: {0}")]
    InvalidWorkerCount(usize),

    #[error("worker {index} does not exist ({workers} workers)")]
    WorkerOutOfRange { index: usize, workers: usize },

    #[error("engine worker {index} is unavailable: {reason}")]
    EngineUnavailable { index: usize, reason: String },

    #[error("engine worker {index} answered with an unusable move {text:?}")]
    BadMove { index: usize, text: String },
}

pub struct EnginePool {
    config: EngineConfig,
    /// `None` while a worker could not be (re)started
    workers: Vec<Mutex<Option<UciWorker>>>,
}

impl EnginePool {
    /// Starts `config.workers` engine processes
    pub fn new(config: EngineConfig) -> Result<Self, PoolError> {
        if config.workers == 0 || config.workers > MAX_WORKERS {
            return Err(PoolError::InvalidWorkerCount(config.workers));
        }

        let mut workers = Vec::with_capacity(config.workers);
        for index in 0..config.workers {
            // workers started so far are killed when dropped
            let worker = UciWorker::spawn(&config.program, &config.args).map_err(|e| {
                PoolError::EngineUnavailable {
                    index,
                    reason: e.to_string(),
                }
            })?;
            workers.push(Mutex::new(Some(worker)));
        }

        debug!(
            "started {} engine workers ({}, depth {})",
            config.workers,
            config.program.display(),
            config.depth
        );

        Ok(EnginePool { config, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers.len()
    }

    pub fn depth(&self) -> u32 {
        self.config.depth
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn lock(&self, index: usize) -> Result<MutexGuard<'_, Option<UciWorker>>, PoolError> {
        let worker = self.workers.get(index).ok_or(PoolError::WorkerOutOfRange {
            index,
            workers: self.workers.len(),
        })?;

        // a panic elsewhere never leaves the worker itself half updated
        Ok(worker.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Process id of a live worker
    pub fn worker_pid(&self, index: usize) -> Result<Option<u32>, PoolError> {
        Ok(self.lock(index)?.as_ref().map(UciWorker::id))
    }

    /// Best move of the engine for the position
    pub fn query(&self, index: usize, position: &Chess) -> Result<SquareMove, PoolError> {
        self.query_full(index, position).map(|result| result.best_move)
    }

    /// Best move and score of the engine for the position
    pub fn query_full(&self, index: usize, position: &Chess) -> Result<EngineResult, PoolError> {
        let mut worker = self.lock(index)?;
        let fen = encoding::to_fen(position);

        let err = match self.ask(&mut worker, &fen) {
            Ok(result) => return Ok(result),
            Err(WorkerError::BadMove(text)) => return Err(PoolError::BadMove { index, text }),
            Err(err) => err,
        };

        warn!("engine worker {} failed ({}), restarting", index, err);
        self.restart(&mut worker, index)?;

        match self.config.on_failure {
            FailurePolicy::Retry => self.ask(&mut worker, &fen).map_err(|err| match err {
                WorkerError::BadMove(text) => PoolError::BadMove { index, text },
                err => PoolError::EngineUnavailable {
                    index,
                    reason: err.to_string(),
                },
            }),
            FailurePolicy::Placeholder => position
                .legal_moves()
                .first()
                .map(|m| EngineResult {
                    best_move: SquareMove::from_move(m),
                    score: None,
                })
                .ok_or_else(|| PoolError::EngineUnavailable {
                    index,
                    reason: "no legal move to stand in for the engine".to_string(),
                }),
        }
    }

    fn ask(&self, worker: &mut Option<UciWorker>, fen: &str) -> Result<EngineResult, WorkerError> {
        if worker.is_none() {
            *worker = Some(UciWorker::spawn(&self.config.program, &self.config.args)?);
        }

        match worker.as_mut() {
            Some(w) => w.evaluate(fen, self.config.depth),
            None => Err(WorkerError::Closed),
        }
    }

    fn restart(&self, worker: &mut Option<UciWorker>, index: usize) -> Result<(), PoolError> {
        // kill and reap the old process first
        *worker = None;

        match UciWorker::spawn(&self.config.program, &self.config.args) {
            Ok(w) => {
                debug!("engine worker {} restarted as pid {}", index, w.id());
                *worker = Some(w);
                Ok(())
            }
            Err(err) => {
                error!("engine worker {} could not be restarted: {}", index, err);
                Err(PoolError::EngineUnavailable {
                    index,
                    reason: err.to_string(),
                })
            }
        }
    }

    /// Queries a batch of positions, position `i` on worker `i % workers`.
    /// Workers run in parallel, the positions of one worker in order.
    pub fn query_batch(&self, positions: &[Chess]) -> Vec<Result<SquareMove, PoolError>> {
        let workers = self.workers.len();

        let mut results: Vec<(usize, Result<SquareMove, PoolError>)> = thread::scope(|s| {
            let handles: Vec<_> = (0..workers.min(positions.len()))
                .map(|index| {
                    s.spawn(move || {
                        positions
                            .iter()
                            .enumerate()
                            .skip(index)
                            .step_by(workers)
                            .map(|(i, position)| (i, self.query(index, position)))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|handle| match handle.join() {
                    Ok(results) => results,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        });

        results.sort_by_key(|(i, _)| *i);
        results.into_iter().map(|(_, result)| result).collect()
    }

    /// Kills every worker. Queries afterwards start fresh processes.
    pub fn shutdown(&self) {
        for worker in &self.workers {
            worker.lock().unwrap_or_else(PoisonError::into_inner).take();
        }
        debug!("engine pool shut down");
    }
}
