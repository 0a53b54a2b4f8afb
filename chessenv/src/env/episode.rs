//! Two-player episodes on top of a [`BatchEnvironment`].
//!
//! Every call to [`EpisodeRunner::step`] plays the agent's move and then the
//! reply of an [`Opponent`] in each slot. Rewards are seen from the agent's
//! side, finished slots start a new game right away.

use super::{BatchEnvironment, EnvError, StepOutcome};
use crate::action::ActionId;
use crate::encoding::BoardTensor;
use crate::moves::SquareMove;
use crate::oracle::EnginePool;
use log::warn;
use shakmaty::Position;

/// Picks the replies to the agent's moves
pub trait Opponent {
    /// One reply per active slot. Slots with `skip` set are already over and get `None`.
    fn replies(&mut self, env: &mut BatchEnvironment, skip: &[bool]) -> Vec<Option<SquareMove>>;
}

/// Replies with a uniformly random legal move
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomOpponent;

impl Opponent for RandomOpponent {
    fn replies(&mut self, env: &mut BatchEnvironment, skip: &[bool]) -> Vec<Option<SquareMove>> {
        env.random_moves()
            .into_iter()
            .zip(skip)
            .map(|(m, &skip)| if skip { None } else { m })
            .collect()
    }
}

/// Replies with the best move of an engine pool
pub struct EngineOpponent {
    pool: EnginePool,
}

impl EngineOpponent {
    pub fn new(pool: EnginePool) -> Self {
        EngineOpponent { pool }
    }

    pub fn pool(&self) -> &EnginePool {
        &self.pool
    }
}

impl Opponent for EngineOpponent {
    fn replies(&mut self, env: &mut BatchEnvironment, skip: &[bool]) -> Vec<Option<SquareMove>> {
        let positions = env.positions();
        let asked: Vec<usize> = (0..positions.len()).filter(|&i| !skip[i]).collect();
        let batch: Vec<_> = asked.iter().map(|&i| positions[i].clone()).collect();

        let mut replies = vec![None; positions.len()];
        for (&i, answer) in asked.iter().zip(self.pool.query_batch(&batch)) {
            replies[i] = match answer {
                Ok(m) => Some(m),
                Err(err) => {
                    warn!("no engine reply for slot {} ({}), playing the first legal move", i, err);
                    positions[i].legal_moves().first().map(SquareMove::from_move)
                }
            };
        }
        replies
    }
}

#[derive(Debug, Clone)]
pub struct EpisodeConfig {
    /// Agent moves after which an unfinished game is called a draw
    pub max_steps: u32,
    pub draw_reward: f32,
}

impl Default for EpisodeConfig {
    fn default() -> Self {
        EpisodeConfig {
            max_steps: 100,
            draw_reward: 0.0,
        }
    }
}

impl EpisodeConfig {
    pub fn max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn draw_reward(mut self, draw_reward: f32) -> Self {
        self.draw_reward = draw_reward;
        self
    }
}

/// Observation after a round, taken once finished slots were reset
#[derive(Debug, Clone)]
pub struct EpisodeStep {
    pub tensors: Vec<BoardTensor>,
    pub rewards: Vec<f32>,
    pub dones: Vec<bool>,
}

pub struct EpisodeRunner<O> {
    env: BatchEnvironment,
    opponent: O,
    config: EpisodeConfig,
    /// Agent moves played in the current game of each slot
    steps: Vec<u32>,
}

impl<O: Opponent> EpisodeRunner<O> {
    pub fn new(env: BatchEnvironment, opponent: O, config: EpisodeConfig) -> Self {
        let steps = vec![0; env.len()];
        EpisodeRunner {
            env,
            opponent,
            config,
            steps,
        }
    }

    pub fn env(&self) -> &BatchEnvironment {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut BatchEnvironment {
        &mut self.env
    }

    pub fn opponent(&self) -> &O {
        &self.opponent
    }

    /// Starts `n` new games and returns their tensors
    pub fn reset(&mut self, n: usize) -> Result<Vec<BoardTensor>, EnvError> {
        self.env.reset(n)?;
        self.steps = vec![0; n];
        Ok(self.env.tensors())
    }

    pub fn step(&mut self, moves: &[SquareMove]) -> Result<EpisodeStep, EnvError> {
        let agent = self.env.step(moves)?;
        self.reply(agent)
    }

    pub fn step_actions(&mut self, actions: &[ActionId]) -> Result<EpisodeStep, EnvError> {
        let agent = self.env.step_actions(actions)?;
        self.reply(agent)
    }

    fn reply(&mut self, agent: Vec<StepOutcome>) -> Result<EpisodeStep, EnvError> {
        let skip: Vec<bool> = agent.iter().map(|o| o.done).collect();
        let replies = self.opponent.replies(&mut self.env, &skip);
        let opponent = self.env.step_optional(&replies)?;

        // slots activated through the environment since the last reset
        self.steps.resize(self.env.len(), 0);

        let mut rewards = Vec::with_capacity(agent.len());
        let mut dones = Vec::with_capacity(agent.len());

        for ((mine, theirs), steps) in agent.iter().zip(&opponent).zip(&mut self.steps) {
            *steps += 1;

            let mut reward = if mine.done {
                mine.reward as f32
            } else {
                (mine.reward - theirs.reward) as f32
            };
            let mut done = mine.done || theirs.done;

            if !done && *steps > self.config.max_steps {
                reward = self.config.draw_reward;
                done = true;
            }
            if done {
                *steps = 0;
            }

            rewards.push(reward);
            dones.push(done);
        }

        self.env.reset_subset(&dones)?;

        Ok(EpisodeStep {
            tensors: self.env.tensors(),
            rewards,
            dones,
        })
    }
}
