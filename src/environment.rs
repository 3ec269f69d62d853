use candle_core::{DType, Tensor};
use rand::{Rng, rngs::StdRng};

use crate::{
    device::DEVICE,
    error::{AgentError, Result},
    space::{BoxSpace, Discrete, Space},
};

/// Result of applying one action.
#[derive(Debug, Clone)]
pub struct Step {
    pub observation: Tensor,
    pub reward: f32,
    pub done: bool,
}

pub trait Environment {
    fn action_space(&self) -> Space;
    fn observation_space(&self) -> BoxSpace;
    /// Starts a new episode and returns its first observation.
    fn reset(&mut self) -> Result<Tensor>;
    fn step(&mut self, action: usize) -> Result<Step>;
}

pub const GRID: usize = 7;
const BALL_RGB: [u8; 3] = [255, 255, 255];
const PADDLE_RGB: [u8; 3] = [0, 255, 0];

/// A ball drops one row per step from a random column of a 7x7 grid; the
/// paddle on the bottom row moves left (0), stays (1) or moves right (2).
/// Catching the ball pays +1, missing it -1. Frames are RGB `u8` tensors of
/// shape `(frame_size, frame_size, 3)`.
pub struct CatchEnv {
    frame_size: usize,
    action_space: Discrete,
    observation_space: BoxSpace,
    ball_row: usize,
    ball_col: usize,
    paddle_col: usize,
    done: bool,
    rng: StdRng,
}

impl CatchEnv {
    pub fn new(frame_size: usize, rng: StdRng) -> Result<Self> {
        if frame_size < GRID {
            return Err(AgentError::InvalidConfig(format!(
                "frame_size must be at least {GRID}, got {frame_size}"
            )));
        }
        Ok(Self {
            frame_size,
            action_space: Discrete::new(3)?,
            observation_space: BoxSpace::new(&[frame_size, frame_size, 3], 0.0, 255.0, DType::U8)?,
            ball_row: 0,
            ball_col: 0,
            paddle_col: GRID / 2,
            done: true,
            rng,
        })
    }

    pub fn ball(&self) -> (usize, usize) {
        (self.ball_row, self.ball_col)
    }

    pub fn paddle(&self) -> usize {
        self.paddle_col
    }

    fn render(&self) -> Result<Tensor> {
        let size = self.frame_size;
        let mut pixels = vec![0u8; size * size * 3];
        for y in 0..size {
            let row = y * GRID / size;
            for x in 0..size {
                let col = x * GRID / size;
                let color = if row == self.ball_row && col == self.ball_col {
                    Some(BALL_RGB)
                } else if row == GRID - 1 && col == self.paddle_col {
                    Some(PADDLE_RGB)
                } else {
                    None
                };
                if let Some(rgb) = color {
                    let offset = (y * size + x) * 3;
                    pixels[offset..offset + 3].copy_from_slice(&rgb);
                }
            }
        }
        Ok(Tensor::from_vec(pixels, (size, size, 3), &DEVICE)?)
    }
}

impl Environment for CatchEnv {
    fn action_space(&self) -> Space {
        Space::Discrete(self.action_space)
    }

    fn observation_space(&self) -> BoxSpace {
        self.observation_space.clone()
    }

    fn reset(&mut self) -> Result<Tensor> {
        self.ball_row = 0;
        self.ball_col = self.rng.random_range(0..GRID);
        self.paddle_col = GRID / 2;
        self.done = false;
        self.render()
    }

    fn step(&mut self, action: usize) -> Result<Step> {
        if !self.action_space.contains(action) {
            return Err(AgentError::InvalidAction {
                action,
                n: self.action_space.n(),
            });
        }
        match action {
            0 => self.paddle_col = self.paddle_col.saturating_sub(1),
            2 => self.paddle_col = (self.paddle_col + 1).min(GRID - 1),
            _ => {}
        }
        if !self.done {
            self.ball_row += 1;
        }

        let mut reward = 0.0;
        if self.ball_row == GRID - 1 && !self.done {
            self.done = true;
            reward = if self.ball_col == self.paddle_col { 1.0 } else { -1.0 };
        }

        Ok(Step {
            observation: self.render()?,
            reward,
            done: self.done,
        })
    }
}
