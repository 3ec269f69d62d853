//! Turns RGB frames into the single-channel 42x42 observations the Q-network expects.

use candle_core::{DType, Tensor};

use crate::{
    convnet::INPUT_SIZE,
    device::DEVICE,
    environment::{Environment, Step},
    error::{AgentError, Result},
    space::{BoxSpace, Space},
};

const LUMA: [f32; 3] = [0.2125, 0.7154, 0.0721];

/// `(H, W, 3)` RGB frame in `[0, 255]` to a `(1, 42, 42)` f32 luminance image in `[0, 1]`.
pub fn to_observation(frame: &Tensor) -> Result<Tensor> {
    let dims = frame.dims();
    if dims.len() != 3 || dims[2] != 3 {
        return Err(AgentError::ShapeMismatch {
            expected: vec![dims.first().copied().unwrap_or(0), dims.get(1).copied().unwrap_or(0), 3],
            actual: dims.to_vec(),
        });
    }
    let weights = Tensor::new(&LUMA, &DEVICE)?.affine(1.0 / 255.0, 0.0)?;
    let gray = frame
        .to_dtype(DType::F32)?
        .broadcast_mul(&weights)?
        .sum_keepdim(2)?
        .permute((2, 0, 1))?
        .contiguous()?;
    let resized = gray
        .unsqueeze(0)?
        .upsample_nearest2d(INPUT_SIZE, INPUT_SIZE)?
        .squeeze(0)?;
    Ok(resized)
}

/// Environment wrapper applying [`to_observation`] to every frame.
pub struct Preprocessed<E> {
    inner: E,
    observation_space: BoxSpace,
}

impl<E: Environment> Preprocessed<E> {
    pub fn new(inner: E) -> Result<Self> {
        Ok(Self {
            inner,
            observation_space: BoxSpace::new(&[1, INPUT_SIZE, INPUT_SIZE], 0.0, 1.0, DType::F32)?,
        })
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }
}

impl<E: Environment> Environment for Preprocessed<E> {
    fn action_space(&self) -> Space {
        self.inner.action_space()
    }

    fn observation_space(&self) -> BoxSpace {
        self.observation_space.clone()
    }

    fn reset(&mut self) -> Result<Tensor> {
        to_observation(&self.inner.reset()?)
    }

    fn step(&mut self, action: usize) -> Result<Step> {
        let step = self.inner.step(action)?;
        Ok(Step {
            observation: to_observation(&step.observation)?,
            ..step
        })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn white_frame_becomes_ones() {
        let frame = Tensor::full(255u8, (84, 84, 3), &DEVICE).unwrap();
        let obs = to_observation(&frame).unwrap();
        assert_eq!(obs.dims(), &[1, 42, 42]);
        for v in obs.flatten_all().unwrap().to_vec1::<f32>().unwrap() {
            assert_abs_diff_eq!(v, 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn channels_are_weighted_by_luminance() {
        let mut pixels = vec![0u8; 42 * 42 * 3];
        for px in pixels.chunks_mut(3) {
            px[1] = 255;
        }
        let frame = Tensor::from_vec(pixels, (42, 42, 3), &DEVICE).unwrap();
        let obs = to_observation(&frame).unwrap();
        let v = obs.get(0).unwrap().get(10).unwrap().get(10).unwrap().to_scalar::<f32>().unwrap();
        assert_abs_diff_eq!(v, 0.7154, epsilon = 1e-4);
    }

    #[test]
    fn rejects_non_rgb_frames() {
        let frame = Tensor::zeros((42, 42), DType::U8, &DEVICE).unwrap();
        assert!(to_observation(&frame).is_err());
    }
}
