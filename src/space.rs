use std::fmt;

use candle_core::{DType, Tensor};
use rand::Rng;

use crate::{
    device::DEVICE,
    error::{AgentError, Result},
};

/// A finite set of actions `0..n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Discrete {
    n: usize,
}

impl Discrete {
    pub fn new(n: usize) -> Result<Self> {
        if n == 0 {
            return Err(AgentError::InvalidConfig(
                "a discrete space needs at least one action".into(),
            ));
        }
        Ok(Self { n })
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn sample(&self, rng: &mut impl Rng) -> usize {
        rng.random_range(0..self.n)
    }

    pub fn contains(&self, action: usize) -> bool {
        action < self.n
    }
}

/// A box of real values with a fixed shape and element type, e.g. an image.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxSpace {
    shape: Vec<usize>,
    low: f32,
    high: f32,
    dtype: DType,
}

impl BoxSpace {
    pub fn new(shape: &[usize], low: f32, high: f32, dtype: DType) -> Result<Self> {
        if !(low <= high) {
            return Err(AgentError::InvalidConfig(format!(
                "box bounds are inverted: low {low} > high {high}"
            )));
        }
        Ok(Self {
            shape: shape.to_vec(),
            low,
            high,
            dtype,
        })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn low(&self) -> f32 {
        self.low
    }

    pub fn high(&self) -> f32 {
        self.high
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Draws every element uniformly from `[low, high]`.
    pub fn sample(&self, rng: &mut impl Rng) -> Result<Tensor> {
        let len = self.shape.iter().product();
        let span = self.high - self.low;
        let values: Vec<f32> = (0..len)
            .map(|_| self.low + span * rng.random::<f32>())
            .collect();
        let tensor = Tensor::from_vec(values, self.shape.as_slice(), &DEVICE)?;
        Ok(tensor.to_dtype(self.dtype)?)
    }

    /// Errors with [`AgentError::ShapeMismatch`] unless `tensor` has exactly this shape.
    pub fn check_shape(&self, tensor: &Tensor) -> Result<()> {
        if tensor.dims() != self.shape.as_slice() {
            return Err(AgentError::ShapeMismatch {
                expected: self.shape.clone(),
                actual: tensor.dims().to_vec(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Space {
    Discrete(Discrete),
    Box(BoxSpace),
}

impl Space {
    pub fn as_discrete(&self) -> Option<&Discrete> {
        match self {
            Space::Discrete(d) => Some(d),
            Space::Box(_) => None,
        }
    }
}

impl From<Discrete> for Space {
    fn from(d: Discrete) -> Self {
        Space::Discrete(d)
    }
}

impl From<BoxSpace> for Space {
    fn from(b: BoxSpace) -> Self {
        Space::Box(b)
    }
}

impl fmt::Display for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Space::Discrete(d) => write!(f, "Discrete({})", d.n),
            Space::Box(b) => write!(f, "Box({}, {}, {:?}, {:?})", b.low, b.high, b.shape, b.dtype),
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn discrete_samples_stay_in_range() {
        let space = Discrete::new(4).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = [false; 4];
        for _ in 0..200 {
            let a = space.sample(&mut rng);
            assert!(space.contains(a));
            seen[a] = true;
        }
        assert!(seen.iter().all(|s| *s));
        assert!(!space.contains(4));
    }

    #[test]
    fn empty_discrete_is_rejected() {
        assert!(Discrete::new(0).is_err());
    }

    #[test]
    fn box_sample_matches_descriptor() {
        let space = BoxSpace::new(&[1, 42, 42], 0.0, 1.0, DType::F32).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let t = space.sample(&mut rng).unwrap();
        space.check_shape(&t).unwrap();
        let values = t.flatten_all().unwrap().to_vec1::<f32>().unwrap();
        assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn check_shape_reports_both_shapes() {
        let space = BoxSpace::new(&[1, 42, 42], 0.0, 1.0, DType::F32).unwrap();
        let t = Tensor::zeros((1, 40, 42), DType::F32, &DEVICE).unwrap();
        match space.check_shape(&t) {
            Err(AgentError::ShapeMismatch { expected, actual }) => {
                assert_eq!(expected, vec![1, 42, 42]);
                assert_eq!(actual, vec![1, 40, 42]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn only_discrete_spaces_convert() {
        let d: Space = Discrete::new(2).unwrap().into();
        let b: Space = BoxSpace::new(&[2], -1.0, 1.0, DType::F32).unwrap().into();
        assert_eq!(d.as_discrete().map(Discrete::n), Some(2));
        assert!(b.as_discrete().is_none());
        assert_eq!(d.to_string(), "Discrete(2)");
    }
}
