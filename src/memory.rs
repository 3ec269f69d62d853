use std::collections::VecDeque;

use rand::{Rng, seq::index};

use crate::experience::Transition;

/// Fixed-capacity FIFO store of transitions for experience replay.
#[derive(Debug, Clone)]
pub struct ReplayMemory {
    buffer: VecDeque<Transition>,
    capacity: usize,
}

impl ReplayMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity.min(1 << 16)),
            capacity,
        }
    }

    /// Inserts a transition, evicting the oldest one once full.
    pub fn push(&mut self, transition: Transition) {
        if self.capacity == 0 {
            return;
        }
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(transition);
    }

    /// Draws `batch_size` distinct transitions uniformly. Asking for more than
    /// the current occupancy returns every stored transition in random order.
    pub fn sample(&self, batch_size: usize, rng: &mut impl Rng) -> Vec<&Transition> {
        let amount = batch_size.min(self.buffer.len());
        index::sample(rng, self.buffer.len(), amount)
            .into_iter()
            .map(|i| &self.buffer[i])
            .collect()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.buffer.iter()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use candle_core::{DType, Tensor};
    use proptest::prelude::*;
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::device::DEVICE;

    fn transition(tag: usize) -> Transition {
        let obs = Tensor::full(tag as f32, (1, 2, 2), &DEVICE).unwrap();
        let next = Tensor::full(tag as f32 + 0.5, (1, 2, 2), &DEVICE).unwrap();
        Transition {
            observation: obs,
            action: tag,
            reward: tag as f32 * 0.25,
            next_observation: next,
            done: tag % 3 == 0,
        }
    }

    #[test]
    fn evicts_oldest_first() {
        let mut memory = ReplayMemory::new(3);
        for tag in 0..5 {
            memory.push(transition(tag));
        }
        assert_eq!(memory.len(), 3);
        let actions: Vec<usize> = memory.iter().map(|t| t.action).collect();
        assert_eq!(actions, vec![2, 3, 4]);
    }

    #[test]
    fn zero_capacity_stores_nothing() {
        let mut memory = ReplayMemory::new(0);
        memory.push(transition(1));
        assert!(memory.is_empty());
    }

    #[test]
    fn sample_has_no_repeats_within_a_batch() {
        let mut memory = ReplayMemory::new(50);
        for tag in 0..50 {
            memory.push(transition(tag));
        }
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            let batch = memory.sample(20, &mut rng);
            assert_eq!(batch.len(), 20);
            let unique: HashSet<usize> = batch.iter().map(|t| t.action).collect();
            assert_eq!(unique.len(), 20);
        }
    }

    #[test]
    fn oversized_sample_is_clamped() {
        let mut memory = ReplayMemory::new(10);
        memory.push(transition(1));
        memory.push(transition(2));
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(memory.sample(8, &mut rng).len(), 2);
    }

    #[test]
    fn sampled_transition_is_unchanged() {
        let mut memory = ReplayMemory::new(4);
        let original = transition(6);
        memory.push(original.clone());
        let mut rng = StdRng::seed_from_u64(11);
        let sampled = memory.sample(1, &mut rng)[0];
        assert_eq!(sampled.action, original.action);
        assert_eq!(sampled.reward, original.reward);
        assert_eq!(sampled.done, original.done);
        assert_eq!(
            sampled.observation.flatten_all().unwrap().to_vec1::<f32>().unwrap(),
            original.observation.flatten_all().unwrap().to_vec1::<f32>().unwrap()
        );
        assert_eq!(
            sampled.next_observation.flatten_all().unwrap().to_vec1::<f32>().unwrap(),
            original.next_observation.flatten_all().unwrap().to_vec1::<f32>().unwrap()
        );
        assert_eq!(sampled.observation.dtype(), DType::F32);
    }

    proptest! {
        #[test]
        fn occupancy_is_capped_and_keeps_newest(capacity in 1usize..20, pushes in 0usize..60) {
            let mut memory = ReplayMemory::new(capacity);
            for tag in 0..pushes {
                memory.push(transition(tag));
            }
            prop_assert_eq!(memory.len(), pushes.min(capacity));
            let kept: Vec<usize> = memory.iter().map(|t| t.action).collect();
            let expected: Vec<usize> = (pushes.saturating_sub(capacity)..pushes).collect();
            prop_assert_eq!(kept, expected);
        }
    }
}
