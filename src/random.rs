//! Randomness behind card draws, dice fallbacks and mine placement

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use std::collections::VecDeque;
use std::sync::Mutex;

pub trait DrawSource: Send + Sync {
    /// Uniform value in `1..=max`
    fn roll(&self, max: u8) -> u8;

    /// `count` distinct values out of `0..population`
    fn sample_distinct(&self, population: u8, count: usize) -> Vec<u8>;

    /// Index chosen proportionally to `weights`; 0 when all weights are zero
    fn pick_weighted(&self, weights: &[u64]) -> usize;

    /// Uniform index in `0..len`; 0 for an empty range
    fn pick_index(&self, len: usize) -> usize;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngSource;

impl DrawSource for ThreadRngSource {
    fn roll(&self, max: u8) -> u8 {
        rand::thread_rng().gen_range(1..=max.max(1))
    }

    fn sample_distinct(&self, population: u8, count: usize) -> Vec<u8> {
        let count = count.min(population as usize);
        rand::seq::index::sample(&mut rand::thread_rng(), population as usize, count)
            .into_iter()
            .map(|i| i as u8)
            .collect()
    }

    fn pick_weighted(&self, weights: &[u64]) -> usize {
        match WeightedIndex::new(weights) {
            Ok(dist) => dist.sample(&mut rand::thread_rng()),
            Err(_) => 0,
        }
    }

    fn pick_index(&self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        rand::thread_rng().gen_range(0..len)
    }
}

/// Replays queued values, for tests. Empty queues fall back to the lowest outcome.
#[derive(Default)]
pub struct ScriptedDraws {
    rolls: Mutex<VecDeque<u8>>,
    samples: Mutex<VecDeque<Vec<u8>>>,
    picks: Mutex<VecDeque<usize>>,
    indices: Mutex<VecDeque<usize>>,
}

impl ScriptedDraws {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_roll(&self, value: u8) -> &Self {
        if let Ok(mut q) = self.rolls.lock() {
            q.push_back(value);
        }
        self
    }

    pub fn push_sample(&self, values: Vec<u8>) -> &Self {
        if let Ok(mut q) = self.samples.lock() {
            q.push_back(values);
        }
        self
    }

    pub fn push_pick(&self, index: usize) -> &Self {
        if let Ok(mut q) = self.picks.lock() {
            q.push_back(index);
        }
        self
    }

    pub fn push_index(&self, index: usize) -> &Self {
        if let Ok(mut q) = self.indices.lock() {
            q.push_back(index);
        }
        self
    }
}

impl DrawSource for ScriptedDraws {
    fn roll(&self, _max: u8) -> u8 {
        self.rolls.lock().ok().and_then(|mut q| q.pop_front()).unwrap_or(1)
    }

    fn sample_distinct(&self, _population: u8, count: usize) -> Vec<u8> {
        self.samples
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .unwrap_or_else(|| (0..count as u8).collect())
    }

    fn pick_weighted(&self, _weights: &[u64]) -> usize {
        self.picks.lock().ok().and_then(|mut q| q.pop_front()).unwrap_or(0)
    }

    fn pick_index(&self, len: usize) -> usize {
        let index = self.indices.lock().ok().and_then(|mut q| q.pop_front()).unwrap_or(0);
        index.min(len.saturating_sub(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_thread_rng_bounds() {
        let source = ThreadRngSource;
        for _ in 0..200 {
            let v = source.roll(6);
            assert!((1..=6).contains(&v));
        }
    }

    #[test]
    fn test_sample_is_distinct() {
        let source = ThreadRngSource;
        for _ in 0..50 {
            let cells = source.sample_distinct(25, 7);
            assert_eq!(cells.len(), 7);
            assert_eq!(cells.iter().collect::<HashSet<_>>().len(), 7);
            assert!(cells.iter().all(|c| *c < 25));
        }
    }

    #[test]
    fn test_weighted_skips_zero_weights() {
        let source = ThreadRngSource;
        for _ in 0..50 {
            assert_eq!(source.pick_weighted(&[0, 0, 5]), 2);
        }
        assert_eq!(source.pick_weighted(&[0, 0]), 0);
    }

    #[test]
    fn test_pick_index_reaches_past_a_byte() {
        let source = ThreadRngSource;
        let picks: Vec<usize> = (0..2000).map(|_| source.pick_index(300)).collect();
        assert!(picks.iter().all(|i| *i < 300));
        assert!(picks.iter().any(|i| *i >= 255));
        assert_eq!(source.pick_index(0), 0);

        let draws = ScriptedDraws::new();
        draws.push_index(299).push_index(400);
        assert_eq!(draws.pick_index(300), 299);
        assert_eq!(draws.pick_index(300), 299);
        assert_eq!(draws.pick_index(300), 0);
    }

    #[test]
    fn test_scripted_replay() {
        let draws = ScriptedDraws::new();
        draws.push_roll(5).push_roll(2);
        assert_eq!(draws.roll(6), 5);
        assert_eq!(draws.roll(6), 2);
        assert_eq!(draws.roll(6), 1);
        assert_eq!(draws.sample_distinct(25, 3), vec![0, 1, 2]);
    }
}
