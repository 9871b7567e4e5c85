use std::collections::VecDeque;

use rand::Rng;
use serde::Serialize;

use crate::models::config::SimulationConfig;
use crate::models::sample::PriceSample;

use super::generator::generate_next_sample;

/// Rolling window of the most recent samples, oldest first.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryBuffer {
    #[serde(skip)]
    capacity: usize,
    samples: VecDeque<PriceSample>,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    /// Build a buffer from existing samples, keeping only the newest `capacity`.
    pub fn from_samples(capacity: usize, samples: Vec<PriceSample>) -> Self {
        samples
            .into_iter()
            .fold(Self::new(capacity), |buf, s| buf.append(s))
    }

    /// Append a sample, evicting the oldest when over capacity.
    pub fn append(mut self, sample: PriceSample) -> Self {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
        self
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn latest(&self) -> Option<&PriceSample> {
        self.samples.back()
    }

    /// The last `k` samples in chronological order.
    pub fn recent(&self, k: usize) -> impl Iterator<Item = &PriceSample> {
        self.samples.iter().skip(self.samples.len().saturating_sub(k))
    }

    pub fn iter(&self) -> impl Iterator<Item = &PriceSample> {
        self.samples.iter()
    }
}

/// Generate `n` samples starting from `config.baseline_price`.
///
/// Returns the samples and the final close (the baseline when `n == 0`).
pub fn seed<R: Rng + ?Sized>(
    n: usize,
    config: &SimulationConfig,
    rng: &mut R,
) -> (Vec<PriceSample>, f64) {
    let mut last = config.baseline_price;
    let mut samples = Vec::with_capacity(n);
    for _ in 0..n {
        let sample = generate_next_sample(last, config, rng);
        last = sample.close;
        samples.push(sample);
    }
    (samples, last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sample(close: f64) -> PriceSample {
        PriceSample {
            timestamp: "00:00:00".into(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 0,
            rsi: 50.0,
            ema20: close,
        }
    }

    #[test]
    fn test_seed_from_baseline() {
        let config = SimulationConfig::default();
        let mut rng = StdRng::seed_from_u64(42);
        let (samples, last) = seed(40, &config, &mut rng);

        assert_eq!(samples.len(), 40);
        assert_eq!(samples[0].open, 1.0850);
        assert_eq!(last, samples[39].close);
        // Each sample opens at the previous close.
        for pair in samples.windows(2) {
            assert_eq!(pair[1].open, pair[0].close);
        }
    }

    #[test]
    fn test_seed_zero_returns_baseline() {
        let config = SimulationConfig::default();
        let mut rng = StdRng::seed_from_u64(42);
        let (samples, last) = seed(0, &config, &mut rng);
        assert!(samples.is_empty());
        assert_eq!(last, config.baseline_price);
    }

    #[test]
    fn test_append_evicts_oldest() {
        let mut buf = HistoryBuffer::new(50);
        for i in 0..137 {
            buf = buf.append(sample(i as f64));
            assert!(buf.len() <= 50);
        }
        assert_eq!(buf.len(), 50);
        let closes: Vec<f64> = buf.iter().map(|s| s.close).collect();
        let expected: Vec<f64> = (87..137).map(|i| i as f64).collect();
        assert_eq!(closes, expected);
        assert_eq!(buf.latest().map(|s| s.close), Some(136.0));
    }

    #[test]
    fn test_recent_window() {
        let buf = HistoryBuffer::from_samples(50, (0..20).map(|i| sample(i as f64)).collect());
        let last: Vec<f64> = buf.recent(15).map(|s| s.close).collect();
        assert_eq!(last, (5..20).map(|i| i as f64).collect::<Vec<_>>());

        // Asking for more than available yields everything.
        assert_eq!(buf.recent(100).count(), 20);
        assert!(HistoryBuffer::new(50).recent(15).next().is_none());
    }

    #[test]
    fn test_from_samples_trims_to_capacity() {
        let buf = HistoryBuffer::from_samples(3, (0..5).map(|i| sample(i as f64)).collect());
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.iter().next().map(|s| s.close), Some(2.0));
    }
}
