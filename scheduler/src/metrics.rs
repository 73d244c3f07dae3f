use std::collections::VecDeque;

/// Exponentially-weighted moving average over task service times. Returns
/// `None` until the first sample arrives.
pub struct Ewma {
    alpha: f64,
    value: Option<f64>,
}

impl Ewma {
    pub fn new(alpha: f64) -> Self {
        Self { alpha, value: None }
    }

    pub fn update(&mut self, x: f64) -> f64 {
        let next = match self.value {
            None => x,
            Some(prev) => self.alpha * x + (1.0 - self.alpha) * prev,
        };
        self.value = Some(next);
        next
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }
}

/// Bounded FIFO of recent samples with snapshot-sort quantile reads.
pub struct RollingQuantile {
    samples: VecDeque<f64>,
    maxlen: usize,
}

impl RollingQuantile {
    pub fn new(maxlen: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(maxlen),
            maxlen,
        }
    }

    pub fn update(&mut self, x: f64) {
        if self.samples.len() == self.maxlen {
            self.samples.pop_front();
        }
        self.samples.push_back(x);
    }

    pub fn quantile(&self, q: f64) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let mut sorted: Vec<f64> = self.samples.iter().copied().collect();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let idx = ((q * (sorted.len() - 1) as f64) as isize)
            .clamp(0, sorted.len() as isize - 1) as usize;
        Some(sorted[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ewma_first_sample_is_identity() {
        let mut e = Ewma::new(0.2);
        assert_eq!(e.update(10.0), 10.0);
    }

    #[test]
    fn ewma_blends_toward_new_samples() {
        let mut e = Ewma::new(0.2);
        e.update(10.0);
        let second = e.update(20.0);
        assert!((second - 12.0).abs() < 1e-9);
    }

    #[test]
    fn rolling_quantile_empty_is_none() {
        let q = RollingQuantile::new(500);
        assert_eq!(q.quantile(0.5), None);
    }

    #[test]
    fn rolling_quantile_p50_on_sorted_input() {
        let mut q = RollingQuantile::new(500);
        for i in 1..=9 {
            q.update(i as f64);
        }
        assert_eq!(q.quantile(0.5), Some(5.0));
    }

    #[test]
    fn rolling_quantile_respects_maxlen() {
        let mut q = RollingQuantile::new(3);
        for i in 1..=5 {
            q.update(i as f64);
        }
        assert_eq!(q.quantile(1.0), Some(5.0));
        assert_eq!(q.quantile(0.0), Some(3.0));
    }
}
