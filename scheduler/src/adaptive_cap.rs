use std::collections::VecDeque;

const MIN_SAMPLES: usize = 20;
const WINDOW_LEN: usize = 200;
const ERROR_THRESHOLD: f64 = 0.05;
const DECAY_FACTOR: f64 = 0.7;

/// Tracks recent task success/failure and exposes a current concurrency
/// ceiling: multiplicative decrease on sustained error, additive increase
/// otherwise, with a minimum-sample gate to avoid thrashing at startup.
pub struct AdaptiveCap {
    cap: usize,
    floor: usize,
    ceiling: usize,
    window: VecDeque<bool>,
}

impl AdaptiveCap {
    pub fn new(floor: usize, ceiling: usize) -> Self {
        Self {
            cap: floor,
            floor,
            ceiling,
            window: VecDeque::with_capacity(WINDOW_LEN),
        }
    }

    pub fn record(&mut self, ok: bool) {
        if self.window.len() == WINDOW_LEN {
            self.window.pop_front();
        }
        self.window.push_back(ok);

        if self.window.len() < MIN_SAMPLES {
            return;
        }

        let ok_count = self.window.iter().filter(|&&o| o).count();
        let error_rate = 1.0 - (ok_count as f64 / self.window.len() as f64);

        if error_rate > ERROR_THRESHOLD {
            self.cap = self.floor.max((self.cap as f64 * DECAY_FACTOR) as usize);
        } else {
            self.cap = self.ceiling.min(self.cap + 1);
        }
    }

    pub fn current(&self) -> usize {
        self.cap
    }
}
