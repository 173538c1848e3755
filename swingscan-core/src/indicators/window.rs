//! Fixed-size sliding-window accumulators.
//!
//! Each accumulator is fed one value per bar and reports the window statistic
//! once the window is full. Extrema use a monotonic deque (amortized O(1) per
//! push); the mean keeps a running sum.

use std::collections::VecDeque;

/// Which extremum a [`RollingExtremum`] tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extremum {
    Max,
    Min,
}

/// Rolling maximum or minimum over the last `window` values.
#[derive(Debug, Clone)]
pub struct RollingExtremum {
    window: usize,
    kind: Extremum,
    /// (position, value) pairs, values monotone from front to back.
    deque: VecDeque<(usize, f64)>,
    pushed: usize,
}

impl RollingExtremum {
    pub fn new(window: usize, kind: Extremum) -> Self {
        assert!(window >= 1, "window must be >= 1");
        Self {
            window,
            kind,
            deque: VecDeque::with_capacity(window),
            pushed: 0,
        }
    }

    pub fn max(window: usize) -> Self {
        Self::new(window, Extremum::Max)
    }

    pub fn min(window: usize) -> Self {
        Self::new(window, Extremum::Min)
    }

    /// Push the next value; returns the window extremum once `window` values
    /// have been seen.
    pub fn push(&mut self, value: f64) -> Option<f64> {
        let pos = self.pushed;
        self.pushed += 1;

        while let Some(&(_, back)) = self.deque.back() {
            let dominated = match self.kind {
                Extremum::Max => back <= value,
                Extremum::Min => back >= value,
            };
            if !dominated {
                break;
            }
            self.deque.pop_back();
        }
        self.deque.push_back((pos, value));

        while let Some(&(front_pos, _)) = self.deque.front() {
            if front_pos + self.window <= pos {
                self.deque.pop_front();
            } else {
                break;
            }
        }

        if self.pushed >= self.window {
            self.deque.front().map(|&(_, v)| v)
        } else {
            None
        }
    }
}

/// Rolling simple mean over the last `window` values.
#[derive(Debug, Clone)]
pub struct RollingMean {
    window: usize,
    values: VecDeque<f64>,
    sum: f64,
}

impl RollingMean {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "window must be >= 1");
        Self {
            window,
            values: VecDeque::with_capacity(window + 1),
            sum: 0.0,
        }
    }

    pub fn push(&mut self, value: f64) -> Option<f64> {
        self.values.push_back(value);
        self.sum += value;
        if self.values.len() > self.window {
            if let Some(old) = self.values.pop_front() {
                self.sum -= old;
            }
        }
        if self.values.len() == self.window {
            Some(self.sum / self.window as f64)
        } else {
            None
        }
    }
}
