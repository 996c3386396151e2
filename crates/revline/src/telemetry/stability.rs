//! Rolling fuel trim deviation.
//!
//! A steady short-term trim means closed-loop fuelling is settled; a jumpy one
//! points at a vacuum leak, a lazy O2 sensor or a misfire.

use std::collections::VecDeque;

/// Default number of samples kept.
pub const DEFAULT_CAPACITY: usize = 40;

/// The window must hold more than this many samples before a deviation is reported.
pub const MIN_SAMPLES: usize = 5;

/// Fixed-size window of recent fuel trim samples.
#[derive(Debug, Clone)]
pub struct TrimWindow {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl TrimWindow {
    /// Create a window holding at most `capacity` samples.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest once full.
    pub fn push(&mut self, trim: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(trim);
    }

    /// Number of samples held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when no samples have been pushed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Population standard deviation of the window, or 0 until more than
    /// [`MIN_SAMPLES`] samples are held.
    #[must_use]
    pub fn std_dev(&self) -> f64 {
        let n = self.samples.len();
        if n <= MIN_SAMPLES {
            return 0.0;
        }
        let n = n as f64;
        let mean = self.samples.iter().sum::<f64>() / n;
        let variance = self
            .samples
            .iter()
            .map(|s| (s - mean).powi(2))
            .sum::<f64>()
            / n;
        variance.sqrt()
    }
}

impl Default for TrimWindow {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_std_dev_needs_enough_samples() {
        let mut window = TrimWindow::default();
        for trim in [-10.0, 10.0, -10.0, 10.0, -10.0] {
            window.push(trim);
        }
        assert_eq!(window.len(), 5);
        assert!(window.std_dev().abs() < f64::EPSILON);

        window.push(10.0);
        assert!((window.std_dev() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_constant_trim_is_stable() {
        let mut window = TrimWindow::default();
        for _ in 0..20 {
            window.push(3.1);
        }
        assert!(window.std_dev() < 1e-9);
    }

    #[test]
    fn test_population_std_dev() {
        let mut window = TrimWindow::new(8);
        for trim in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            window.push(trim);
        }
        assert!((window.std_dev() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_eviction_keeps_capacity() {
        let mut window = TrimWindow::new(40);
        for i in 0..100 {
            window.push(f64::from(i));
        }
        assert_eq!(window.len(), 40);
    }

    #[test]
    fn test_eviction_forgets_old_noise() {
        let mut window = TrimWindow::new(10);
        for trim in [-25.0, 25.0, -25.0, 25.0] {
            window.push(trim);
        }
        for _ in 0..10 {
            window.push(1.0);
        }
        assert!(window.std_dev() < 1e-9);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut window = TrimWindow::new(0);
        window.push(1.0);
        window.push(2.0);
        assert_eq!(window.len(), 1);
        assert!(!window.is_empty());
    }
}
