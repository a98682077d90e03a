use std::collections::VecDeque;
use std::fmt;

/// Windowed usage statistics for one device.
///
/// `min` and `max` cover every value seen; only `avg` is computed over the
/// trailing window. In baseline mode each value is reported relative to the
/// reading taken at startup, clamped at zero.
#[derive(Debug, Clone)]
pub struct RollingStat {
    window:        VecDeque<f64>,
    capacity:      usize,
    max_range:     f64,
    baseline_mode: bool,
    baseline:      f64,
    current:       f64,
    min:           f64,
    max:           f64,
    avg:           f64,
}

impl RollingStat {
    /// `max_range` is the device ceiling from its first reading. A `capacity`
    /// of zero is treated as one.
    pub fn new(capacity: usize, max_range: f64, baseline_mode: bool) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            max_range,
            baseline_mode,
            baseline: 0.0,
            current: 0.0,
            min: max_range,
            max: 0.0,
            avg: 0.0,
        }
    }

    /// Record the startup reading to subtract from every later value.
    ///
    /// Ignored unless baseline mode is on, and ignored after the first `put`.
    pub fn set_baseline(&mut self, value: f64) {
        if !self.baseline_mode {
            tracing::debug!("baseline {value} ignored: baseline mode is off");
            return;
        }
        if !self.window.is_empty() {
            tracing::debug!("baseline {value} ignored: samples already recorded");
            return;
        }
        self.baseline = value;
    }

    /// Push a raw value, evicting the oldest window entry if at capacity.
    pub fn put(&mut self, value: f64) {
        let adjusted = (value - self.baseline).max(0.0);

        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(adjusted);

        self.current = adjusted;
        self.min = self.min.min(adjusted);
        self.max = self.max.max(adjusted);
        self.avg = self.window.iter().sum::<f64>() / self.window.len() as f64;
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Mean of the trailing window; 0 before the first `put`.
    pub fn avg(&self) -> f64 {
        self.avg
    }

    pub fn baseline(&self) -> f64 {
        self.baseline
    }

    pub fn max_range(&self) -> f64 {
        self.max_range
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Adjusted values in the window, oldest first.
    pub fn window(&self) -> impl Iterator<Item = f64> + '_ {
        self.window.iter().copied()
    }

    pub fn summary(&self) -> StatSummary {
        StatSummary {
            current: self.current,
            min:     self.min,
            max:     self.max,
            avg:     self.avg,
        }
    }
}

/// Point-in-time copy of a [`RollingStat`]'s figures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatSummary {
    pub current: f64,
    pub min:     f64,
    pub max:     f64,
    pub avg:     f64,
}

impl fmt::Display for StatSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Min: {:.1} | Max: {:.1} | Avg: {:.1}",
            self.min, self.max, self.avg
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn fresh_stat_starts_min_at_range() {
        let stat = RollingStat::new(40, 100.0, false);
        assert_eq!(stat.min(), 100.0);
        assert_eq!(stat.max(), 0.0);
        assert!(stat.is_empty());
    }

    #[test]
    fn average_is_trailing_but_extremes_are_all_time() {
        let mut stat = RollingStat::new(3, 100.0, false);
        stat.put(10.0);
        stat.put(20.0);
        stat.put(5.0);

        assert_eq!(stat.current(), 5.0);
        assert_eq!(stat.min(), 5.0);
        assert_eq!(stat.max(), 20.0);
        assert!(close(stat.avg(), 11.667));

        stat.put(100.0);
        assert_eq!(stat.len(), 3);
        assert_eq!(stat.window().collect::<Vec<_>>(), vec![20.0, 5.0, 100.0]);
        assert!(close(stat.avg(), 41.667));
        assert_eq!(stat.max(), 100.0);
        assert_eq!(stat.min(), 5.0);
    }

    #[test]
    fn values_above_range_are_kept() {
        let mut stat = RollingStat::new(4, 100.0, false);
        stat.put(130.0);
        assert_eq!(stat.current(), 130.0);
        assert_eq!(stat.max(), 130.0);
        assert_eq!(stat.min(), 100.0);
    }

    #[test]
    fn baseline_subtraction_clamps_at_zero() {
        let mut stat = RollingStat::new(40, 100.0, true);
        stat.set_baseline(50.0);
        stat.put(30.0);
        assert_eq!(stat.current(), 0.0);
        assert_eq!(stat.min(), 0.0);

        stat.put(75.0);
        assert_eq!(stat.current(), 25.0);
        assert!(close(stat.avg(), 12.5));
    }

    #[test]
    fn baseline_ignored_when_mode_off() {
        let mut stat = RollingStat::new(40, 100.0, false);
        stat.set_baseline(50.0);
        stat.put(30.0);
        assert_eq!(stat.baseline(), 0.0);
        assert_eq!(stat.current(), 30.0);
    }

    #[test]
    fn baseline_ignored_after_first_put() {
        let mut stat = RollingStat::new(40, 100.0, true);
        stat.put(30.0);
        stat.set_baseline(20.0);
        stat.put(30.0);
        assert_eq!(stat.current(), 30.0);
    }

    #[test]
    fn zero_capacity_behaves_as_one() {
        let mut stat = RollingStat::new(0, 100.0, false);
        stat.put(10.0);
        stat.put(30.0);
        assert_eq!(stat.capacity(), 1);
        assert_eq!(stat.avg(), 30.0);
    }

    #[test]
    fn summary_formats_like_caption() {
        let mut stat = RollingStat::new(2, 100.0, false);
        stat.put(12.0);
        stat.put(18.0);
        assert_eq!(stat.summary().to_string(), "Min: 12.0 | Max: 18.0 | Avg: 15.0");
    }
}
