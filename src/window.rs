use crate::domain::DAY_MS;

pub const MIN_DAYS: u32 = 1;
pub const MAX_DAYS: u32 = 14;
const ZOOM_STEPS: [u32; 7] = [1, 2, 3, 5, 7, 10, 14];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowRange {
    pub start: i64,
    pub end: i64,
    /// `false` when the whole dataset fits and the range collapsed to it.
    pub windowed: bool,
}

impl WindowRange {
    pub fn span(&self) -> i64 {
        self.end - self.start
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        timestamp >= self.start && timestamp <= self.end
    }
}

/// Visible time range of the chart, clamped to the dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeWindow {
    days: u32,
    center_ms: Option<i64>,
    dataset_min_ms: Option<i64>,
    dataset_max_ms: Option<i64>,
}

impl TimeWindow {
    pub fn new(days: u32) -> Self {
        Self {
            days: days.clamp(MIN_DAYS, MAX_DAYS),
            center_ms: None,
            dataset_min_ms: None,
            dataset_max_ms: None,
        }
    }

    pub fn days(&self) -> u32 {
        self.days
    }

    pub fn center_ms(&self) -> Option<i64> {
        self.center_ms
    }

    pub fn span_ms(&self) -> i64 {
        i64::from(self.days) * DAY_MS
    }

    pub fn dataset_bounds(&self) -> Option<(i64, i64)> {
        Some((self.dataset_min_ms?, self.dataset_max_ms?))
    }

    pub fn compute_window<I>(&mut self, timestamps: I) -> Option<WindowRange>
    where
        I: IntoIterator<Item = i64>,
    {
        let (min, max) = timestamps
            .into_iter()
            .fold(None, |bounds: Option<(i64, i64)>, timestamp| match bounds {
                Some((min, max)) => Some((min.min(timestamp), max.max(timestamp))),
                None => Some((timestamp, timestamp)),
            })?;
        self.dataset_min_ms = Some(min);
        self.dataset_max_ms = Some(max);

        let center = *self.center_ms.get_or_insert(max);
        let span = self.span_ms();
        if max - min < span {
            return Some(WindowRange {
                start: min,
                end: max,
                windowed: false,
            });
        }

        let mut start = center - span / 2;
        let mut end = start + span;
        if start < min {
            start = min;
            end = min + span;
        }
        if end > max {
            end = max;
            start = max - span;
        }

        Some(WindowRange {
            start,
            end,
            windowed: true,
        })
    }

    /// Returns whether the span changed.
    pub fn set_days(&mut self, days: u32) -> bool {
        let days = days.clamp(MIN_DAYS, MAX_DAYS);
        if days == self.days {
            return false;
        }
        self.days = days;
        self.clamp_center();
        true
    }

    pub fn zoom_in(&mut self) -> bool {
        let next = ZOOM_STEPS
            .iter()
            .rev()
            .find(|step| **step < self.days)
            .copied()
            .unwrap_or(MIN_DAYS);
        self.set_days(next)
    }

    pub fn zoom_out(&mut self) -> bool {
        let next = ZOOM_STEPS
            .iter()
            .find(|step| **step > self.days)
            .copied()
            .unwrap_or(MAX_DAYS);
        self.set_days(next)
    }

    pub fn pan_by(&mut self, delta_ms: i64) {
        let Some(center) = self.center_ms.or(self.dataset_max_ms) else {
            return;
        };
        self.center_ms = Some(center.saturating_add(delta_ms));
        self.clamp_center();
    }

    pub fn jump_to_latest(&mut self) {
        self.center_ms = self.dataset_max_ms;
        self.clamp_center();
    }

    fn clamp_center(&mut self) {
        let (Some(center), Some((min, max))) = (self.center_ms, self.dataset_bounds()) else {
            return;
        };
        let half = self.span_ms() / 2;
        let low = min + half;
        let high = max - half;
        if low > high {
            // dataset narrower than the window; rendering collapses to the full range
            return;
        }
        self.center_ms = Some(center.clamp(low, high));
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self::new(7)
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::DAY_MS;

    use super::{MAX_DAYS, TimeWindow, WindowRange};

    const T0: i64 = 1_767_225_600_000;

    #[test]
    fn clamps_week_window_to_dataset_end() {
        let mut window = TimeWindow::new(7);
        let range = window
            .compute_window([T0, T0 + DAY_MS, T0 + 20 * DAY_MS])
            .expect("dataset is not empty");
        assert_eq!(
            range,
            WindowRange {
                start: T0 + 13 * DAY_MS,
                end: T0 + 20 * DAY_MS,
                windowed: true,
            }
        );
    }

    #[test]
    fn small_dataset_collapses_to_full_range() {
        let mut window = TimeWindow::new(7);
        let range = window
            .compute_window([T0, T0 + 2 * DAY_MS])
            .expect("dataset is not empty");
        assert_eq!(range.start, T0);
        assert_eq!(range.end, T0 + 2 * DAY_MS);
        assert!(!range.windowed);

        window.pan_by(-DAY_MS);
        let panned = window
            .compute_window([T0, T0 + 2 * DAY_MS])
            .expect("dataset is not empty");
        assert_eq!(panned, range);
    }

    #[test]
    fn empty_dataset_has_no_window() {
        let mut window = TimeWindow::default();
        assert!(window.compute_window(Vec::new()).is_none());
        window.pan_by(DAY_MS);
        assert_eq!(window.center_ms(), None);
    }

    #[test]
    fn set_days_clamps_into_supported_range() {
        let mut window = TimeWindow::new(7);
        assert!(window.set_days(0));
        assert_eq!(window.days(), 1);
        assert!(window.set_days(90));
        assert_eq!(window.days(), MAX_DAYS);
        assert!(!window.set_days(14));
    }

    #[test]
    fn pan_stops_at_dataset_edges() {
        let timestamps = (0..30).map(|day| T0 + day * DAY_MS).collect::<Vec<_>>();
        let mut window = TimeWindow::new(5);
        window.compute_window(timestamps.iter().copied());

        window.pan_by(-100 * DAY_MS);
        let range = window
            .compute_window(timestamps.iter().copied())
            .expect("dataset is not empty");
        assert_eq!(range.start, T0);
        assert_eq!(range.end, T0 + 5 * DAY_MS);

        window.pan_by(3 * DAY_MS);
        let range = window
            .compute_window(timestamps.iter().copied())
            .expect("dataset is not empty");
        assert_eq!(range.start, T0 + 3 * DAY_MS);
    }

    #[test]
    fn zoom_walks_the_step_ladder() {
        let mut window = TimeWindow::new(7);
        assert!(window.zoom_in());
        assert_eq!(window.days(), 5);
        assert!(window.zoom_out());
        assert!(window.zoom_out());
        assert_eq!(window.days(), 10);
        window.set_days(1);
        assert!(!window.zoom_in());
    }

    #[test]
    fn window_invariants_hold_for_every_span() {
        let datasets: Vec<Vec<i64>> = vec![
            vec![T0],
            vec![T0, T0 + DAY_MS / 2],
            vec![T0, T0 + 3 * DAY_MS, T0 + 9 * DAY_MS],
            (0..40).map(|step| T0 + step * DAY_MS / 3).collect(),
            vec![T0, T0 + 60 * DAY_MS],
        ];

        for dataset in &datasets {
            let min = *dataset.iter().min().expect("non-empty");
            let max = *dataset.iter().max().expect("non-empty");
            for days in 1..=14 {
                let mut window = TimeWindow::new(days);
                for pan in [0, -7 * DAY_MS, 11 * DAY_MS] {
                    window.pan_by(pan);
                    let range = window
                        .compute_window(dataset.iter().copied())
                        .expect("dataset is not empty");
                    assert!(range.start <= range.end);
                    assert!(range.span() <= 14 * DAY_MS);
                    if max - min >= window.span_ms() {
                        assert!(range.start >= min && range.end <= max);
                    }
                }
            }
        }
    }
}
