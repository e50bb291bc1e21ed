use std::time::{SystemTime, UNIX_EPOCH};

/// Points shown by the RSRP graph
pub const DISPLAY_WINDOW: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// Milliseconds since the Unix epoch
    pub time: u64,
    pub value: f64,
}

pub trait PointSliceExt {
    fn min_max_value(&self) -> Option<(f64, f64)>;
}

impl PointSliceExt for &[Point] {
    fn min_max_value(&self) -> Option<(f64, f64)> {
        self.iter().fold(None, |acc, point| match acc {
            None => Some((point.value, point.value)),
            Some((min, max)) => Some((min.min(point.value), max.max(point.value))),
        })
    }
}

/// Append-only RSRP readings, bounded to `capacity` points
pub struct RsrpHistory {
    data: Vec<Point>,
    capacity: usize,
}

impl RsrpHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn add_point(&mut self, time: u64, value: f64) {
        if self.data.len() == self.capacity {
            self.data.remove(0);
        }
        self.data.push(Point { time, value });
    }

    pub fn push_now(&mut self, value: f64) {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        self.add_point(now, value);
    }

    pub fn last_points(&self, n: usize) -> &[Point] {
        &self.data[self.data.len().saturating_sub(n)..]
    }

    pub fn last_point(&self) -> Option<Point> {
        self.data.last().copied()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }
}

impl Default for RsrpHistory {
    fn default() -> Self {
        Self::new(DISPLAY_WINDOW)
    }
}
