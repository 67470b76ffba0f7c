//! Keyed time series exchanged between indicators and callers.

use std::collections::BTreeMap;

/// One `(timestamp_ms, value)` sample.
pub type Point = (i64, f64);

/// Mapping from series key to strictly time-ordered points.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct OutputSeries(BTreeMap<String, Vec<Point>>);

impl OutputSeries {
    /// Creates an empty output.
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Inserts (or replaces) a whole series.
    pub fn insert(&mut self, key: impl Into<String>, points: Vec<Point>) {
        self.0.insert(key.into(), points);
    }

    /// Appends one point to `key`, creating the series if needed.
    pub fn push(&mut self, key: &str, ts: i64, value: f64) {
        match self.0.get_mut(key) {
            Some(points) => points.push((ts, value)),
            None => {
                self.0.insert(key.to_string(), vec![(ts, value)]);
            }
        }
    }

    /// Points of one series.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[Point]> {
        self.0.get(key).map(Vec::as_slice)
    }

    /// Series keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Iterates `(key, points)`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Point])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// True when no series holds a point.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }

    /// Total number of points across all series.
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    /// Drops keys that hold no points.
    #[must_use]
    pub fn prune_empty(mut self) -> Self {
        self.0.retain(|_, v| !v.is_empty());
        self
    }

    /// Concatenates `later` onto `self`, key by key.
    pub fn extend(&mut self, later: OutputSeries) {
        for (key, points) in later.0 {
            self.0.entry(key).or_default().extend(points);
        }
    }
}
