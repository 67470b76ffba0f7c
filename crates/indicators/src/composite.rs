//! Helpers shared by composite indicators.

use std::collections::BTreeSet;

use mm_types::Point;

use crate::traits::DependencyBundle;

/// Midpoint substituted for a missing component on a `[0, 1]` scale.
pub const NEUTRAL: f64 = 0.5;

/// Series `key` of dependency `id`, if present and non-empty.
#[must_use]
pub fn dependency_series<'a>(bundle: &'a DependencyBundle, id: &str, key: &str) -> Option<&'a [Point]> {
    bundle
        .get(id)
        .and_then(|out| out.get(key))
        .filter(|points| !points.is_empty())
}

/// Aligns columns on the union of their timestamps.
///
/// Each row carries, per column, the most recent value at or before the
/// row's timestamp (`None` before the column's first point).
#[must_use]
pub fn forward_fill(columns: &[Vec<Point>]) -> Vec<(i64, Vec<Option<f64>>)> {
    let stamps: BTreeSet<i64> = columns
        .iter()
        .flat_map(|c| c.iter().map(|&(ts, _)| ts))
        .collect();

    let mut cursors = vec![0usize; columns.len()];
    let mut last: Vec<Option<f64>> = vec![None; columns.len()];
    let mut rows = Vec::with_capacity(stamps.len());
    for ts in stamps {
        for (i, column) in columns.iter().enumerate() {
            while cursors[i] < column.len() && column[cursors[i]].0 <= ts {
                last[i] = Some(column[cursors[i]].1);
                cursors[i] += 1;
            }
        }
        rows.push((ts, last.clone()));
    }
    rows
}

/// Mean of `values`, `None` when empty.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mm_types::OutputSeries;

    #[test]
    fn test_forward_fill_union() {
        let a = vec![(1, 0.1), (3, 0.3)];
        let b = vec![(2, 0.2)];
        let rows = forward_fill(&[a, b]);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], (1, vec![Some(0.1), None]));
        assert_eq!(rows[1], (2, vec![Some(0.1), Some(0.2)]));
        assert_eq!(rows[2], (3, vec![Some(0.3), Some(0.2)]));
    }

    #[test]
    fn test_dependency_series_ignores_empty() {
        let mut bundle = DependencyBundle::new();
        let mut out = OutputSeries::new();
        out.insert("vov", Vec::new());
        bundle.insert("vol_of_vol".into(), out);
        assert!(dependency_series(&bundle, "vol_of_vol", "vov").is_none());
        assert!(dependency_series(&bundle, "missing", "vov").is_none());
    }
}
