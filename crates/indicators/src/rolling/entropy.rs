//! Ordinal-pattern (permutation) entropy.
//!
//! Each length-`m` subsequence sampled every `tau` steps is mapped to the
//! permutation that sorts it (ties broken by position), encoded as its
//! Lehmer index in `[0, m!)`. A rolling histogram over the last `W` pattern
//! ids yields the Shannon entropy, optionally normalised by `ln(m!)`.

use std::collections::VecDeque;

use mm_types::Point;
use serde::{Deserialize, Serialize};

/// Smallest supported embedding dimension.
pub const MIN_EMBED_DIM: usize = 3;
/// Largest supported embedding dimension (7! = 5040 patterns).
pub const MAX_EMBED_DIM: usize = 7;
/// Smallest supported pattern window.
pub const MIN_PATTERN_WINDOW: usize = 10;

/// `n!` for small `n`.
#[must_use]
pub fn factorial(n: usize) -> usize {
    (2..=n).product::<usize>().max(1)
}

/// Lehmer index of the stable rank permutation of `sample`.
#[must_use]
pub fn ordinal_pattern(sample: &[f64]) -> usize {
    let m = sample.len();
    let mut order: Vec<usize> = (0..m).collect();
    order.sort_by(|&a, &b| sample[a].total_cmp(&sample[b]));

    let mut code = 0;
    for i in 0..m {
        let smaller = order[i + 1..].iter().filter(|&&o| o < order[i]).count();
        code += smaller * factorial(m - 1 - i);
    }
    code
}

/// Streaming permutation entropy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermutationEntropy {
    embed_dim: usize,
    delay: usize,
    window: usize,
    normalize: bool,
    recent: VecDeque<f64>,
    patterns: VecDeque<usize>,
    counts: Vec<u32>,
}

impl PermutationEntropy {
    /// Returns `None` unless `3 <= embed_dim <= 7`, `delay >= 1` and
    /// `window >= 10`.
    #[must_use]
    pub fn new(embed_dim: usize, delay: usize, window: usize, normalize: bool) -> Option<Self> {
        if !(MIN_EMBED_DIM..=MAX_EMBED_DIM).contains(&embed_dim)
            || delay < 1
            || window < MIN_PATTERN_WINDOW
        {
            return None;
        }
        Some(Self {
            embed_dim,
            delay,
            window,
            normalize,
            recent: VecDeque::with_capacity(Self::span_of(embed_dim, delay)),
            patterns: VecDeque::with_capacity(window),
            counts: vec![0; factorial(embed_dim)],
        })
    }

    fn span_of(embed_dim: usize, delay: usize) -> usize {
        (embed_dim - 1) * delay + 1
    }

    /// Number of raw values one pattern spans.
    #[must_use]
    pub fn span(&self) -> usize {
        Self::span_of(self.embed_dim, self.delay)
    }

    /// Inputs needed before the first value is emitted.
    #[must_use]
    pub fn warmup(&self) -> usize {
        self.span() + self.window - 1
    }

    /// Feeds a value; returns the entropy once `window` patterns exist.
    pub fn push(&mut self, x: f64) -> Option<f64> {
        let span = self.span();
        self.recent.push_back(x);
        if self.recent.len() > span {
            self.recent.pop_front();
        }
        if self.recent.len() < span {
            return None;
        }

        let sample: Vec<f64> = (0..self.embed_dim)
            .map(|k| self.recent[k * self.delay])
            .collect();
        let id = ordinal_pattern(&sample);
        self.patterns.push_back(id);
        self.counts[id] += 1;
        if self.patterns.len() > self.window {
            if let Some(old) = self.patterns.pop_front() {
                self.counts[old] -= 1;
            }
        }
        if self.patterns.len() < self.window {
            return None;
        }
        Some(self.entropy())
    }

    #[allow(clippy::cast_precision_loss)]
    fn entropy(&self) -> f64 {
        let total = self.patterns.len() as f64;
        let h: f64 = self
            .counts
            .iter()
            .filter(|&&c| c > 0)
            .map(|&c| {
                let p = f64::from(c) / total;
                -p * p.ln()
            })
            .sum();
        if self.normalize {
            let max = (factorial(self.embed_dim) as f64).ln();
            (h / max).clamp(0.0, 1.0)
        } else {
            h.max(0.0)
        }
    }
}

/// Rolling permutation entropy of a value series; empty for invalid
/// parameters.
#[must_use]
pub fn permutation_entropy(
    values: &[Point],
    embed_dim: usize,
    delay: usize,
    window: usize,
    normalize: bool,
) -> Vec<Point> {
    let Some(mut pe) = PermutationEntropy::new(embed_dim, delay, window, normalize) else {
        return Vec::new();
    };
    values
        .iter()
        .filter_map(|&(ts, x)| pe.push(x).map(|h| (ts, h)))
        .collect()
}
