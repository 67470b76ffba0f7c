//! Single-step returns.
//!
//! A return is `0.0` whenever either price is non-positive, so a bad print
//! never produces a NaN or infinity downstream.

/// `ln(cur / prev)`.
#[must_use]
pub fn log_return(prev: f64, cur: f64) -> f64 {
    if prev <= 0.0 || cur <= 0.0 {
        return 0.0;
    }
    (cur / prev).ln()
}

/// `cur / prev - 1`.
#[must_use]
pub fn simple_return(prev: f64, cur: f64) -> f64 {
    if prev <= 0.0 || cur <= 0.0 {
        return 0.0;
    }
    cur / prev - 1.0
}

/// Log or simple return depending on `use_log`.
#[must_use]
pub fn period_return(prev: f64, cur: f64, use_log: bool) -> f64 {
    if use_log {
        log_return(prev, cur)
    } else {
        simple_return(prev, cur)
    }
}
