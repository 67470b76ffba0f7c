//! Streaming driver shared by every non-composite indicator.
//!
//! A kernel is fed one item at a time. The driver decides whether a call
//! may continue from the caller's [`IncrementalState`] or must recompute
//! the supplied history from scratch:
//!
//! * items with `open_time <= last_open_time` are already represented;
//! * continuation requires either the anchor item (`open_time ==
//!   last_open_time`) right before the new ones, or a first new item
//!   exactly one interval after it, unless the kernel resumes across gaps
//!   ([`StreamKernel::needs_anchor`]);
//! * a state from another indicator, timeframe or parameter set is
//!   ignored.

use mm_types::{OutputSeries, Timeframe, Timestamped};
use tracing::debug;

use crate::error::IndicatorError;
use crate::state::{IncrementalState, KernelState};
use crate::traits::{ComputeOutput, Params};

/// A resumable per-item state machine.
pub trait StreamKernel: Clone {
    /// Input item type.
    type Item: Timestamped;

    /// Consumes one item, appending whatever it emits.
    fn push(&mut self, item: &Self::Item, out: &mut OutputSeries);

    /// Wraps the kernel into its state variant.
    fn into_state(self) -> KernelState;

    /// Extracts a kernel of this family from a state variant.
    fn from_state(state: &KernelState) -> Option<Self>;

    /// Whether continuing requires the new items to follow the last one
    /// without a gap. Sparse streams whose state holds the whole window
    /// return `false`.
    fn needs_anchor() -> bool {
        true
    }
}

/// Identity of the stream a state belongs to.
#[derive(Debug, Clone, Copy)]
pub struct StreamContext<'a> {
    /// Indicator id
    pub indicator_id: &'a str,
    /// Effective parameters
    pub params: &'a Params,
    /// Bar timeframe, `None` for liquidation streams
    pub timeframe: Option<Timeframe>,
    /// Spacing of consecutive items in milliseconds
    pub interval_ms: i64,
}

enum Resume<K> {
    NothingNew,
    Continue(K, usize),
    Restart(&'static str),
}

fn resume<K: StreamKernel>(
    ctx: &StreamContext<'_>,
    items: &[K::Item],
    state: &IncrementalState,
) -> Resume<K> {
    if state.indicator_id != ctx.indicator_id
        || state.timeframe != ctx.timeframe
        || &state.params != ctx.params
    {
        return Resume::Restart("state belongs to another configuration");
    }
    let Some(kernel) = K::from_state(&state.kernel) else {
        return Resume::Restart("state holds another kernel family");
    };

    let last = state.last_open_time;
    let start = items.partition_point(|i| i.open_time() <= last);
    if start == items.len() {
        return Resume::NothingNew;
    }
    if !K::needs_anchor() {
        return Resume::Continue(kernel, start);
    }
    let anchored = start > 0 && items[start - 1].open_time() == last;
    let contiguous = start == 0 && items[0].open_time() == last + ctx.interval_ms;
    if anchored || contiguous {
        Resume::Continue(kernel, start)
    } else {
        Resume::Restart("anchor item missing")
    }
}

fn feed<K: StreamKernel>(
    ctx: &StreamContext<'_>,
    mut kernel: K,
    items: &[K::Item],
) -> ComputeOutput {
    let mut series = OutputSeries::new();
    for item in items {
        kernel.push(item, &mut series);
    }
    let state = items.last().map(|last| IncrementalState {
        indicator_id: ctx.indicator_id.to_string(),
        timeframe: ctx.timeframe,
        params: ctx.params.clone(),
        last_open_time: last.open_time(),
        kernel: kernel.into_state(),
    });
    ComputeOutput {
        series: series.prune_empty(),
        state,
    }
}

/// Runs `items` through a kernel, continuing from `last_state` when allowed.
///
/// # Errors
///
/// Returns [`IndicatorError::ComputationError`] when `items` are not
/// strictly increasing in time.
pub fn run_stream<K, F>(
    ctx: &StreamContext<'_>,
    items: &[K::Item],
    incremental: bool,
    last_state: Option<&IncrementalState>,
    fresh: F,
) -> Result<ComputeOutput, IndicatorError>
where
    K: StreamKernel,
    F: FnOnce() -> K,
{
    if let Some(pair) = items
        .windows(2)
        .find(|w| w[1].open_time() <= w[0].open_time())
    {
        return Err(IndicatorError::computation(format!(
            "{}: input not strictly increasing at open_time {}",
            ctx.indicator_id,
            pair[1].open_time()
        )));
    }

    if let (true, Some(state)) = (incremental, last_state) {
        match resume::<K>(ctx, items, state) {
            Resume::NothingNew => {
                return Ok(ComputeOutput {
                    series: OutputSeries::new(),
                    state: Some(state.clone()),
                })
            }
            Resume::Continue(kernel, start) => return Ok(feed(ctx, kernel, &items[start..])),
            Resume::Restart(reason) => {
                debug!(indicator = ctx.indicator_id, reason, "recomputing from full history");
            }
        }
    }
    Ok(feed(ctx, fresh(), items))
}
