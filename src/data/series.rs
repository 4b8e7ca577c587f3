use std::path::PathBuf;

use thiserror::Error;

use super::model::{AggregateSeries, Run, RunCollection};

/// Default moving-average window.
pub const DEFAULT_SMOOTH_WINDOW: usize = 10;

// ---------------------------------------------------------------------------
// Aggregation across runs
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum AggregateError {
    #[error("no runs to average")]
    NoRuns,

    #[error(
        "{}: has {found} points but the first run has {expected}; runs must share one time axis",
        path.display()
    )]
    LengthMismatch {
        path: PathBuf,
        expected: usize,
        found: usize,
    },
}

/// Element-wise mean of `n_unoccupied` across every run, on the time axis of
/// the first run.
///
/// All runs must have the same length as the first one; nothing is
/// truncated or padded. The mean is accumulated incrementally
/// (`m += (v - m) / k`), which returns a uniform input unchanged.
pub fn aggregate(runs: &RunCollection) -> Result<AggregateSeries, AggregateError> {
    let first = runs.runs.first().ok_or(AggregateError::NoRuns)?;
    let expected = first.len();

    if let Some(bad) = runs.runs.iter().find(|r| r.len() != expected) {
        return Err(AggregateError::LengthMismatch {
            path: bad.source.clone(),
            expected,
            found: bad.len(),
        });
    }

    let mean = runs
        .runs
        .iter()
        .enumerate()
        .skip(1)
        .fold(first.unoccupied.clone(), |mut mean, (k, run)| {
            let n = (k + 1) as f64;
            for (m, &v) in mean.iter_mut().zip(&run.unoccupied) {
                *m += (v - *m) / n;
            }
            mean
        });

    Ok(AggregateSeries {
        time: first.time.clone(),
        mean,
        n_runs: runs.len(),
    })
}

// ---------------------------------------------------------------------------
// Moving average
// ---------------------------------------------------------------------------

/// Trailing moving average with no padding ("valid" convolution with a box
/// kernel). Output length is `max(0, len - window + 1)`; a zero window
/// yields an empty series.
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    if window == 0 || window > values.len() {
        return Vec::new();
    }
    let w = window as f64;
    values
        .windows(window)
        .map(|chunk| chunk.iter().sum::<f64>() / w)
        .collect()
}

/// Smooth `y` and re-pair it with `x`: the first `window - 1` x values are
/// dropped so each average sits at the time of its last sample.
pub fn smooth_xy(x: &[f64], y: &[f64], window: usize) -> (Vec<f64>, Vec<f64>) {
    let smoothed = moving_average(y, window);
    let skip = x.len().saturating_sub(smoothed.len());
    (x[skip..].to_vec(), smoothed)
}

/// Smoothed copy of a run.
pub fn smooth_run(run: &Run, window: usize) -> Run {
    let (time, unoccupied) = smooth_xy(&run.time, &run.unoccupied, window);
    Run {
        time,
        unoccupied,
        ..run.clone()
    }
}

/// Smoothed copy of an aggregate series.
pub fn smooth_aggregate(series: &AggregateSeries, window: usize) -> AggregateSeries {
    let (time, mean) = smooth_xy(&series.time, &series.mean, window);
    AggregateSeries {
        time,
        mean,
        n_runs: series.n_runs,
    }
}
