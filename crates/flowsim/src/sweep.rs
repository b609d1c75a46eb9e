//! Utilities for running many simulations over a grid of rates in parallel.

use std::sync::mpsc::channel;

use itertools::{iproduct, izip};
use serde::{Deserialize, Serialize};
use threadpool::ThreadPool;

use crate::error::{FlowsimError, Result};
use crate::result::Snapshot;
use crate::scheduler::{BLOCKING_RATE, MEAN_HOPS};
use crate::simulation::Simulation;

/// Values from `start` to `stop` (inclusive, up to rounding) with the given step.
pub fn float_range(start: f64, stop: f64, step: f64) -> Vec<f64> {
    if step.is_nan() || step <= 0. || stop < start {
        return Vec::new();
    }
    let count = ((stop - start) / step + 1e-9).floor() as usize + 1;
    (0..count).map(|i| start + step * i as f64).collect()
}

/// Summary of all runs for one pair of rates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub arrival_rate: f64,
    pub service_rate: f64,
    pub runs: usize,
    pub blocking_rate_mean: f64,
    pub blocking_rate_std: f64,
    pub mean_hops_mean: f64,
    pub mean_hops_std: f64,
    /// `(1 - blocking rate) * arrival rate / service rate`
    pub throughput_mean: f64,
    pub throughput_std: f64,
}

fn mean_std(values: &[f64]) -> (f64, f64) {
    let values: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if values.is_empty() {
        return (f64::NAN, f64::NAN);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    (mean, var.sqrt())
}

impl SweepPoint {
    fn from_runs(arrival_rate: f64, service_rate: f64, snapshots: &[Snapshot]) -> Self {
        let value = |name: &str| -> Vec<f64> {
            snapshots
                .iter()
                .map(|s| s.get(name).unwrap_or(f64::NAN))
                .collect()
        };
        let blocking = value(BLOCKING_RATE);
        let throughput: Vec<f64> = blocking
            .iter()
            .map(|br| (1. - br) * arrival_rate / service_rate)
            .collect();
        let (blocking_rate_mean, blocking_rate_std) = mean_std(&blocking);
        let (mean_hops_mean, mean_hops_std) = mean_std(&value(MEAN_HOPS));
        let (throughput_mean, throughput_std) = mean_std(&throughput);
        Self {
            arrival_rate,
            service_rate,
            runs: snapshots.len(),
            blocking_rate_mean,
            blocking_rate_std,
            mean_hops_mean,
            mean_hops_std,
            throughput_mean,
            throughput_std,
        }
    }
}

/// Runs `runs_per_point` copies of an initialized simulation for every pair of rates in a thread
/// pool with `n_workers` worker threads.
///
/// Run `i` uses seed `seed + i`, so the whole sweep is reproducible. Points are returned in
/// row-major order of (arrival rate, service rate).
pub fn parallel_sweep(
    base: &Simulation,
    arrival_rates: &[f64],
    service_rates: &[f64],
    runs_per_point: usize,
    n_workers: usize,
    seed: u64,
) -> Result<Vec<SweepPoint>> {
    base.event_scheduler()?;
    if runs_per_point == 0 || n_workers == 0 {
        return Err(FlowsimError::WrongParameter(
            "sweep needs at least one run per point and one worker".to_string(),
        ));
    }
    let points: Vec<(f64, f64)> = iproduct!(arrival_rates.iter().copied(), service_rates.iter().copied()).collect();
    let jobs: Vec<(f64, f64)> = points
        .iter()
        .flat_map(|point| std::iter::repeat(*point).take(runs_per_point))
        .collect();
    let len = jobs.len();
    let seeds: Vec<u64> = (0..len as u64).map(|i| seed.wrapping_add(i)).collect();

    let pool = ThreadPool::new(n_workers);
    let (tx, rx) = channel();
    for (id, (arrival_rate, service_rate), run_seed) in izip!(0..len, jobs, seeds) {
        let tx = tx.clone();
        let mut sim = base.clone();
        pool.execute(move || {
            sim.set_seed(run_seed);
            let result = sim
                .reset(Some(arrival_rate), Some(service_rate))
                .and_then(|_| sim.launch_simulation());
            // the receiver outlives the pool, a failed send means the sweep was abandoned
            let _ = tx.send((id, result));
        });
    }
    let mut results: Vec<_> = rx.iter().take(len).collect();
    results.sort_by_key(|x| x.0);
    let snapshots = results.into_iter().map(|x| x.1).collect::<Result<Vec<_>>>()?;

    Ok(points
        .iter()
        .zip(snapshots.chunks(runs_per_point))
        .map(|((arrival_rate, service_rate), runs)| SweepPoint::from_runs(*arrival_rate, *service_rate, runs))
        .collect())
}
