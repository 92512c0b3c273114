//! Splits a run of `N` trials across `W` workers, executes them
//! (optionally via `rayon`), and folds the per-worker partial aggregates
//! into one final `Summary`.
//!
//! Each trial's RNG seed is derived from its global trial index via
//! SplitMix64, not from the worker that happens to run it — so which
//! worker executes a given trial never changes which seed it draws from,
//! and the merge (the only place workers' results touch each other,
//! happening strictly after the parallel region returns) produces an
//! identical result for any `W` given the same master seed and trial
//! count.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use thiserror::Error;

use crate::aggregate::{Aggregate, Summary};
use crate::dag::Dag;
use crate::pert::EstimationFamily;
use crate::trial::{run_trial, TrialError, TrialScratch};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrchestrateError {
    #[error("trial count must be greater than zero")]
    ZeroTrials,

    #[error("worker count must be greater than zero")]
    ZeroWorkers,

    #[error("trial failed: {0}")]
    Trial(#[from] TrialError),
}

/// Run configuration for one simulation.
#[derive(Debug, Clone, Copy)]
pub struct RunConfig {
    pub trials: u64,
    pub workers: u32,
    pub master_seed: u64,
    pub family: EstimationFamily,
}

/// A finished run: the summary plus whether every requested trial
/// actually completed.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub summary: Summary,
    pub trials_requested: u64,
    pub trials_completed: u64,
    pub cancelled: bool,
}

impl RunOutcome {
    pub fn is_partial(&self) -> bool {
        self.cancelled || self.trials_completed < self.trials_requested
    }
}

/// SplitMix64 step, used to derive independent per-worker sub-seeds from
/// one master seed. Same constants as the reference SplitMix64 generator.
fn splitmix64_next(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Derive trial `trial_index`'s seed from the master seed. Keyed by the
/// trial's global index rather than by worker id, so which worker a trial
/// lands on never changes which seed it draws from — partitioning `N`
/// trials differently across workers can't change the sampled ensemble.
fn trial_seed(master_seed: u64, trial_index: u64) -> u64 {
    let mut state = master_seed ^ trial_index.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    splitmix64_next(&mut state)
}

/// Split `trials` across `workers` shares, the last share absorbing the
/// remainder so shares sum exactly to `trials`.
fn worker_shares(trials: u64, workers: u32) -> Vec<u64> {
    let workers = u64::from(workers);
    let base = trials / workers;
    let remainder = trials % workers;
    (0..workers)
        .map(|w| if w < remainder { base + 1 } else { base })
        .collect()
}

/// Starting global trial index for each worker's share, i.e. the
/// exclusive prefix sum of `shares`.
fn worker_offsets(shares: &[u64]) -> Vec<u64> {
    let mut offsets = Vec::with_capacity(shares.len());
    let mut acc = 0u64;
    for &share in shares {
        offsets.push(acc);
        acc += share;
    }
    offsets
}

/// Run `config.trials` trials against `dag`, split across
/// `config.workers` rayon tasks, and fold the result into one `Summary`.
///
/// If `cancel` is set at any point, workers stop taking new trials and the
/// returned `RunOutcome` is marked partial with whatever trials completed.
pub fn run(
    dag: &Dag,
    config: RunConfig,
    cancel: Option<Arc<AtomicBool>>,
) -> Result<RunOutcome, OrchestrateError> {
    if config.trials == 0 {
        return Err(OrchestrateError::ZeroTrials);
    }
    if config.workers == 0 {
        return Err(OrchestrateError::ZeroWorkers);
    }

    let shares = worker_shares(config.trials, config.workers);
    let offsets = worker_offsets(&shares);

    tracing::info!(
        trials = config.trials,
        workers = config.workers,
        seed = config.master_seed,
        "starting simulation run"
    );

    let partials: Vec<Result<(Aggregate, u64), TrialError>> = shares
        .into_iter()
        .zip(offsets)
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(|(share, start_index)| {
            run_worker(dag, config.family, config.master_seed, start_index, share, cancel.as_deref())
        })
        .collect();

    let mut aggregate = Aggregate::new(dag.len());
    let mut trials_completed = 0u64;
    for partial in partials {
        let (worker_aggregate, worker_completed) = partial?;
        trials_completed += worker_completed;
        aggregate.merge(worker_aggregate);
    }

    let cancelled = cancel.as_deref().map(|c| c.load(Ordering::Relaxed)).unwrap_or(false);
    if cancelled {
        tracing::warn!(
            trials_completed,
            trials_requested = config.trials,
            "run cancelled before completion"
        );
    }

    let summary = aggregate.finalize(dag);
    Ok(RunOutcome {
        summary,
        trials_requested: config.trials,
        trials_completed,
        cancelled,
    })
}

/// One worker's share of trials, covering global trial indices
/// `[start_index, start_index + trial_count)`. Each trial gets its own
/// freshly seeded RNG keyed by its global index, so this worker's output
/// doesn't depend on how many other workers are splitting the run.
fn run_worker(
    dag: &Dag,
    family: EstimationFamily,
    master_seed: u64,
    start_index: u64,
    trial_count: u64,
    cancel: Option<&AtomicBool>,
) -> Result<(Aggregate, u64), TrialError> {
    let mut scratch = TrialScratch::new(dag.len());
    let mut aggregate = Aggregate::new(dag.len());
    let mut completed = 0u64;

    for offset in 0..trial_count {
        if let Some(flag) = cancel {
            if flag.load(Ordering::Relaxed) {
                break;
            }
        }
        let mut rng = StdRng::seed_from_u64(trial_seed(master_seed, start_index + offset));
        let duration = run_trial(dag, family, &mut rng, &mut scratch)?;
        aggregate.record_trial(duration, &scratch);
        completed += 1;
    }

    Ok((aggregate, completed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::{Estimate, TaskRecord};

    fn rec(id: &str, preds: &[&str], o: f64, m: f64, p: f64) -> TaskRecord {
        TaskRecord {
            id: id.to_string(),
            name: id.to_string(),
            category: "default".to_string(),
            predecessors: preds.iter().map(|s| s.to_string()).collect(),
            estimate: Estimate::new(o, m, p),
            resources: None,
        }
    }

    fn sample_dag() -> Dag {
        Dag::build(vec![
            rec("a", &[], 1.0, 2.0, 3.0),
            rec("b", &["a"], 2.0, 4.0, 9.0),
            rec("c", &["a"], 1.0, 1.5, 4.0),
            rec("d", &["b", "c"], 1.0, 2.0, 3.0),
        ])
        .unwrap()
    }

    #[test]
    fn worker_shares_sum_to_total_and_balance() {
        assert_eq!(worker_shares(10, 3), vec![4, 3, 3]);
        assert_eq!(worker_shares(9, 3), vec![3, 3, 3]);
        assert_eq!(worker_shares(1, 4), vec![1, 0, 0, 0]);
        assert_eq!(worker_shares(10, 3).iter().sum::<u64>(), 10);
    }

    #[test]
    fn trial_seeds_are_distinct_per_index() {
        let a = trial_seed(42, 0);
        let b = trial_seed(42, 1);
        let c = trial_seed(42, 2);
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);
    }

    #[test]
    fn worker_offsets_are_prefix_sums_of_shares() {
        let shares = worker_shares(10, 3);
        assert_eq!(worker_offsets(&shares), vec![0, 4, 7]);
    }

    #[test]
    fn result_is_identical_regardless_of_worker_count() {
        let dag = sample_dag();
        let config_1 = RunConfig {
            trials: 4000,
            workers: 1,
            master_seed: 123,
            family: EstimationFamily::BetaPert,
        };
        let config_8 = RunConfig {
            workers: 8,
            ..config_1
        };

        let out_1 = run(&dag, config_1, None).unwrap();
        let out_8 = run(&dag, config_8, None).unwrap();

        assert_eq!(out_1.trials_completed, out_8.trials_completed);
        assert_eq!(out_1.summary.percentile(50), out_8.summary.percentile(50));
        assert_eq!(out_1.summary.percentile(90), out_8.summary.percentile(90));
        assert!((out_1.summary.duration.mean - out_8.summary.duration.mean).abs() < 1e-9);
        for (t1, t8) in out_1.summary.per_task.iter().zip(out_8.summary.per_task.iter()) {
            assert_eq!(t1.id, t8.id);
            assert!((t1.criticality_pct - t8.criticality_pct).abs() < 1e-9);
        }
    }

    #[test]
    fn rejects_zero_trials() {
        let dag = sample_dag();
        let config = RunConfig {
            trials: 0,
            workers: 1,
            master_seed: 1,
            family: EstimationFamily::BetaPert,
        };
        assert_eq!(run(&dag, config, None), Err(OrchestrateError::ZeroTrials));
    }

    #[test]
    fn cancellation_produces_partial_outcome() {
        let dag = sample_dag();
        let flag = Arc::new(AtomicBool::new(true));
        let config = RunConfig {
            trials: 1000,
            workers: 4,
            master_seed: 9,
            family: EstimationFamily::BetaPert,
        };
        let outcome = run(&dag, config, Some(flag)).unwrap();
        assert!(outcome.is_partial());
        assert_eq!(outcome.trials_completed, 0);
    }
}
