//! One Monte Carlo trial: sample every task duration, run a forward
//! longest-path pass over the topological order, and reconstruct a single
//! critical path by walking back from the project's finish.

use rand::Rng;
use thiserror::Error;

use crate::dag::Dag;
use crate::pert::{self, EstimationFamily};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TrialError {
    #[error("non-finite value computed for task index {task_idx}")]
    NumericOverflow { task_idx: usize },
}

/// Per-trial scratch buffers, sized once and reused across every trial a
/// worker runs. Owned exclusively by one worker; never shared.
pub struct TrialScratch {
    durations: Vec<f64>,
    finishes: Vec<f64>,
    critical: Vec<bool>,
}

impl TrialScratch {
    pub fn new(task_count: usize) -> Self {
        Self {
            durations: vec![0.0; task_count],
            finishes: vec![0.0; task_count],
            critical: vec![false; task_count],
        }
    }

    /// Sampled duration for task `idx` in the trial just run.
    pub fn duration(&self, idx: usize) -> f64 {
        self.durations[idx]
    }

    /// Earliest finish for task `idx` in the trial just run.
    pub fn finish(&self, idx: usize) -> f64 {
        self.finishes[idx]
    }

    /// Whether task `idx` lay on the selected critical path of the trial
    /// just run.
    pub fn is_critical(&self, idx: usize) -> bool {
        self.critical[idx]
    }
}

/// Run one trial against `dag`, sampling durations from `family` using
/// `rng`, and writing per-task results into `scratch`.
///
/// Returns the total project duration `D = max_i finish_i`.
pub fn run_trial(
    dag: &Dag,
    family: EstimationFamily,
    rng: &mut impl Rng,
    scratch: &mut TrialScratch,
) -> Result<f64, TrialError> {
    let tasks = dag.tasks();

    for (i, task) in tasks.iter().enumerate() {
        let d = pert::sample(family, &task.estimate, rng);
        if !d.is_finite() {
            return Err(TrialError::NumericOverflow { task_idx: i });
        }
        scratch.durations[i] = d;
    }

    for &i in dag.topo_order() {
        let task = &tasks[i];
        let early_start = task
            .predecessors
            .iter()
            .map(|&p| scratch.finishes[p])
            .fold(0.0_f64, f64::max);
        let finish = early_start + scratch.durations[i];
        if !finish.is_finite() {
            return Err(TrialError::NumericOverflow { task_idx: i });
        }
        scratch.finishes[i] = finish;
    }

    // Sink: the task with the largest finish; ties broken by lowest
    // insertion index, which falls out of scanning in ascending order and
    // only replacing on a strict improvement.
    let mut sink = 0usize;
    let mut total_duration = scratch.finishes[0];
    for i in 1..tasks.len() {
        if scratch.finishes[i] > total_duration {
            total_duration = scratch.finishes[i];
            sink = i;
        }
    }

    for flag in &mut scratch.critical {
        *flag = false;
    }

    let mut current = sink;
    loop {
        scratch.critical[current] = true;
        let preds = &tasks[current].predecessors;
        if preds.is_empty() {
            break;
        }

        let mut best_pred = preds[0];
        let mut best_finish = scratch.finishes[best_pred];
        for &p in &preds[1..] {
            let f = scratch.finishes[p];
            if f > best_finish || (f == best_finish && p < best_pred) {
                best_finish = f;
                best_pred = p;
            }
        }
        current = best_pred;
    }

    Ok(total_duration)
}
