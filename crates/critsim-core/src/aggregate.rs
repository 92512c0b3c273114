//! Running statistics accumulated across trials: the duration sample,
//! per-task criticality counts, per-task sensitivity moments, and
//! per-category rollups.
//!
//! An `Aggregate` is cheap to merge (`merge`): every field is either a sum,
//! a count, or sample concatenation, so combining per-worker aggregates
//! from a parallel run is associative and commutative.

use std::collections::BTreeMap;

use crate::dag::Dag;
use crate::trial::TrialScratch;

/// Percentiles the summary reports, per §4.4.
pub const REPORTED_PERCENTILES: [u32; 7] = [10, 25, 50, 75, 80, 90, 95];

/// Accumulates per-trial results into running sums. One per worker during
/// a parallel run; merged once by the orchestrator's coordinator.
#[derive(Debug, Clone)]
pub struct Aggregate {
    task_count: usize,
    durations: Vec<f64>,
    criticality_counts: Vec<u64>,
    sum_d: Vec<f64>,
    sum_d2: Vec<f64>,
    sum_dd: Vec<f64>,
    sum_big_d: f64,
    sum_big_d2: f64,
    n: u64,
}

impl Aggregate {
    pub fn new(task_count: usize) -> Self {
        Self {
            task_count,
            durations: Vec::new(),
            criticality_counts: vec![0; task_count],
            sum_d: vec![0.0; task_count],
            sum_d2: vec![0.0; task_count],
            sum_dd: vec![0.0; task_count],
            sum_big_d: 0.0,
            sum_big_d2: 0.0,
            n: 0,
        }
    }

    /// Fold one completed trial's outcome into the running statistics.
    pub fn record_trial(&mut self, total_duration: f64, scratch: &TrialScratch) {
        self.durations.push(total_duration);
        self.sum_big_d += total_duration;
        self.sum_big_d2 += total_duration * total_duration;
        self.n += 1;

        for i in 0..self.task_count {
            let d = scratch.duration(i);
            self.sum_d[i] += d;
            self.sum_d2[i] += d * d;
            self.sum_dd[i] += total_duration * d;
            if scratch.is_critical(i) {
                self.criticality_counts[i] += 1;
            }
        }
    }

    pub fn trial_count(&self) -> u64 {
        self.n
    }

    /// Merge `other` into `self`. Commutative and associative: callers may
    /// merge per-worker aggregates in any order.
    pub fn merge(&mut self, other: Aggregate) {
        debug_assert_eq!(self.task_count, other.task_count);
        self.durations.extend(other.durations);
        self.sum_big_d += other.sum_big_d;
        self.sum_big_d2 += other.sum_big_d2;
        self.n += other.n;
        for i in 0..self.task_count {
            self.criticality_counts[i] += other.criticality_counts[i];
            self.sum_d[i] += other.sum_d[i];
            self.sum_d2[i] += other.sum_d2[i];
            self.sum_dd[i] += other.sum_dd[i];
        }
    }

    /// Produce the final, immutable `Summary` for `dag`. Sorts the duration
    /// sample once for exact nearest-rank percentile extraction.
    pub fn finalize(mut self, dag: &Dag) -> Summary {
        self.durations
            .sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let n = self.durations.len();
        let duration = DurationStats {
            mean: mean(&self.durations),
            std_dev: population_std_dev(&self.durations),
            min: self.durations.first().copied().unwrap_or(0.0),
            max: self.durations.last().copied().unwrap_or(0.0),
            n,
        };

        let mut percentiles = BTreeMap::new();
        for &p in &REPORTED_PERCENTILES {
            percentiles.insert(p, nearest_rank_percentile(&self.durations, f64::from(p)));
        }

        let n_f = self.n as f64;
        let per_task: Vec<TaskStats> = dag
            .tasks()
            .iter()
            .enumerate()
            .map(|(i, task)| {
                let criticality_pct = if self.n == 0 {
                    0.0
                } else {
                    100.0 * self.criticality_counts[i] as f64 / n_f
                };
                let mean_duration = if n_f == 0.0 { 0.0 } else { self.sum_d[i] / n_f };
                let variance = population_variance_from_sums(self.sum_d[i], self.sum_d2[i], n_f);
                let std_dev = variance.max(0.0).sqrt();
                let correlation = pearson_correlation(
                    n_f,
                    self.sum_big_d,
                    self.sum_d[i],
                    self.sum_big_d2,
                    self.sum_d2[i],
                    self.sum_dd[i],
                );
                let impact_score = correlation * std_dev;

                TaskStats {
                    id: task.id.clone(),
                    name: task.name.clone(),
                    category: task.category.clone(),
                    mean_duration,
                    criticality_pct,
                    correlation,
                    variance,
                    impact_score,
                }
            })
            .collect();

        let categories = rollup_categories(&per_task);

        Summary {
            duration,
            percentiles,
            per_task,
            categories,
            n_trials_completed: self.n,
            sorted_durations: self.durations,
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn population_std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.max(0.0).sqrt()
}

fn population_variance_from_sums(sum: f64, sum_sq: f64, n: f64) -> f64 {
    if n <= 0.0 {
        return 0.0;
    }
    let m = sum / n;
    (sum_sq / n - m * m).max(0.0)
}

/// Pearson correlation of task duration `d_i` against project duration `D`
/// from running sums, per §4.4.
fn pearson_correlation(n: f64, sum_big_d: f64, sum_d: f64, sum_big_d2: f64, sum_d2: f64, sum_dd: f64) -> f64 {
    if n <= 1.0 {
        return 0.0;
    }
    let numerator = n * sum_dd - sum_big_d * sum_d;
    let denom_d = n * sum_big_d2 - sum_big_d * sum_big_d;
    let denom_i = n * sum_d2 - sum_d * sum_d;
    let denom = (denom_d * denom_i).max(0.0).sqrt();
    if denom == 0.0 {
        0.0
    } else {
        (numerator / denom).clamp(-1.0, 1.0)
    }
}

/// Nearest-rank percentile: `S[floor((P/100)*(N-1))]` on a sample already
/// sorted ascending. Always returns an observed sample value.
fn nearest_rank_percentile(sorted: &[f64], percentile: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = ((percentile / 100.0) * (sorted.len() as f64 - 1.0)).floor();
    let idx = (rank as usize).min(sorted.len() - 1);
    sorted[idx]
}

fn rollup_categories(per_task: &[TaskStats]) -> Vec<CategoryStats> {
    let mut by_category: BTreeMap<&str, Vec<&TaskStats>> = BTreeMap::new();
    for task in per_task {
        by_category.entry(task.category.as_str()).or_default().push(task);
    }

    by_category
        .into_iter()
        .map(|(name, tasks)| {
            let task_count = tasks.len();
            // Category mean/std-dev are over per-task mean realized
            // durations, not over the pooled per-trial sample.
            let means: Vec<f64> = tasks.iter().map(|t| t.mean_duration).collect();
            CategoryStats {
                name: name.to_string(),
                task_count,
                mean_duration: mean(&means),
                std_duration: population_std_dev(&means),
                risk_contribution: tasks.iter().map(|t| t.impact_score).sum(),
                avg_criticality_pct: if task_count == 0 {
                    0.0
                } else {
                    tasks.iter().map(|t| t.criticality_pct).sum::<f64>() / task_count as f64
                },
            }
        })
        .collect()
}

/// Summary statistics for the full duration distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct DurationStats {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub n: usize,
}

/// Per-task rollup: criticality, sensitivity, and identity.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskStats {
    pub id: String,
    pub name: String,
    pub category: String,
    pub mean_duration: f64,
    pub criticality_pct: f64,
    pub correlation: f64,
    pub variance: f64,
    pub impact_score: f64,
}

impl TaskStats {
    /// Priority bucket derived from criticality thresholds (>80, 50-80,
    /// 20-50, <20), per §6.
    pub fn priority_level(&self) -> PriorityLevel {
        match self.criticality_pct {
            p if p > 80.0 => PriorityLevel::Critical,
            p if p >= 50.0 => PriorityLevel::High,
            p if p >= 20.0 => PriorityLevel::Medium,
            _ => PriorityLevel::Low,
        }
    }

    /// Resourcing hint derived from the same thresholds as `priority_level`.
    pub fn resource_allocation_hint(&self) -> &'static str {
        match self.priority_level() {
            PriorityLevel::Critical | PriorityLevel::High => "Best resources",
            PriorityLevel::Medium => "Monitor closely",
            PriorityLevel::Low => "Standard",
        }
    }

    /// Risk bucket derived from impact score thresholds, per §6. Compares
    /// the signed score, not its magnitude: a strongly negative impact
    /// score is `Low` risk, not `High`.
    pub fn risk_level(&self) -> RiskLevel {
        let score = self.impact_score;
        if score > 1.0 {
            RiskLevel::High
        } else if score >= 0.4 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityLevel {
    Critical,
    High,
    Medium,
    Low,
}

impl PriorityLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            PriorityLevel::Critical => "Critical",
            PriorityLevel::High => "High",
            PriorityLevel::Medium => "Medium",
            PriorityLevel::Low => "Low",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    High,
    Medium,
    Low,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::High => "High",
            RiskLevel::Medium => "Medium",
            RiskLevel::Low => "Low",
        }
    }
}

/// Per-category rollup.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryStats {
    pub name: String,
    pub task_count: usize,
    pub mean_duration: f64,
    pub std_duration: f64,
    pub risk_contribution: f64,
    pub avg_criticality_pct: f64,
}

/// The complete, finalized simulation summary.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub duration: DurationStats,
    pub percentiles: BTreeMap<u32, f64>,
    pub per_task: Vec<TaskStats>,
    pub categories: Vec<CategoryStats>,
    pub n_trials_completed: u64,
    /// Full per-trial duration sample, sorted ascending.
    pub sorted_durations: Vec<f64>,
}

impl Summary {
    /// Percentile lookup for a value in `REPORTED_PERCENTILES`; `0.0` if
    /// asked for one that wasn't computed.
    pub fn percentile(&self, p: u32) -> f64 {
        self.percentiles.get(&p).copied().unwrap_or(0.0)
    }

    pub fn buffer_at(&self, p: u32) -> f64 {
        (self.percentile(p) - self.percentile(50)).max(0.0)
    }

    pub fn buffer_pct_at(&self, p: u32) -> f64 {
        let baseline = self.percentile(50);
        if baseline == 0.0 {
            0.0
        } else {
            100.0 * self.buffer_at(p) / baseline
        }
    }
}
