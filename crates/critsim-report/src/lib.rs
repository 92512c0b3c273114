//! Assembles the externally defined Result object (§6) from a
//! `critsim_core::Summary` and `RunOutcome`, and renders it as JSON or a
//! set of CSV rollup tables.
//!
//! No statistics are computed here — every number in a [`ResultObject`]
//! is copied or relabeled from the core summary. This module only derives
//! the threshold-based labels (`priority_level`, `risk_level`,
//! `use_case_label`, scenario `recommended_for`) that turn raw numbers
//! into reader-facing categories.

pub mod csv_tables;

use serde::Serialize;

use critsim_core::{CategoryStats, RunOutcome, Summary, TaskStats};

/// Use-case label assigned to each reported percentile, in the fixed
/// order §6 defines them (same order as `critsim_core::aggregate::REPORTED_PERCENTILES`).
const USE_CASE_LABELS: [(u32, &str); 7] = [
    (10, "Optimistic scenario"),
    (25, "Aggressive planning"),
    (50, "Baseline estimate"),
    (75, "Internal planning"),
    (80, "Moderate buffer"),
    (90, "External commitments"),
    (95, "Conservative buffer"),
];

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DurationBlock {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub n: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BufferEntry {
    pub percentile: u32,
    pub days: f64,
    pub buffer_days: f64,
    pub buffer_pct: f64,
    pub use_case_label: &'static str,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TaskCriticalityEntry {
    pub id: String,
    pub name: String,
    pub category: String,
    pub criticality_pct: f64,
    pub priority_level: &'static str,
    pub resource_allocation_hint: &'static str,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SensitivityEntry {
    pub id: String,
    pub name: String,
    pub category: String,
    pub impact_score: f64,
    pub correlation: f64,
    pub variance: f64,
    pub risk_level: &'static str,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategoryEntry {
    pub name: String,
    pub task_count: usize,
    pub mean_duration: f64,
    pub std_duration: f64,
    pub risk_contribution: f64,
    pub avg_criticality_pct: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScenarioEntry {
    pub name: &'static str,
    pub target: f64,
    pub success_probability: f64,
    pub buffer: f64,
    pub recommended_for: &'static str,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Meta {
    pub n_trials_completed: u64,
    pub seed_used: u64,
    pub partial: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ResultObject {
    pub duration: DurationBlock,
    pub percentiles: Vec<(u32, f64)>,
    pub buffers: Vec<BufferEntry>,
    pub task_criticality: Vec<TaskCriticalityEntry>,
    pub sensitivity: Vec<SensitivityEntry>,
    pub categories: Vec<CategoryEntry>,
    pub scenarios: Vec<ScenarioEntry>,
    pub duration_distribution: Vec<f64>,
    pub meta: Meta,
}

/// Build the full Result object for `outcome`, run with `seed_used`.
pub fn build(outcome: &RunOutcome, seed_used: u64) -> ResultObject {
    let summary = &outcome.summary;

    ResultObject {
        duration: duration_block(summary),
        percentiles: summary.percentiles.iter().map(|(&p, &v)| (p, v)).collect(),
        buffers: buffers(summary),
        task_criticality: task_criticality(summary),
        sensitivity: sensitivity(summary),
        categories: categories(summary),
        scenarios: scenarios(summary),
        duration_distribution: summary.sorted_durations.clone(),
        meta: Meta {
            n_trials_completed: outcome.trials_completed,
            seed_used,
            partial: outcome.is_partial(),
        },
    }
}

fn duration_block(summary: &Summary) -> DurationBlock {
    DurationBlock {
        mean: summary.duration.mean,
        std_dev: summary.duration.std_dev,
        min: summary.duration.min,
        max: summary.duration.max,
        n: summary.duration.n,
    }
}

fn buffers(summary: &Summary) -> Vec<BufferEntry> {
    let baseline = summary.percentile(50);
    USE_CASE_LABELS
        .iter()
        .map(|&(p, label)| {
            let days = summary.percentile(p);
            let buffer_days = (days - baseline).max(0.0);
            let buffer_pct = if baseline == 0.0 {
                0.0
            } else {
                100.0 * buffer_days / baseline
            };
            BufferEntry {
                percentile: p,
                days,
                buffer_days,
                buffer_pct,
                use_case_label: label,
            }
        })
        .collect()
}

fn task_criticality(summary: &Summary) -> Vec<TaskCriticalityEntry> {
    summary
        .per_task
        .iter()
        .map(|t: &TaskStats| TaskCriticalityEntry {
            id: t.id.clone(),
            name: t.name.clone(),
            category: t.category.clone(),
            criticality_pct: t.criticality_pct,
            priority_level: t.priority_level().as_str(),
            resource_allocation_hint: t.resource_allocation_hint(),
        })
        .collect()
}

fn sensitivity(summary: &Summary) -> Vec<SensitivityEntry> {
    summary
        .per_task
        .iter()
        .map(|t: &TaskStats| SensitivityEntry {
            id: t.id.clone(),
            name: t.name.clone(),
            category: t.category.clone(),
            impact_score: t.impact_score,
            correlation: t.correlation,
            variance: t.variance,
            risk_level: t.risk_level().as_str(),
        })
        .collect()
}

fn categories(summary: &Summary) -> Vec<CategoryEntry> {
    summary
        .categories
        .iter()
        .map(|c: &CategoryStats| CategoryEntry {
            name: c.name.clone(),
            task_count: c.task_count,
            mean_duration: c.mean_duration,
            std_duration: c.std_duration,
            risk_contribution: c.risk_contribution,
            avg_criticality_pct: c.avg_criticality_pct,
        })
        .collect()
}

fn scenarios(summary: &Summary) -> Vec<ScenarioEntry> {
    let baseline = summary.percentile(50);
    [
        (50u32, "Aggressive", 0.50, "Internal target, high schedule risk"),
        (75, "Moderate", 0.75, "Internal planning baseline"),
        (90, "Conservative", 0.90, "External commitments"),
        (95, "Very_Conservative", 0.95, "Contractual deadlines"),
    ]
    .into_iter()
    .map(|(p, name, success_probability, recommended_for)| {
        let target = summary.percentile(p);
        ScenarioEntry {
            name,
            target,
            success_probability,
            buffer: (target - baseline).max(0.0),
            recommended_for,
        }
    })
    .collect()
}
