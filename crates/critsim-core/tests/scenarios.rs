//! Concrete end-to-end scenarios against the public API: linear chains,
//! parallel paths, malformed graphs, and cross-worker determinism.

use critsim_core::dag::{Dag, DagError, Estimate, TaskRecord};
use critsim_core::orchestrate::{run, RunConfig};
use critsim_core::pert::EstimationFamily;

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

#[test]
fn scenario_a_linear_chain_percentiles_near_expected() {
    let dag = Dag::build(vec![
        rec("a", &[], 1.0, 2.0, 3.0),
        rec("b", &["a"], 1.0, 2.0, 3.0),
        rec("c", &["b"], 1.0, 2.0, 3.0),
    ])
    .unwrap();

    let config = RunConfig {
        trials: 10_000,
        workers: 1,
        master_seed: 42,
        family: EstimationFamily::BetaPert,
    };
    let outcome = run(&dag, config, None).unwrap();
    let summary = &outcome.summary;

    assert!((summary.percentile(50) - 6.0).abs() < 0.3);
    assert!((summary.percentile(90) - 7.2).abs() < 0.5);
    for task in &summary.per_task {
        assert!((task.criticality_pct - 100.0).abs() < 1e-9);
    }
}

#[test]
fn scenario_b_parallel_paths_exact_duration_and_criticality() {
    let dag = Dag::build(vec![
        rec("a", &[], 1.0, 1.0, 1.0),
        rec("b", &[], 5.0, 5.0, 5.0),
        rec("c", &["a", "b"], 1.0, 1.0, 1.0),
    ])
    .unwrap();

    let config = RunConfig {
        trials: 500,
        workers: 1,
        master_seed: 1,
        family: EstimationFamily::BetaPert,
    };
    let outcome = run(&dag, config, None).unwrap();
    let summary = &outcome.summary;

    assert_eq!(summary.duration.min, 6.0);
    assert_eq!(summary.duration.max, 6.0);

    let a = summary.per_task.iter().find(|t| t.id == "a").unwrap();
    let b = summary.per_task.iter().find(|t| t.id == "b").unwrap();
    let c = summary.per_task.iter().find(|t| t.id == "c").unwrap();
    assert_eq!(a.criticality_pct, 0.0);
    assert_eq!(b.criticality_pct, 100.0);
    assert_eq!(c.criticality_pct, 100.0);
}

#[test]
fn scenario_c_cycle_is_rejected() {
    let err = Dag::build(vec![rec("a", &["b"]), rec("b", &["a"])]).unwrap_err();
    match err {
        DagError::CyclicDependency { involved } => {
            assert_eq!(involved, vec!["a".to_string(), "b".to_string()]);
        }
        other => panic!("expected CyclicDependency, got {other:?}"),
    }
}

#[test]
fn scenario_d_unknown_predecessor_is_rejected() {
    let err = Dag::build(vec![rec("b", &["x"])]).unwrap_err();
    assert_eq!(
        err,
        DagError::UnknownPredecessor {
            task: "b".to_string(),
            missing: "x".to_string(),
        }
    );
}

#[test]
fn scenario_e_degenerate_estimate_is_rejected() {
    let mut task = rec("a", &[]);
    task.estimate = Estimate::new(5.0, 5.0, 1.0);
    let err = Dag::build(vec![task]).unwrap_err();
    assert!(matches!(err, DagError::InvalidEstimate { .. }));
}

#[test]
fn scenario_f_w1_and_w8_are_byte_identical() {
    let dag = Dag::build(vec![
        rec("a", &[], 1.0, 2.0, 3.0),
        rec("b", &["a"], 2.0, 4.0, 9.0),
        rec("c", &["a"], 1.0, 1.5, 4.0),
        rec("d", &["b", "c"], 1.0, 2.0, 3.0),
    ])
    .unwrap();

    let base = RunConfig {
        trials: 10_000,
        workers: 1,
        master_seed: 7,
        family: EstimationFamily::BetaPert,
    };
    let out_w1 = run(&dag, base, None).unwrap();
    let out_w8 = run(&dag, RunConfig { workers: 8, ..base }, None).unwrap();

    assert_eq!(out_w1.trials_completed, out_w8.trials_completed);
    for p in [10, 25, 50, 75, 80, 90, 95] {
        assert_eq!(out_w1.summary.percentile(p), out_w8.summary.percentile(p));
    }
    assert_eq!(out_w1.summary.duration.mean, out_w8.summary.duration.mean);
    assert_eq!(out_w1.summary.duration.std_dev, out_w8.summary.duration.std_dev);
}
