//! Task graph construction and validation.
//!
//! Mirrors the separation of concerns in a classic CPM solver: parsing
//! produces flat task *records*; this module resolves predecessor
//! references into indices, rejects structurally invalid graphs, and
//! computes a stable topological order that every trial reuses.

use std::collections::{HashMap, HashSet, VecDeque};

use thiserror::Error;

/// Stable, opaque task identifier as carried through the task table.
pub type TaskId = String;

/// Three-point duration estimate `(optimistic, most_likely, pessimistic)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub optimistic: f64,
    pub most_likely: f64,
    pub pessimistic: f64,
}

impl Estimate {
    pub fn new(optimistic: f64, most_likely: f64, pessimistic: f64) -> Self {
        Self {
            optimistic,
            most_likely,
            pessimistic,
        }
    }

    fn validate(&self, task: &TaskId) -> Result<(), DagError> {
        let Estimate {
            optimistic: o,
            most_likely: m,
            pessimistic: p,
        } = *self;

        if !o.is_finite() || !m.is_finite() || !p.is_finite() {
            return Err(DagError::InvalidEstimate {
                task: task.clone(),
                reason: "non-finite estimate value".to_string(),
            });
        }
        // Checked in this order so a genuine P<O case is reported as such:
        // O>M or M>P alone don't imply P<O, but P<O is the most specific
        // diagnosis when it holds, so it must be checked first.
        if p < o {
            return Err(DagError::InvalidEstimate {
                task: task.clone(),
                reason: "P<O".to_string(),
            });
        }
        if o > m {
            return Err(DagError::InvalidEstimate {
                task: task.clone(),
                reason: "O>M".to_string(),
            });
        }
        if m > p {
            return Err(DagError::InvalidEstimate {
                task: task.clone(),
                reason: "M>P".to_string(),
            });
        }
        Ok(())
    }
}

/// A task record as it arrives from the task table, before graph resolution.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub id: TaskId,
    pub name: String,
    pub category: String,
    pub predecessors: Vec<TaskId>,
    pub estimate: Estimate,
    pub resources: Option<String>,
}

/// A task resolved into the graph: predecessors are indices, not ids.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub category: String,
    pub estimate: Estimate,
    pub resources: Option<String>,
    /// Indices (into `Dag::tasks`) of this task's predecessors.
    pub predecessors: Vec<usize>,
}

/// Errors constructing a `Dag` from task records.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DagError {
    #[error("zero tasks in task set")]
    Empty,

    #[error("duplicate task id: {0}")]
    DuplicateId(TaskId),

    #[error("task '{task}' depends on unknown task '{missing}'")]
    UnknownPredecessor { task: TaskId, missing: TaskId },

    #[error("cyclic dependency involving tasks: {involved:?}")]
    CyclicDependency { involved: Vec<TaskId> },

    #[error("task '{task}' has invalid estimate: {reason}")]
    InvalidEstimate { task: TaskId, reason: String },
}

/// A validated, schedulable task graph with a precomputed topological order.
///
/// Immutable once built. Shared read-only across all trial executors.
#[derive(Debug)]
pub struct Dag {
    tasks: Vec<Task>,
    index: HashMap<TaskId, usize>,
    /// Topological order, as task indices. Stable across every trial.
    topo_order: Vec<usize>,
}

impl Dag {
    /// Build and validate a `Dag` from task records, in insertion order.
    pub fn build(records: Vec<TaskRecord>) -> Result<Self, DagError> {
        if records.is_empty() {
            return Err(DagError::Empty);
        }

        let mut index: HashMap<TaskId, usize> = HashMap::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            if index.insert(record.id.clone(), i).is_some() {
                return Err(DagError::DuplicateId(record.id.clone()));
            }
        }

        let mut tasks = Vec::with_capacity(records.len());
        for record in &records {
            record.estimate.validate(&record.id)?;

            let mut predecessors = Vec::with_capacity(record.predecessors.len());
            for pred_id in &record.predecessors {
                let &pred_idx = index.get(pred_id).ok_or_else(|| DagError::UnknownPredecessor {
                    task: record.id.clone(),
                    missing: pred_id.clone(),
                })?;
                predecessors.push(pred_idx);
            }

            tasks.push(Task {
                id: record.id.clone(),
                name: record.name.clone(),
                category: record.category.clone(),
                estimate: record.estimate,
                resources: record.resources.clone(),
                predecessors,
            });
        }

        let topo_order = topological_sort(&tasks, &index)?;

        Ok(Self {
            tasks,
            index,
            topo_order,
        })
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Topological order, as task indices. Stable across every trial.
    pub fn topo_order(&self) -> &[usize] {
        &self.topo_order
    }

    pub fn task(&self, idx: usize) -> &Task {
        &self.tasks[idx]
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }
}

/// Kahn's algorithm. Ties among zero-in-degree tasks are broken by lowest
/// insertion index, which is what makes the topological order — and
/// therefore every downstream trial's tie-breaking — deterministic.
fn topological_sort(tasks: &[Task], index: &HashMap<TaskId, usize>) -> Result<Vec<usize>, DagError> {
    let n = tasks.len();
    let mut in_degree = vec![0usize; n];
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); n];

    for (i, task) in tasks.iter().enumerate() {
        in_degree[i] = task.predecessors.len();
        for &pred in &task.predecessors {
            successors[pred].push(i);
        }
    }

    // BinaryHeap would reorder by value; we want strict insertion-index
    // order among ready tasks, so a VecDeque fed in ascending index order
    // via a simple scan is enough and keeps the result deterministic.
    let mut ready: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);
    let mut visited = vec![false; n];

    while let Some(idx) = pop_lowest_ready(&mut ready, &visited) {
        visited[idx] = true;
        order.push(idx);
        for &succ in &successors[idx] {
            in_degree[succ] -= 1;
            if in_degree[succ] == 0 {
                ready.push_back(succ);
            }
        }
    }

    if order.len() != n {
        let remaining: HashSet<usize> = (0..n).filter(|i| !visited[*i]).collect();
        let mut involved: Vec<TaskId> = remaining.into_iter().map(|i| tasks[i].id.clone()).collect();
        involved.sort();
        let _ = index;
        return Err(DagError::CyclicDependency { involved });
    }

    Ok(order)
}

/// Pop the lowest-index ready task. `ready` is small and refilled lazily,
/// so a linear scan is simpler and just as fast as a heap at this scale.
fn pop_lowest_ready(ready: &mut VecDeque<usize>, visited: &[bool]) -> Option<usize> {
    let mut best_pos = None;
    let mut best_idx = usize::MAX;
    for (pos, &idx) in ready.iter().enumerate() {
        if !visited[idx] && idx < best_idx {
            best_idx = idx;
            best_pos = Some(pos);
        }
    }
    best_pos.map(|pos| ready.remove(pos).unwrap())
}
