//! Single-machine bound (spec §4.4): a local lower bound per machine from two
//! one-machine-schedule sweeps, aggregated into a multi-machine bound used to
//! prune the search tree.
//!
//! Grounded on `original_source/src/main/szabad_elek__korlatozas_egy_gepen.py`'s
//! `gepen_korlatozas` (the two-sweep, smallest-release-next dispatch
//! simulation) and `finomitasok.py`'s `korlatozas` (the cross-machine
//! aggregation and early-exit test).

use crate::graph::{Graph, Machine, OpId, EPS};

/// Result of bounding a single machine: `lower` is the tighter (larger) of
/// the two sweeps' conservative estimates, `upper` the looser (larger) of
/// the two sweeps' achieved schedule lengths.
#[derive(Debug, Clone, Copy)]
pub struct MachineBound {
  pub lower: f64,
  pub upper: f64,
}

/// Bound on the whole problem, aggregated over every machine.
#[derive(Debug, Clone, Copy)]
pub struct AggregateBound {
  pub bound_low: f64,
  pub bound_high: f64,
}

impl AggregateBound {
  /// Bounding succeeds (the current subtree can be pruned) once `bound_low`
  /// is no longer strictly below `best_makespan`.
  pub fn prunes(&self, best_makespan: f64) -> bool {
    self.bound_low >= best_makespan - EPS
  }
}

/// One sweep of the two-sweep simulation: operations are considered for
/// dispatch in ascending `release_of` order (ties broken by insertion order),
/// while `tail_of` ranks them for the "still-available minimum tail" term.
/// The sort by descending `tail_of` lets that minimum be read off the tail of
/// the remaining slice at each step.
fn sweep(
  ops: &[OpId],
  release_of: impl Fn(OpId) -> f64,
  tail_of: impl Fn(OpId) -> f64,
  duration_of: impl Fn(OpId) -> f64,
) -> (f64, f64) {
  let mut remaining: Vec<OpId> = ops.to_vec();
  remaining.sort_by(|&a, &b| tail_of(b).partial_cmp(&tail_of(a)).unwrap());

  let mut clock = 0.0f64;
  let mut max_path = f64::NEG_INFINITY;
  let mut estimate = f64::NEG_INFINITY;

  while !remaining.is_empty() {
    let idx = remaining
      .iter()
      .enumerate()
      .min_by(|a, b| release_of(*a.1).partial_cmp(&release_of(*b.1)).unwrap())
      .map(|(i, _)| i)
      .unwrap();
    let op = remaining.remove(idx);

    let start = clock.max(release_of(op));
    let completion = start + duration_of(op);
    let candidate_path = completion + tail_of(op);
    if candidate_path > max_path {
      max_path = candidate_path;
    }
    clock = completion;

    let min_tail_remaining = remaining.last().map(|&o| tail_of(o)).unwrap_or(0.0);
    let est = clock + min_tail_remaining;
    if est > estimate {
      estimate = est;
    }
  }

  if ops.is_empty() {
    (0.0, 0.0)
  } else {
    (estimate, max_path)
  }
}

/// Bound a single machine using its operations' current `fwd_before`/
/// `back_before` (computed by a prior evaluator pass that excludes the
/// machine's own arcs, per spec §4.4).
pub fn bound_machine(g: &Graph, machine: Machine) -> MachineBound {
  let ops = &g.machine_ops[machine];

  let (est_fwd, max_fwd) = sweep(
    ops,
    |op| g.fwd_before[op],
    |op| g.back_before[op],
    |op| g.duration[op],
  );
  let (est_back, max_back) = sweep(
    ops,
    |op| g.back_before[op],
    |op| g.fwd_before[op],
    |op| g.duration[op],
  );

  MachineBound {
    lower: est_fwd.max(est_back),
    upper: max_fwd.max(max_back),
  }
}

/// Aggregate the single-machine bound over every machine (spec §4.4, end).
pub fn aggregate(g: &Graph) -> AggregateBound {
  let mut bound_low = f64::NEG_INFINITY;
  let mut bound_high = f64::NEG_INFINITY;
  for m in 0..g.n_machines {
    let b = bound_machine(g, m);
    bound_low = bound_low.max(b.lower);
    bound_high = bound_high.max(b.upper);
  }
  AggregateBound {
    bound_low,
    bound_high,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::graph::Graph;
  use crate::path;

  #[test]
  fn two_ops_one_machine_lower_equals_sum_of_durations() {
    let mut g = Graph::new(2, 1);
    g.duration[0] = 10.0;
    g.duration[1] = 7.0;
    g.machine_of[0] = Some(0);
    g.machine_of[1] = Some(0);
    g.machine_ops[0] = vec![0, 1];
    g.pred_tech[0] = vec![g.source];
    g.succ_tech[g.source] = vec![0, 1];
    g.pred_tech[1] = vec![g.source];
    g.succ_tech[0] = vec![g.sink];
    g.succ_tech[1] = vec![g.sink];
    g.pred_tech[g.sink] = vec![0, 1];

    path::forward_longest_paths(&mut g, false).unwrap();
    path::backward_longest_paths(&mut g, false).unwrap();

    let bound = bound_machine(&g, 0);
    assert!((bound.lower - 17.0).abs() < 1e-9);
  }

  #[test]
  fn prunes_when_bound_low_reaches_best() {
    let agg = AggregateBound {
      bound_low: 17.0,
      bound_high: 17.0,
    };
    assert!(agg.prunes(17.0));
    assert!(!agg.prunes(18.0));
  }
}
