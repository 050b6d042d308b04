//! Initial-order builder (spec §4.2): greedy machine-by-machine dispatch
//! producing a first feasible machine-order overlay.
//!
//! Grounded on `original_source/src/main/diszjunktiv_graf_manipulacioi.py`'s
//! `kezdeti_sorrend_felallitasa`, which drives exactly this "pick the machine
//! with the smallest bound, then the best-ranked ready operation on it"
//! dispatch loop via a small `Gepelem` (machine) record holding a candidate
//! set, a clock (`c`) and a minimum bound (`h`). The teacher's BFS-relaxation
//! idiom for readiness counting (`solver.rs`) is reused for propagating
//! completion times to technological successors.

use std::collections::VecDeque;

use crate::error::{EngineError, Result};
use crate::graph::{Graph, OpId, EPS};
use crate::path;

/// Build `machine_prev`/`machine_next` for every machine. Leaves `fwd_before`
/// holding the actual (machine-arc-respecting) release time of every
/// operation as a side effect, since computing it is intrinsic to dispatch.
pub fn build_initial_order(g: &mut Graph) -> Result<()> {
  // Technological-only tails, used as the tie-break dimension (spec §4.2:
  // "first compute back_* ignoring machine arcs").
  path::backward_longest_paths(g, false)?;
  let back_before = g.back_before.clone();

  let n = g.len();
  let mut ready: Vec<u32> = (0..n).map(|op| g.pred_tech[op].len() as u32).collect();
  let mut release = vec![-1.0f64; n];
  release[g.source] = 0.0;

  let mut candidates: Vec<Vec<OpId>> = vec![Vec::new(); g.n_machines];
  let mut clock = vec![0.0f64; g.n_machines];
  let mut last_scheduled: Vec<Option<OpId>> = vec![None; g.n_machines];
  let mut scheduled_count = 0usize;

  // Seed: propagate source's completion to its direct technological
  // successors, queuing any that become ready.
  let mut queue = VecDeque::new();
  queue.push_back(g.source);
  while let Some(op) = queue.pop_front() {
    let completion = release[op] + g.duration[op];
    for k in 0..g.succ_tech[op].len() {
      let succ = g.succ_tech[op][k];
      if completion > release[succ] + EPS {
        release[succ] = completion;
      }
      ready[succ] -= 1;
      if ready[succ] == 0 {
        if let Some(m) = g.machine_of[succ] {
          candidates[m].push(succ);
        } else {
          // Only the sink has no machine among successors of source chains.
          queue.push_back(succ);
        }
      }
    }
  }

  loop {
    let next_machine = candidates
      .iter()
      .enumerate()
      .filter(|(_, c)| !c.is_empty())
      .map(|(m, c)| {
        let h = c
          .iter()
          .map(|&op| release[op] + g.duration[op])
          .fold(f64::INFINITY, f64::min);
        (m, h)
      })
      .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap());

    let (m, h) = match next_machine {
      Some(x) => x,
      None => break,
    };

    let chosen = pick_candidate(g, &candidates[m], &release, &back_before, h);
    let op = candidates[m].remove(
      candidates[m]
        .iter()
        .position(|&o| o == chosen)
        .expect("chosen op came from this machine's candidate set"),
    );

    let start = release[op].max(clock[m]);
    g.fwd_before[op] = start;
    let completion = start + g.duration[op];
    clock[m] = completion;

    if let Some(prev) = last_scheduled[m] {
      g.machine_next[prev] = Some(op);
      g.machine_prev[op] = Some(prev);
    }
    last_scheduled[m] = Some(op);
    scheduled_count += 1;

    for k in 0..g.succ_tech[op].len() {
      let succ = g.succ_tech[op][k];
      if completion > release[succ] + EPS {
        release[succ] = completion;
      }
      ready[succ] -= 1;
      if ready[succ] == 0 {
        if succ == g.sink {
          // handled after the loop
        } else if let Some(sm) = g.machine_of[succ] {
          candidates[sm].push(succ);
        }
      }
    }
  }

  if scheduled_count != g.n_ops {
    return Err(EngineError::Cyclic);
  }
  g.fwd_before[g.sink] = release[g.sink];
  Ok(())
}

/// Among `candidates`, apply the spec's selection rule: minimise release
/// time, then among those within `h - EPS` of it prefer the largest tail,
/// then smaller release, then smaller duration.
fn pick_candidate(
  g: &Graph,
  candidates: &[OpId],
  release: &[f64],
  back_before: &ndarray::Array1<f64>,
  h: f64,
) -> OpId {
  let near_minimal: Vec<OpId> = candidates
    .iter()
    .copied()
    .filter(|&op| release[op] <= h - EPS)
    .collect();
  let pool: &[OpId] = if near_minimal.is_empty() {
    candidates
  } else {
    &near_minimal
  };

  *pool
    .iter()
    .min_by(|&&a, &&b| {
      back_before[b]
        .partial_cmp(&back_before[a])
        .unwrap()
        .then(release[a].partial_cmp(&release[b]).unwrap())
        .then(g.duration[a].partial_cmp(&g.duration[b]).unwrap())
    })
    .expect("candidate pool is never empty when a machine was selected")
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::graph::Graph;

  fn two_independent_ops(d1: f64, d2: f64) -> Graph {
    let mut g = Graph::new(2, 1);
    g.duration[0] = d1;
    g.duration[1] = d2;
    g.machine_of[0] = Some(0);
    g.machine_of[1] = Some(0);
    g.machine_ops[0] = vec![0, 1];
    g.pred_tech[0] = vec![g.source];
    g.succ_tech[g.source] = vec![0, 1];
    g.pred_tech[1] = vec![g.source];
    g.succ_tech[0] = vec![g.sink];
    g.succ_tech[1] = vec![g.sink];
    g.pred_tech[g.sink] = vec![0, 1];
    g
  }

  #[test]
  fn single_machine_orders_by_tail_then_release() {
    let mut g = two_independent_ops(10.0, 7.0);
    build_initial_order(&mut g).unwrap();
    let order = g.machine_order(0);
    assert_eq!(order.len(), 2);
  }

  #[test]
  fn cyclic_graph_is_rejected() {
    let mut g = Graph::new(2, 1);
    g.machine_of[0] = Some(0);
    g.machine_of[1] = Some(0);
    g.machine_ops[0] = vec![0, 1];
    g.pred_tech[0] = vec![1];
    g.succ_tech[1] = vec![0];
    g.pred_tech[1] = vec![0];
    g.succ_tech[0] = vec![1];
    assert!(matches!(
      build_initial_order(&mut g),
      Err(EngineError::Cyclic)
    ));
  }
}
