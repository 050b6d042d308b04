//! Path evaluator (spec §4.1): forward/backward longest-path passes with and
//! without machine-order arcs, and critical-predecessor tracking.
//!
//! Grounded on the teacher's `get_release_times_from_pre_succ_relations` /
//! `get_tail_times_from_pre_succ_relations` (`solver.rs`), which already run
//! exactly this BFS-relaxation-with-a-readiness-counter shape over a
//! `pre`/`succ` pair of arrays; here it is generalised to optionally include
//! the machine-order arc and to track the critical predecessor.
//!
//! [`second_back_path`]'s technological-successor term uses the *forward*
//! arrival quantity, not a backward one — this looks asymmetric but mirrors
//! `masodik_ut_nyeloig` in `original_source/src/main/diszjunktiv_graf.py`
//! verbatim (`seged = max(seged, csatolo.szomszed.forrastol2)`); see
//! DESIGN.md.

use std::collections::VecDeque;

use crate::error::{EngineError, Result};
use crate::graph::{Graph, OpId, EPS};

/// Forward longest-path pass from `source`. When `include_machine_arcs` is
/// true, `machine_prev`/`machine_next` arcs are relaxed alongside
/// technological ones; this is the pass used to compute the makespan.
pub fn forward_longest_paths(g: &mut Graph, include_machine_arcs: bool) -> Result<()> {
  g.reset();
  let n = g.len();
  let mut remaining: Vec<u32> = (0..n)
    .map(|op| effective_in_degree(g, op, include_machine_arcs))
    .collect();

  let mut queue = VecDeque::new();
  queue.push_back(g.source);
  let mut released = 0usize;

  while let Some(cur) = queue.pop_front() {
    released += 1;
    let base = g.fwd_after(cur);
    for k in 0..g.succ_tech[cur].len() {
      let succ = g.succ_tech[cur][k];
      relax_forward(g, &mut remaining, &mut queue, cur, succ, false, base);
    }
    if include_machine_arcs {
      if let Some(succ) = g.machine_next[cur] {
        relax_forward(g, &mut remaining, &mut queue, cur, succ, true, base);
      }
    }
  }

  if released != n {
    return Err(EngineError::Cyclic);
  }
  Ok(())
}

/// Backward longest-path pass from `sink`, symmetric to the forward pass.
pub fn backward_longest_paths(g: &mut Graph, include_machine_arcs: bool) -> Result<()> {
  // Only back_before/critical state is reset by `reset`, already invoked by
  // the caller's forward pass in the usual sequencing; but a standalone
  // backward pass must still seed its sentinels.
  let n = g.len();
  for op in 0..n {
    g.back_before[op] = -1.0;
  }
  g.back_before[g.sink] = 0.0;

  let mut remaining: Vec<u32> = (0..n)
    .map(|op| effective_out_degree(g, op, include_machine_arcs))
    .collect();

  let mut queue = VecDeque::new();
  queue.push_back(g.sink);
  let mut released = 0usize;

  while let Some(cur) = queue.pop_front() {
    released += 1;
    let base = g.back_after(cur);
    for k in 0..g.pred_tech[cur].len() {
      let pred = g.pred_tech[cur][k];
      relax_backward(g, &mut remaining, &mut queue, pred, base);
    }
    if include_machine_arcs {
      if let Some(pred) = g.machine_prev[cur] {
        relax_backward(g, &mut remaining, &mut queue, pred, base);
      }
    }
  }

  if released != n {
    return Err(EngineError::Cyclic);
  }
  Ok(())
}

fn effective_in_degree(g: &Graph, op: OpId, include_machine_arcs: bool) -> u32 {
  g.pred_tech[op].len() as u32
    + if include_machine_arcs && g.machine_prev[op].is_some() {
      1
    } else {
      0
    }
}

fn effective_out_degree(g: &Graph, op: OpId, include_machine_arcs: bool) -> u32 {
  g.succ_tech[op].len() as u32
    + if include_machine_arcs && g.machine_next[op].is_some() {
      1
    } else {
      0
    }
}

/// Relax one forward edge `cur -> target`. `via_sequencing` is true for
/// machine-order arcs; the critical-predecessor flag set here additionally
/// requires the absence of an equivalent technological arc (spec §4.1).
fn relax_forward(
  g: &mut Graph,
  remaining: &mut [u32],
  queue: &mut VecDeque<OpId>,
  cur: OpId,
  target: OpId,
  via_sequencing: bool,
  base: f64,
) {
  if base > g.fwd_before[target] + EPS {
    g.fwd_before[target] = base;
    g.critical_prev[target] = Some(cur);
    g.critical_prev_is_sequencing[target] = via_sequencing && !g.pred_tech[target].contains(&cur);
  }
  remaining[target] -= 1;
  if remaining[target] == 0 {
    queue.push_back(target);
  }
}

fn relax_backward(
  g: &mut Graph,
  remaining: &mut [u32],
  queue: &mut VecDeque<OpId>,
  target: OpId,
  base: f64,
) {
  if base > g.back_before[target] + EPS {
    g.back_before[target] = base;
  }
  remaining[target] -= 1;
  if remaining[target] == 0 {
    queue.push_back(target);
  }
}

/// Longest path reaching `op` through a predecessor other than the one
/// currently on the critical path (the "second" forward path), used by the
/// free-edge enumerator's delta computation.
pub fn second_forward_path(g: &Graph, op: OpId) -> f64 {
  let mut best = 0.0f64;
  let critical = g.critical_prev[op];

  if let Some(mp) = g.machine_prev[op] {
    if Some(mp) != critical {
      best = best.max(g.fwd_after(mp));
    } else if let Some(mpp) = g.machine_prev[mp] {
      // The critical predecessor itself came through the machine arc; the
      // "second" path must skip past it, mirroring `masodik_ut_forrastol`.
      best = best.max(g.fwd_after(mpp));
    }
  }
  for &pred in &g.pred_tech[op] {
    if Some(pred) != critical {
      best = best.max(g.fwd_after(pred));
    }
  }
  best
}

/// Symmetric to [`second_forward_path`], looking toward the sink.
pub fn second_back_path(g: &Graph, op: OpId) -> f64 {
  let mut best = 0.0f64;
  let critical = g.critical_prev[op];

  if let Some(mn) = g.machine_next[op] {
    if Some(op) != g.critical_prev[mn] || critical.is_none() {
      best = best.max(g.back_after(mn));
    } else if let Some(mnn) = g.machine_next[mn] {
      best = best.max(g.back_after(mnn));
    }
  }
  for &succ in &g.succ_tech[op] {
    best = best.max(g.fwd_after(succ));
  }
  best
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::graph::Graph;

  fn two_op_chain(d1: f64, d2: f64) -> Graph {
    let mut g = Graph::new(2, 1);
    g.duration[0] = d1;
    g.duration[1] = d2;
    g.machine_of[0] = Some(0);
    g.machine_of[1] = Some(0);
    g.machine_ops[0] = vec![0, 1];
    g.pred_tech[0] = vec![g.source];
    g.succ_tech[g.source] = vec![0];
    g.pred_tech[1] = vec![0];
    g.succ_tech[0] = vec![1];
    g.succ_tech[1] = vec![g.sink];
    g.pred_tech[g.sink] = vec![1];
    g
  }

  #[test]
  fn forward_pass_without_machine_arcs_sums_durations() {
    let mut g = two_op_chain(3.0, 4.0);
    forward_longest_paths(&mut g, false).unwrap();
    assert!((g.makespan() - 7.0).abs() < EPS);
  }

  #[test]
  fn cyclic_graph_is_rejected() {
    let mut g = Graph::new(2, 1);
    g.pred_tech[0] = vec![1];
    g.succ_tech[1] = vec![0];
    g.pred_tech[1] = vec![0];
    g.succ_tech[0] = vec![1];
    assert!(matches!(
      forward_longest_paths(&mut g, false),
      Err(EngineError::Cyclic)
    ));
  }

  #[test]
  fn backward_pass_matches_forward_on_a_chain() {
    let mut g = two_op_chain(3.0, 4.0);
    forward_longest_paths(&mut g, false).unwrap();
    backward_longest_paths(&mut g, false).unwrap();
    assert!((g.back_after(0) - g.makespan()).abs() < EPS);
  }
}
