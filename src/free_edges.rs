//! Free-edge enumerator (spec §4.3): walks the current critical path and
//! yields candidate sequencing edges ordered by ascending `delta`.
//!
//! Grounded on `original_source/src/main/szabad_elek__korlatozas_egy_gepen.py`'s
//! `felsorakoztatas`, which walks `kritikus_elozo` backward from the sink and
//! computes the identical `a`/`b`/`c`/`delta` triple for each sequencing
//! transition on the critical path.

use crate::graph::{Graph, OpId};
use crate::path;

/// A candidate machine-order swap discovered on the critical path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequencingEdge {
  pub from: OpId,
  pub to: OpId,
  pub delta: f64,
  pub normal: bool,
}

/// Enumerate free edges from the current critical path, sorted ascending by
/// `delta`. Requires a forward pass with machine arcs to have just run.
pub fn enumerate_free_edges(g: &Graph) -> Vec<SequencingEdge> {
  let mut edges = Vec::new();
  let mut node = g.critical_prev[g.sink];

  while let Some(critical_node) = node {
    if g.is_source(critical_node) {
      break;
    }
    let predecessor = match g.critical_prev[critical_node] {
      Some(p) => p,
      None => break,
    };

    if g.critical_prev_is_sequencing[critical_node] {
      let a = path::second_forward_path(g, critical_node) - g.fwd_before[critical_node];
      let b = path::second_back_path(g, predecessor) - g.back_before[predecessor];
      let c = g.duration[critical_node] + g.duration[predecessor] + a + b;
      let delta = a.max(b).max(c);

      edges.push(SequencingEdge {
        from: predecessor,
        to: critical_node,
        delta,
        normal: true,
      });
    }

    if g.is_source(predecessor) {
      break;
    }
    node = Some(predecessor);
  }

  edges.sort_by(|x, y| x.delta.partial_cmp(&y.delta).unwrap());
  edges
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::graph::EPS;

  #[test]
  fn edges_come_back_sorted_ascending() {
    let edges = vec![
      SequencingEdge {
        from: 0,
        to: 1,
        delta: 5.0,
        normal: true,
      },
      SequencingEdge {
        from: 1,
        to: 2,
        delta: 1.0,
        normal: true,
      },
    ];
    let mut sorted = edges.clone();
    sorted.sort_by(|a, b| a.delta.partial_cmp(&b.delta).unwrap());
    assert!(sorted[0].delta < sorted[1].delta + EPS);
  }

  #[test]
  fn no_sequencing_transitions_yields_no_edges() {
    let mut g = Graph::new(2, 1);
    g.machine_of[0] = Some(0);
    g.machine_of[1] = Some(0);
    g.pred_tech[0] = vec![g.source];
    g.succ_tech[g.source] = vec![0];
    g.pred_tech[1] = vec![0];
    g.succ_tech[0] = vec![1];
    g.succ_tech[1] = vec![g.sink];
    g.pred_tech[g.sink] = vec![1];
    path::forward_longest_paths(&mut g, true).unwrap();
    assert!(enumerate_free_edges(&g).is_empty());
  }
}
