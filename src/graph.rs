//! Arena-based Directed Disjunctive Graph model (spec §3).
//!
//! Operations live in a flat arena indexed by `OpId`. Source and sink are two
//! reserved slots at the end of the arena rather than separately heap
//! allocated nodes, so every per-operation attribute is a plain contiguous
//! array (mirroring the teacher's struct-of-arrays `Instance`).

use ndarray::Array1;

pub type OpId = usize;
pub type Machine = usize;

/// Absolute tolerance used throughout the engine for "improved"/"equal"
/// comparisons on path lengths (spec §4.1, §9 — changing it changes which
/// ties are broken which way).
pub const EPS: f64 = 1.0e-10;

#[derive(Debug, Clone)]
pub struct Graph {
  pub n_ops: usize,
  pub n_machines: usize,
  pub source: OpId,
  pub sink: OpId,

  /// External, 1-based identifier for each real operation (for reporting).
  pub external_id: Vec<u32>,
  pub duration: Array1<f64>,
  pub machine_of: Vec<Option<Machine>>,
  /// Operations belonging to each machine, in no particular order.
  pub machine_ops: Vec<Vec<OpId>>,

  /// Technological predecessor/successor adjacency. Fixed after ingestion.
  pub pred_tech: Vec<Vec<OpId>>,
  pub succ_tech: Vec<Vec<OpId>>,

  /// Current machine-order overlay, mutated by conjugation during search.
  pub machine_prev: Vec<Option<OpId>>,
  pub machine_next: Vec<Option<OpId>>,
  /// Best machine order found so far.
  pub opt_prev: Vec<Option<OpId>>,
  pub opt_next: Vec<Option<OpId>>,

  pub fwd_before: Array1<f64>,
  pub back_before: Array1<f64>,

  pub critical_prev: Vec<Option<OpId>>,
  pub critical_prev_is_sequencing: Vec<bool>,
}

impl Graph {
  pub fn new(n_ops: usize, n_machines: usize) -> Self {
    let source = n_ops;
    let sink = n_ops + 1;
    let len = n_ops + 2;
    Graph {
      n_ops,
      n_machines,
      source,
      sink,
      external_id: vec![0; n_ops],
      duration: Array1::from_elem(len, 0.0),
      machine_of: vec![None; len],
      machine_ops: vec![Vec::new(); n_machines],
      pred_tech: vec![Vec::new(); len],
      succ_tech: vec![Vec::new(); len],
      machine_prev: vec![None; len],
      machine_next: vec![None; len],
      opt_prev: vec![None; len],
      opt_next: vec![None; len],
      fwd_before: Array1::from_elem(len, -1.0),
      back_before: Array1::from_elem(len, -1.0),
      critical_prev: vec![None; len],
      critical_prev_is_sequencing: vec![false; len],
    }
  }

  pub fn len(&self) -> usize {
    self.n_ops + 2
  }

  pub fn is_source(&self, op: OpId) -> bool {
    op == self.source
  }

  pub fn is_sink(&self, op: OpId) -> bool {
    op == self.sink
  }

  pub fn fwd_after(&self, op: OpId) -> f64 {
    self.fwd_before[op] + self.duration[op]
  }

  pub fn back_after(&self, op: OpId) -> f64 {
    self.back_before[op] + self.duration[op]
  }

  /// Length of the current critical path — the makespan — once a forward
  /// pass including machine arcs has been run.
  pub fn makespan(&self) -> f64 {
    self.fwd_before[self.sink]
  }

  /// Clear evaluator state in preparation for a fresh pass. `fwd_before`/
  /// `back_before` are reset to a sentinel below any reachable value, except
  /// for the permanent seeds at source (`fwd_before = 0`) and sink
  /// (`back_before = 0`), which are never written to by a pass.
  pub fn reset(&mut self) {
    for op in 0..self.len() {
      self.fwd_before[op] = -1.0;
      self.back_before[op] = -1.0;
      self.critical_prev[op] = None;
      self.critical_prev_is_sequencing[op] = false;
    }
    self.fwd_before[self.source] = 0.0;
    self.back_before[self.sink] = 0.0;
  }

  /// Copy the current machine overlay into the best-known order.
  pub fn adopt_best(&mut self) {
    for op in 0..self.len() {
      self.opt_prev[op] = self.machine_prev[op];
      self.opt_next[op] = self.machine_next[op];
    }
  }

  /// Restore the machine overlay from the best-known order.
  pub fn restore_best(&mut self) {
    for op in 0..self.len() {
      self.machine_prev[op] = self.opt_prev[op];
      self.machine_next[op] = self.opt_next[op];
    }
  }

  /// Walk machine `m`'s order from its head, for testing invariant 2 and for
  /// rendering the final result.
  pub fn machine_order(&self, m: Machine) -> Vec<OpId> {
    self.walk_order(m, &self.machine_prev, &self.machine_next)
  }

  /// Same as [`Graph::machine_order`] but over the best-known (`opt_*`)
  /// overlay, for reporting the adopted solution.
  pub fn opt_machine_order(&self, m: Machine) -> Vec<OpId> {
    self.walk_order(m, &self.opt_prev, &self.opt_next)
  }

  fn walk_order(
    &self,
    m: Machine,
    prev: &[Option<OpId>],
    next: &[Option<OpId>],
  ) -> Vec<OpId> {
    let mut head = None;
    for &op in &self.machine_ops[m] {
      if prev[op].is_none() {
        head = Some(op);
        break;
      }
    }
    let mut order = Vec::with_capacity(self.machine_ops[m].len());
    let mut cur = head;
    while let Some(op) = cur {
      order.push(op);
      cur = next[op];
    }
    order
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn reset_seeds_source_and_sink() {
    let mut g = Graph::new(2, 1);
    g.fwd_before[0] = 42.0;
    g.reset();
    assert_eq!(g.fwd_before[g.source], 0.0);
    assert_eq!(g.back_before[g.sink], 0.0);
    assert_eq!(g.fwd_before[0], -1.0);
    assert_eq!(g.back_before[0], -1.0);
  }

  #[test]
  fn machine_order_walks_head_to_tail() {
    let mut g = Graph::new(3, 1);
    g.machine_ops[0] = vec![0, 1, 2];
    g.machine_next[0] = Some(1);
    g.machine_prev[1] = Some(0);
    g.machine_next[1] = Some(2);
    g.machine_prev[2] = Some(1);
    assert_eq!(g.machine_order(0), vec![0, 1, 2]);
  }
}
