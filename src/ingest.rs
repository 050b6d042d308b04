//! Problem ingestion adapter (spec §4.7): turns a validated problem
//! description into a [`Graph`], attaches source/sink, and runs a rigid
//! cycle check.
//!
//! Grounded on `original_source/src/main/diszjunktiv_graf.py`'s
//! `graf_beolvasasa` (construction + source/sink attachment) and
//! `rigid_check_acyclicity`/`check_for_cycle` (the recursive white/gray/black
//! DFS cycle check run once after construction).

use crate::engine::SearchLimits;
use crate::error::{EngineError, Result};
use crate::graph::{Graph, Machine, OpId};

/// One `[id, machine, duration, [p1, p2, ...]]` record (spec §6, record 5).
/// `id`/`machine`/`predecessors` are external, 1-based identifiers.
#[derive(Debug, Clone)]
pub struct OperationRecord {
  pub id: u32,
  pub machine: u32,
  pub duration: f64,
  pub predecessors: Vec<u32>,
}

/// A fully validated problem description, as assumed by spec §4.7: the
/// external parser (`parser.rs`) is responsible for everything this adapter
/// assumes already holds.
#[derive(Debug, Clone)]
pub struct Problem {
  pub n_ops: usize,
  pub n_machines: usize,
  pub limits: SearchLimits,
  pub operations: Vec<OperationRecord>,
}

/// Build the graph and attach source/sink, then check acyclicity.
pub fn ingest(problem: &Problem) -> Result<Graph> {
  let mut g = Graph::new(problem.n_ops, problem.n_machines);

  for rec in &problem.operations {
    let op: OpId = (rec.id - 1) as usize;
    let machine: Machine = (rec.machine - 1) as usize;
    g.external_id[op] = rec.id;
    g.duration[op] = rec.duration;
    g.machine_of[op] = Some(machine);
    g.machine_ops[machine].push(op);
    for &p in &rec.predecessors {
      let pred: OpId = (p - 1) as usize;
      g.pred_tech[op].push(pred);
      g.succ_tech[pred].push(op);
    }
  }

  for op in 0..g.n_ops {
    if g.pred_tech[op].is_empty() {
      g.pred_tech[op].push(g.source);
      g.succ_tech[g.source].push(op);
    }
    if g.succ_tech[op].is_empty() {
      g.succ_tech[op].push(g.sink);
      g.pred_tech[g.sink].push(op);
    }
  }

  check_acyclic(&g)?;
  Ok(g)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
  White,
  Gray,
  Black,
}

/// Recursive DFS cycle check: a back-edge to a Gray node means a cycle.
fn check_acyclic(g: &Graph) -> Result<()> {
  let mut mark = vec![Mark::White; g.len()];
  for start in 0..g.len() {
    if mark[start] == Mark::White {
      visit(g, start, &mut mark)?;
    }
  }
  Ok(())
}

fn visit(g: &Graph, op: OpId, mark: &mut [Mark]) -> Result<()> {
  mark[op] = Mark::Gray;
  for k in 0..g.succ_tech[op].len() {
    let succ = g.succ_tech[op][k];
    match mark[succ] {
      Mark::Gray => return Err(EngineError::Cyclic),
      Mark::White => visit(g, succ, mark)?,
      Mark::Black => {}
    }
  }
  mark[op] = Mark::Black;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  fn limits() -> SearchLimits {
    SearchLimits {
      max_runtime: Duration::from_secs(0),
      max_depth: 0,
      detail_level: 0,
    }
  }

  #[test]
  fn two_independent_ops_ingest_cleanly() {
    let problem = Problem {
      n_ops: 2,
      n_machines: 1,
      limits: limits(),
      operations: vec![
        OperationRecord {
          id: 1,
          machine: 1,
          duration: 10.0,
          predecessors: vec![],
        },
        OperationRecord {
          id: 2,
          machine: 1,
          duration: 7.0,
          predecessors: vec![],
        },
      ],
    };
    let g = ingest(&problem).unwrap();
    assert_eq!(g.n_ops, 2);
    assert_eq!(g.pred_tech[0], vec![g.source]);
    assert_eq!(g.succ_tech[0], vec![g.sink]);
  }

  #[test]
  fn mutual_predecessors_are_rejected_as_cyclic() {
    let problem = Problem {
      n_ops: 2,
      n_machines: 1,
      limits: limits(),
      operations: vec![
        OperationRecord {
          id: 1,
          machine: 1,
          duration: 1.0,
          predecessors: vec![2],
        },
        OperationRecord {
          id: 2,
          machine: 1,
          duration: 1.0,
          predecessors: vec![1],
        },
      ],
    };
    assert!(matches!(ingest(&problem), Err(EngineError::Cyclic)));
  }
}
