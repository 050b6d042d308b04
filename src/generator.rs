//! Random-problem synthesiser (spec §4.8): produces acyclic DDGs for
//! stress/regression testing.
//!
//! Grounded on `original_source/src/generate_input/generate_random_dg_problem.py`'s
//! `GrdgControl`/`OperationIntput.establish_dependencies` (machine
//! assignment and predecessor-generation probabilities) and
//! `check_for_cycle`/`break_cycles` (post-hoc cycle detection and removal).
//! RNG usage follows the teacher's `solver/*.rs` pattern of seeding a
//! `rand_chacha::ChaChaRng` explicitly at entry rather than using thread-local
//! randomness, matching spec §5's "process-wide RNG state, explicitly
//! reseeded".

use std::io::Write as _;
use std::path::Path;
use std::time::SystemTime;

use rand::Rng;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaChaRng;

use crate::engine::SearchLimits;
use crate::error::{EngineError, Result};
use crate::ingest::{OperationRecord, Problem};

const DURATION_MIN: f64 = 17.0;
const DURATION_MAX: f64 = 50.0;
const PREDECESSOR_PROBABILITY: f64 = 0.55;
const CLEAR_PREDECESSORS_PROBABILITY: f64 = 0.33;
const ROUND_ROBIN_PROBABILITY: f64 = 0.34;

/// Generate a random acyclic DDG with `m` operations on `g` machines.
pub fn generate_random_problem(m: usize, g: usize, seed: u64) -> Problem {
  let mut rng = ChaChaRng::seed_from_u64(seed);

  let machines = assign_machines(m, g, &mut rng);
  let durations: Vec<f64> = (0..m)
    .map(|_| (rng.gen_range(DURATION_MIN..=DURATION_MAX) * 100.0).round() / 100.0)
    .collect();
  let mut predecessors = assign_predecessors(m, g, &mut rng);

  for preds in predecessors.iter_mut() {
    if rng.gen_bool(CLEAR_PREDECESSORS_PROBABILITY) {
      preds.clear();
    }
  }

  break_cycles(&mut predecessors);

  let operations = (0..m)
    .map(|i| OperationRecord {
      id: (i + 1) as u32,
      machine: machines[i] as u32,
      duration: durations[i],
      predecessors: predecessors[i].iter().map(|&p| (p + 1) as u32).collect(),
    })
    .collect();

  Problem {
    n_ops: m,
    n_machines: g,
    limits: SearchLimits {
      max_runtime: std::time::Duration::from_secs(0),
      max_depth: 0,
      detail_level: 0,
    },
    operations,
  }
}

fn assign_machines(m: usize, g: usize, rng: &mut ChaChaRng) -> Vec<usize> {
  let always_round_robin = (m as f64) <= 2.5 * (g as f64);
  (0..m)
    .map(|i| {
      if always_round_robin || rng.gen_bool(ROUND_ROBIN_PROBABILITY) {
        i % g
      } else {
        rng.gen_range(0..g)
      }
    })
    .collect()
}

fn assign_predecessors(m: usize, g: usize, rng: &mut ChaChaRng) -> Vec<Vec<usize>> {
  let mut predecessors = vec![Vec::new(); m];
  for op in 0..m {
    if !rng.gen_bool(PREDECESSOR_PROBABILITY) {
      continue;
    }
    let count = rng.gen_range(1..=g.max(1));
    let mut chosen: Vec<usize> = Vec::with_capacity(count);
    let mut attempts = 0;
    while chosen.len() < count && attempts < count * 10 {
      attempts += 1;
      let candidate = rng.gen_range(0..m);
      if candidate == op {
        continue; // would create a self-loop
      }
      if chosen.contains(&candidate) {
        continue; // duplicate
      }
      if predecessors[candidate].contains(&op) {
        continue; // immediate mutual dependency
      }
      chosen.push(candidate);
    }
    predecessors[op] = chosen;
  }
  predecessors
}

/// Repeatedly find a cycle in the predecessor graph and break it by dropping
/// the edge the cycle search closed on.
fn break_cycles(predecessors: &mut [Vec<usize>]) {
  loop {
    let (op, pred) = match find_cycle_edge(predecessors) {
      Some(e) => e,
      None => break,
    };
    predecessors[op].retain(|&p| p != pred);
  }
}

/// DFS cycle search; returns the last edge `(op, pred)` on a discovered
/// cycle (`pred` is the most-recently-added predecessor of `op` that closes
/// the loop), or `None` if the graph is acyclic.
fn find_cycle_edge(predecessors: &[Vec<usize>]) -> Option<(usize, usize)> {
  #[derive(Clone, Copy, PartialEq, Eq)]
  enum Mark {
    White,
    Gray,
    Black,
  }
  let m = predecessors.len();
  let mut mark = vec![Mark::White; m];

  fn visit(
    op: usize,
    predecessors: &[Vec<usize>],
    mark: &mut [Mark],
  ) -> Option<(usize, usize)> {
    mark[op] = Mark::Gray;
    for &pred in &predecessors[op] {
      match mark[pred] {
        Mark::Gray => return Some((op, pred)),
        Mark::White => {
          if let Some(edge) = visit(pred, predecessors, mark) {
            return Some(edge);
          }
        }
        Mark::Black => {}
      }
    }
    mark[op] = Mark::Black;
    None
  }

  for start in 0..m {
    if mark[start] == Mark::White {
      if let Some(edge) = visit(start, predecessors, &mut mark) {
        return Some(edge);
      }
    }
  }
  None
}

/// Write `problem` to `path` in the schema of spec §6, with a `#` header
/// carrying generation parameters (Supplement B, grounded on
/// `generate_random_dg_problem.py`'s file header).
pub fn write_generated_file(path: &Path, problem: &Problem, seed: u64) -> Result<()> {
  let mut out = String::new();
  let now = SystemTime::now()
    .duration_since(SystemTime::UNIX_EPOCH)
    .map(|d| d.as_secs())
    .unwrap_or(0);
  out.push_str(&format!("# generated {}\n", now));
  out.push_str(&format!(
    "# M={} G={} seed={}\n",
    problem.n_ops, problem.n_machines, seed
  ));

  out.push_str(&format!("[{}, {}]\n", problem.n_ops, problem.n_machines));
  out.push_str("[0, 0, 0]\n");

  let mut counts = vec![0u32; problem.n_machines];
  for op in &problem.operations {
    counts[(op.machine - 1) as usize] += 1;
  }
  out.push_str(&format!(
    "[{}]\n",
    counts
      .iter()
      .map(|c| c.to_string())
      .collect::<Vec<_>>()
      .join(", ")
  ));

  let mut grouped: Vec<Vec<u32>> = vec![Vec::new(); problem.n_machines];
  for op in &problem.operations {
    grouped[(op.machine - 1) as usize].push(op.id);
  }
  let ids: Vec<String> = grouped
    .into_iter()
    .flatten()
    .map(|id| id.to_string())
    .collect();
  out.push_str(&format!("[{}]\n", ids.join(", ")));

  for op in &problem.operations {
    let preds = op
      .predecessors
      .iter()
      .map(|p| p.to_string())
      .collect::<Vec<_>>()
      .join(", ");
    out.push_str(&format!(
      "[{}, {}, {:.2}, [{}]]\n",
      op.id, op.machine, op.duration, preds
    ));
  }

  let mut file = std::fs::File::create(path).map_err(|source| EngineError::OutputAccess {
    path: path.display().to_string(),
    source,
  })?;
  file
    .write_all(out.as_bytes())
    .map_err(|source| EngineError::OutputAccess {
      path: path.display().to_string(),
      source,
    })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn generated_problem_has_no_cycle() {
    let problem = generate_random_problem(30, 5, 42);
    let predecessors: Vec<Vec<usize>> = problem
      .operations
      .iter()
      .map(|o| o.predecessors.iter().map(|&p| (p - 1) as usize).collect())
      .collect();
    assert!(find_cycle_edge(&predecessors).is_none());
  }

  #[test]
  fn generated_problem_respects_counts() {
    let problem = generate_random_problem(10, 3, 7);
    assert_eq!(problem.operations.len(), 10);
    assert!(problem.operations.iter().all(|o| o.duration > 0.0));
  }
}
