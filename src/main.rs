#[macro_use]
extern crate log;

use std::path::PathBuf;
use std::process;

use clap::{App, Arg};

use ddg_bb::engine::{Engine, IterationOutcome, SearchLimits, TerminationReason};
use ddg_bb::error::{EngineError, Result};
use ddg_bb::generator;
use ddg_bb::graph::Graph;
use ddg_bb::ingest;
use ddg_bb::parser;

fn main() {
  env_logger::init();

  let matches = App::new("ddg-bb")
    .version("1.0")
    .about("Branch-and-bound job-shop scheduler over a directed disjunctive graph")
    .arg(
      Arg::with_name("instance")
        .long("instance")
        .help("Problem description file to solve")
        .takes_value(true)
        .conflicts_with("generate"),
    )
    .arg(
      Arg::with_name("generate")
        .long("generate")
        .value_names(&["M", "G"])
        .help("Synthesise a random M-operation, G-machine problem instead of solving one")
        .conflicts_with("instance"),
    )
    .arg(
      Arg::with_name("out")
        .long("out")
        .help("Where to write a generated problem file (with --generate)")
        .takes_value(true),
    )
    .arg(
      Arg::with_name("seed")
        .long("seed")
        .help("Seed for the random generator")
        .takes_value(true)
        .default_value("1"),
    )
    .get_matches();

  let exit_code = match run(&matches) {
    Ok(()) => 0,
    Err(err) => {
      error!("{}", err);
      err.exit_code()
    }
  };
  process::exit(exit_code);
}

fn run(matches: &clap::ArgMatches) -> Result<()> {
  let seed: u64 = matches
    .value_of("seed")
    .and_then(|s| s.parse().ok())
    .ok_or_else(|| EngineError::Usage("--seed must be a non-negative integer".to_string()))?;

  if let Some(values) = matches.values_of("generate") {
    let dims: Vec<&str> = values.collect();
    let m: usize = dims[0]
      .parse()
      .map_err(|_| EngineError::Usage("M must be a positive integer".to_string()))?;
    let g: usize = dims[1]
      .parse()
      .map_err(|_| EngineError::Usage("G must be a positive integer".to_string()))?;
    if m == 0 || g == 0 || g > m {
      return Err(EngineError::Usage(format!(
        "require 1 <= G <= M, got M={} G={}",
        m, g
      )));
    }
    let problem = generator::generate_random_problem(m, g, seed);
    let out = matches
      .value_of("out")
      .map(PathBuf::from)
      .unwrap_or_else(|| PathBuf::from(format!("generated_{}x{}_{}.txt", m, g, seed)));
    generator::write_generated_file(&out, &problem, seed)?;
    info!("wrote generated problem to {}", out.display());
    return Ok(());
  }

  let instance = matches
    .value_of("instance")
    .ok_or_else(|| EngineError::Usage("either --instance or --generate is required".to_string()))?;
  let problem = parser::parse_file(&PathBuf::from(instance))?;
  let limits = problem.limits;
  let graph = ingest::ingest(&problem)?;

  solve(graph, limits)
}

fn solve(graph: Graph, limits: SearchLimits) -> Result<()> {
  let mut engine = Engine::new(graph, limits);
  let lower_bound = engine.compute_lower_bound()?;
  let initial = engine.build_initial_order()?;
  info!(
    "lower bound = {:.3}, initial makespan = {:.3}",
    lower_bound, initial
  );

  let reason = loop {
    match engine.iterate() {
      IterationOutcome::Terminated(reason) => break reason,
      IterationOutcome::NewBest | IterationOutcome::Progress | IterationOutcome::Pruned => {
        continue;
      }
    }
  };

  let snapshot = engine.snapshot();
  report(&snapshot, reason);
  Ok(())
}

fn report(snapshot: &ddg_bb::engine::Snapshot, reason: TerminationReason) {
  let reason_label = match reason {
    TerminationReason::Normal => "search space exhausted",
    TerminationReason::OptimalProven => "optimal proven against the lower bound",
    TerminationReason::Timeout => "runtime limit reached",
    TerminationReason::Cancelled => "cancelled",
  };
  println!("{}", snapshot.best_makespan);
  println!("# termination: {}", reason_label);
  println!(
    "# lower bound {:.3}, iterations {}, evaluations {}, backtracks {}, repeated-bound cuts {}, successes {}",
    snapshot.initial_lower_bound,
    snapshot.counters.iterations,
    snapshot.counters.evaluations,
    snapshot.counters.backtracks,
    snapshot.counters.repeated_bounds,
    snapshot.counters.successes,
  );
  for (m, order) in snapshot.machine_orders.iter().enumerate() {
    let ids: Vec<String> = order.iter().map(|op| op.to_string()).collect();
    println!("machine {}: {}", m + 1, ids.join(" "));
  }
}
