//! Problem file tokenizer (spec §6 "Problem description file"), external to
//! the core per spec §1 but needed to drive the CLI end to end.
//!
//! Grounded on `original_source/src/main/dg_main.py`'s `InputTextFile`
//! (comment/blank-line skipping at the line level) and
//! `dg_standard_input.py`'s `DgStandardInput` (a token-at-a-time numeric
//! reader over a pre-tokenised stream) — reshaped here into a lexer over
//! `[`/`]`/numbers followed by a recursive-descent reader, since Rust's
//! ownership model makes a single `Vec<Token>` pass more natural than the
//! original's stateful "next item" object.

use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::engine::SearchLimits;
use crate::error::{EngineError, Result};
use crate::ingest::{OperationRecord, Problem};

const MAX_FILE_BYTES: u64 = 500_000;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
  LBracket,
  RBracket,
  Num(f64),
}

/// Read and fully validate a problem file, producing a [`Problem`] ready for
/// [`crate::ingest::ingest`].
pub fn parse_file(path: &Path) -> Result<Problem> {
  let meta = fs::metadata(path).map_err(|source| EngineError::InputAccess {
    path: path.display().to_string(),
    source,
  })?;
  if meta.len() > MAX_FILE_BYTES {
    return Err(EngineError::InputTooLarge {
      path: path.display().to_string(),
      size: meta.len(),
      limit: MAX_FILE_BYTES,
    });
  }

  let bytes = fs::read(path).map_err(|source| EngineError::InputAccess {
    path: path.display().to_string(),
    source,
  })?;
  let text = decode(&bytes).ok_or_else(|| EngineError::InputEncoding {
    path: path.display().to_string(),
  })?;

  parse_text(&text)
}

fn decode(bytes: &[u8]) -> Option<String> {
  if let Ok(s) = std::str::from_utf8(bytes) {
    return Some(s.to_string());
  }
  let (cow, _, had_errors) = encoding_rs::WINDOWS_1250.decode(bytes);
  if had_errors {
    None
  } else {
    Some(cow.into_owned())
  }
}

fn parse_text(text: &str) -> Result<Problem> {
  let tokens = lex(text);
  let mut reader = Reader {
    tokens: &tokens,
    pos: 0,
    numeric_ordinal: 0,
  };

  reader.expect_lbracket()?;
  let m = reader.expect_uint()? as usize;
  let g = reader.expect_uint()? as usize;
  reader.expect_rbracket()?;

  reader.expect_lbracket()?;
  let max_runtime_secs = reader.expect_num()?;
  let max_depth = reader.expect_int()?;
  let detail_level = reader.expect_int()?;
  reader.expect_rbracket()?;

  if g == 0 || g > m {
    return Err(EngineError::InputValue {
      token_index: reader.numeric_ordinal,
      detail: format!("machine count G={} must satisfy 1 <= G <= M={}", g, m),
    });
  }

  reader.expect_lbracket()?;
  let mut machine_counts = Vec::with_capacity(g);
  for _ in 0..g {
    machine_counts.push(reader.expect_uint()? as usize);
  }
  reader.expect_rbracket()?;
  let counts_sum: usize = machine_counts.iter().sum();
  if counts_sum != m {
    return Err(EngineError::InputValue {
      token_index: reader.numeric_ordinal,
      detail: format!(
        "per-machine operation counts sum to {}, expected M={}",
        counts_sum, m
      ),
    });
  }

  reader.expect_lbracket()?;
  let mut grouped_ids = Vec::with_capacity(m);
  for _ in 0..m {
    grouped_ids.push(reader.expect_uint()?);
  }
  reader.expect_rbracket()?;
  validate_permutation(&grouped_ids, m, &reader)?;

  let mut operations = Vec::with_capacity(m);
  for _ in 0..m {
    reader.expect_lbracket()?;
    let id = reader.expect_uint()?;
    let machine = reader.expect_uint()?;
    let duration = reader.expect_num()?;
    if duration <= 0.0 {
      return Err(EngineError::InputValue {
        token_index: reader.numeric_ordinal,
        detail: format!("duration for operation {} must be positive", id),
      });
    }
    if machine == 0 || machine as usize > g {
      return Err(EngineError::InputValue {
        token_index: reader.numeric_ordinal,
        detail: format!("machine {} out of range 1..{}", machine, g),
      });
    }
    reader.expect_lbracket()?;
    let mut predecessors = Vec::new();
    while !reader.peek_is_rbracket() {
      let p = reader.expect_uint()?;
      if p == id {
        return Err(EngineError::InputValue {
          token_index: reader.numeric_ordinal,
          detail: format!("operation {} lists itself as a predecessor", id),
        });
      }
      predecessors.push(p);
    }
    reader.expect_rbracket()?; // close predecessor list
    reader.expect_rbracket()?; // close operation record

    operations.push(OperationRecord {
      id,
      machine,
      duration,
      predecessors,
    });
  }

  let mut ids: Vec<u32> = operations.iter().map(|o| o.id).collect();
  ids.sort_unstable();
  if ids != (1..=m as u32).collect::<Vec<_>>() {
    return Err(EngineError::InputValue {
      token_index: reader.numeric_ordinal,
      detail: "operation record identifiers are not a permutation of 1..M".to_string(),
    });
  }

  Ok(Problem {
    n_ops: m,
    n_machines: g,
    limits: SearchLimits {
      max_runtime: if max_runtime_secs > 0.0 {
        Duration::from_secs_f64(max_runtime_secs)
      } else {
        Duration::from_secs(0)
      },
      max_depth: if max_depth > 0 { max_depth as usize } else { 0 },
      detail_level,
    },
    operations,
  })
}

fn validate_permutation(ids: &[u32], m: usize, reader: &Reader) -> Result<()> {
  let mut sorted = ids.to_vec();
  sorted.sort_unstable();
  if sorted != (1..=m as u32).collect::<Vec<_>>() {
    return Err(EngineError::InputValue {
      token_index: reader.numeric_ordinal,
      detail: "machine-grouped id record is not a permutation of 1..M".to_string(),
    });
  }
  Ok(())
}

/// Strip `#` comments and blank lines, then split into `[`/`]`/number
/// tokens. Commas and whitespace are both treated as separators.
fn lex(text: &str) -> Vec<Token> {
  let mut tokens = Vec::new();
  for line in text.lines() {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
      continue;
    }
    let mut current = String::new();
    let flush = |current: &mut String, tokens: &mut Vec<Token>| {
      if !current.is_empty() {
        if let Ok(n) = current.parse::<f64>() {
          tokens.push(Token::Num(n));
        }
        current.clear();
      }
    };
    for c in line.chars() {
      match c {
        '[' => {
          flush(&mut current, &mut tokens);
          tokens.push(Token::LBracket);
        }
        ']' => {
          flush(&mut current, &mut tokens);
          tokens.push(Token::RBracket);
        }
        ',' | ' ' | '\t' | '\r' => {
          flush(&mut current, &mut tokens);
        }
        _ => current.push(c),
      }
    }
    flush(&mut current, &mut tokens);
  }
  tokens
}

struct Reader<'a> {
  tokens: &'a [Token],
  pos: usize,
  numeric_ordinal: usize,
}

impl<'a> Reader<'a> {
  fn expect_lbracket(&mut self) -> Result<()> {
    match self.tokens.get(self.pos) {
      Some(Token::LBracket) => {
        self.pos += 1;
        Ok(())
      }
      _ => Err(self.syntax_error("expected '['")),
    }
  }

  fn expect_rbracket(&mut self) -> Result<()> {
    match self.tokens.get(self.pos) {
      Some(Token::RBracket) => {
        self.pos += 1;
        Ok(())
      }
      _ => Err(self.syntax_error("expected ']'")),
    }
  }

  fn peek_is_rbracket(&self) -> bool {
    matches!(self.tokens.get(self.pos), Some(Token::RBracket))
  }

  fn expect_num(&mut self) -> Result<f64> {
    match self.tokens.get(self.pos) {
      Some(Token::Num(n)) => {
        self.pos += 1;
        self.numeric_ordinal += 1;
        Ok(*n)
      }
      _ => Err(self.syntax_error("expected a number")),
    }
  }

  fn expect_int(&mut self) -> Result<i64> {
    let n = self.expect_num()?;
    if n.fract() != 0.0 {
      return Err(EngineError::InputValue {
        token_index: self.numeric_ordinal,
        detail: format!("expected an integer, found {}", n),
      });
    }
    Ok(n as i64)
  }

  fn expect_uint(&mut self) -> Result<u32> {
    let n = self.expect_int()?;
    if n < 0 {
      return Err(EngineError::InputValue {
        token_index: self.numeric_ordinal,
        detail: format!("expected a non-negative integer, found {}", n),
      });
    }
    Ok(n as u32)
  }

  fn syntax_error(&self, detail: &str) -> EngineError {
    EngineError::InputSyntax {
      token_index: self.numeric_ordinal,
      detail: detail.to_string(),
    }
  }
}
