//! Shared plumbing for the two command-line front ends: reading the
//! stdin-schedule file format from spec.md §6. Assembling and simulating
//! themselves live in `tinyvm_asm`/`tinyvm_core`; this crate is only the
//! outer collaborator the spec calls out of scope (CLI parsing, file I/O,
//! logger configuration).

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use tinyvm_core::InputEvent;

#[derive(Debug, Error)]
#[error("input schedule line {line}: {message}")]
pub struct ScheduleError {
    pub line: usize,
    pub message: String,
}

/// Top-level error for both binaries: wraps the failure categories from
/// spec.md §7 (translator, simulator config, runtime) plus the outer I/O
/// this crate itself owns, so `main` has one type to match on.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("reading '{path}': {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error(transparent)]
    Assemble(#[from] tinyvm_asm::Error),
    #[error(transparent)]
    Object(#[from] tinyvm_asm::ObjectError),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error(transparent)]
    Runtime(#[from] tinyvm_core::RuntimeError),
}

pub fn io_err(path: &Path, source: std::io::Error) -> CliError {
    CliError::Io { path: path.to_path_buf(), source }
}

/// Parses one `(tick, 'c')` line, stripping whitespace first per spec.md
/// §6. `tick` is a decimal integer; `c` is exactly one character between
/// single quotes (it may itself be `'`, `(`, `)`, or `,`, so quote-matching
/// happens before whitespace-insensitive splitting).
fn parse_line(raw: &str, line: usize) -> Result<Option<(u64, u8)>, ScheduleError> {
    let trimmed: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let err = |message: &str| ScheduleError { line, message: message.to_string() };

    let body = trimmed
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| err("expected '(tick,'c')'"))?;

    let quote_start = body.find('\'').ok_or_else(|| err("missing quoted character"))?;
    let tick_part = &body[..quote_start];
    let tick_part = tick_part.strip_suffix(',').unwrap_or(tick_part);
    let tick: u64 = tick_part.parse().map_err(|_| err("tick is not a decimal integer"))?;

    let quoted = &body[quote_start..];
    let mut chars = quoted.chars();
    chars.next(); // opening quote
    let ch = chars.next().ok_or_else(|| err("missing character between quotes"))?;
    if chars.next() != Some('\'') {
        return Err(err("character must be exactly one byte between quotes"));
    }

    Ok(Some((tick, ch as u8)))
}

/// Reads the schedule file and appends the implicit `(last_tick+1000, '\0')`
/// sentinel, matching `read_from_input`'s behavior in the reference
/// implementation.
pub fn read_schedule(path: &Path) -> Result<Vec<InputEvent>, CliError> {
    let text = fs::read_to_string(path).map_err(|e| io_err(path, e))?;

    let mut events = Vec::new();
    for (i, raw_line) in text.lines().enumerate() {
        if let Some((tick, ch)) = parse_line(raw_line, i + 1)? {
            events.push(InputEvent { tick, ch });
        }
    }

    Ok(tinyvm_core::with_sentinel(events))
}
