//! Pass condition of a test program, read from its execution log.
//!
//! Test programs end by storing their error count to the testbench message
//! register. Both simulators trace that store as a memory write line such as
//!
//! ```text
//! (BFC00A3C) [FFFF8018] |0F|=00000000 WR
//! ```
//!
//! The last such write in the log is the program's verdict.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
    sync::OnceLock,
};

use anyhow::Context;
use regex::Regex;

use crate::{layout::LogFiles, outcome::Outcome};

/// Last token of a traced memory write.
pub const WRITE_MARKER: &str = "WR";

/// What a test program reported through the sentinel register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentinelReport {
    /// No write to the register at all: the program crashed or never finished.
    Missing,
    /// Error count written by the program, `0` meaning success.
    Reported(u32),
}

impl SentinelReport {
    /// Integer form: the error count, or `-1` when nothing was written.
    pub fn code(&self) -> i64 {
        match self {
            SentinelReport::Missing => -1,
            SentinelReport::Reported(n) => *n as i64,
        }
    }
}

fn value_pattern() -> &'static Regex {
    static VALUE: OnceLock<Regex> = OnceLock::new();
    VALUE.get_or_init(|| Regex::new(r"^[^=]*=([0-9A-Fa-f]+)$").unwrap())
}

/// Payload of `line` if it is a write to `address_token` (e.g. `[FFFF8018]`).
///
/// Anything that does not look like such a write yields `None`.
pub fn parse_sentinel_write(line: &str, address_token: &str) -> Option<u32> {
    let items: Vec<&str> = line.split_whitespace().collect();
    if items.len() < 3 || items.last() != Some(&WRITE_MARKER) || items[1] != address_token {
        return None;
    }
    let caps = value_pattern().captures(items[2])?;
    u32::from_str_radix(&caps[1], 16).ok()
}

/// Scan an execution log for the sentinel register. Last write wins.
///
/// Only failing to open or read the file is an error; unrelated or garbled
/// lines are skipped.
pub fn eval_exec_log(path: &Path, address_token: &str) -> anyhow::Result<SentinelReport> {
    let file = File::open(path)
        .with_context(|| format!("could not open execution log `{}`", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();
    let mut report = SentinelReport::Missing;

    loop {
        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .with_context(|| format!("could not read execution log `{}`", path.display()))?;
        if n == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        if let Some(value) = parse_sentinel_write(&line, address_token) {
            tracing::trace!("sentinel write: {}", line.trim());
            report = SentinelReport::Reported(value);
        }
    }
    Ok(report)
}

/// Decide pass/fail from the execution log of a finished run.
///
/// A missing log fails, as does a log with no sentinel write or a non-zero
/// error count.
pub fn eval_pass_condition(logs: &LogFiles, address_token: &str) -> anyhow::Result<Outcome> {
    if !logs.exec_exists() {
        return Ok(Outcome::fail(format!(
            "Execution log file '{}' missing, marking test as failed.",
            logs.exec.display()
        )));
    }
    let outcome = match eval_exec_log(&logs.exec, address_token)? {
        SentinelReport::Missing => {
            Outcome::fail("SW did not write on TB register TB_MSG_REG, crash suspected.")
        }
        SentinelReport::Reported(0) => Outcome::pass_with("SW reported no errors."),
        SentinelReport::Reported(n) => Outcome::fail(format!("SW reported {n} errors.")),
    };
    Ok(outcome)
}
