//! Line-by-line equivalence of two execution logs.

use std::{fmt::Display, path::Path};

use anyhow::Context;

/// Result of comparing two execution logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparison {
    Match,
    /// Line counts differ and equal lengths were required.
    LengthMismatch { left: usize, right: usize },
    /// First index (0-based) where the trimmed lines differ. Everything after
    /// it is not compared: once the two executions diverge, later lines say
    /// nothing new.
    Diverged {
        index: usize,
        left: String,
        right: String,
    },
}

impl Comparison {
    pub fn is_match(&self) -> bool {
        matches!(self, Comparison::Match)
    }
}

impl Display for Comparison {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Comparison::Match => write!(f, "logs match"),
            Comparison::LengthMismatch { left, right } => {
                write!(f, "Different number of lines ({left} != {right}).")
            }
            Comparison::Diverged { index, left, right } => {
                write!(f, "@{index}: {left} != {right}")
            }
        }
    }
}

fn read_lines(path: &Path) -> anyhow::Result<Vec<String>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("could not read execution log `{}`", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes)
        .lines()
        .map(str::to_string)
        .collect())
}

/// Compare two line sequences, see [`compare_exec_logs`].
pub fn compare_lines<L, R>(left: &[L], right: &[R], match_sizes: bool) -> Comparison
where
    L: AsRef<str>,
    R: AsRef<str>,
{
    if match_sizes && left.len() != right.len() {
        return Comparison::LengthMismatch {
            left: left.len(),
            right: right.len(),
        };
    }
    left.iter()
        .zip(right)
        .map(|(l, r)| (l.as_ref().trim(), r.as_ref().trim()))
        .position(|(l, r)| l != r)
        .map(|index| Comparison::Diverged {
            index,
            left: left[index].as_ref().trim().to_string(),
            right: right[index].as_ref().trim().to_string(),
        })
        .unwrap_or(Comparison::Match)
}

/// Read both logs in full and compare them line by line, ignoring
/// surrounding whitespace. With `match_sizes`, differing line counts are a
/// mismatch on their own; otherwise only the common prefix is compared.
///
/// A missing log is an error, not an empty log.
pub fn compare_exec_logs(
    left: &Path,
    right: &Path,
    match_sizes: bool,
) -> anyhow::Result<Comparison> {
    let left_lines = read_lines(left)?;
    let right_lines = read_lines(right)?;
    let r = compare_lines(&left_lines, &right_lines, match_sizes);
    tracing::debug!(
        "compared {} ({} lines) with {} ({} lines): {r}",
        left.display(),
        left_lines.len(),
        right.display(),
        right_lines.len()
    );
    Ok(r)
}
