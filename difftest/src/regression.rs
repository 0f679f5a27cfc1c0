//! Regression lists: a batch of test cases run one after the other on the
//! same testbench.
//!
//! The list is plain text with one test case name per line. `#` starts a
//! comment; blank lines are skipped.

use std::path::Path;

use crate::{
    config::HarnessConfig,
    error::ConfigError,
    orchestrator::{run_test, validate, Stages, TestPlan, Verdict},
    report,
};

pub fn parse_regression_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn load_regression_list(path: &Path) -> Result<Vec<String>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    let names = parse_regression_list(&content);
    if names.is_empty() {
        return Err(ConfigError::EmptyRegression {
            path: path.to_path_buf(),
        });
    }
    Ok(names)
}

/// Run every listed test case in order and print a summary.
///
/// All names are checked before the first test starts. Test cases share the
/// testbench work directory and its logs, so they never overlap.
pub fn run_regression(
    config: &HarnessConfig,
    stages: &mut dyn Stages,
    plan: &TestPlan,
    tb_name: &str,
    names: &[String],
) -> anyhow::Result<Vec<Verdict>> {
    for name in names {
        validate(config, tb_name, name)?;
    }
    tracing::info!("regression of {} test cases on {}", names.len(), tb_name);

    let mut verdicts = Vec::with_capacity(names.len());
    for name in names {
        verdicts.push(run_test(config, stages, plan, tb_name, name)?);
    }
    report::print_summary(&verdicts);
    Ok(verdicts)
}
