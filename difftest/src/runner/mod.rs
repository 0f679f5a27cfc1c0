//! The two simulator runners. Each owns the log files of its own run: it
//! deletes them before launching and only reads them once the simulator
//! has exited.

mod hdl;
mod isa;

pub use hdl::rtl_sim;
pub use isa::sw_sim;

use crate::{evaluate::eval_pass_condition, exec::RunStatus, layout::LogFiles, outcome::Outcome};

/// Turn a finished simulator run into a pass/fail outcome.
///
/// A bad exit status fails without looking at the log. Otherwise the log has
/// to exist and, with `check_output`, carry a zero error count.
pub(crate) fn judge_run(
    status: RunStatus,
    logs: &LogFiles,
    check_output: bool,
    sentinel_token: &str,
) -> anyhow::Result<Outcome> {
    let exited = match status {
        RunStatus::Exited(0) => Outcome::pass(),
        RunStatus::Exited(code) => Outcome::fail(format!("Simulation returned error code {code}.")),
        _ => Outcome::fail(format!("Simulation {status}.")),
    };
    exited.and_then(|| {
        if !logs.exec_exists() {
            return Ok(Outcome::fail("Execution log file not created, test failed."));
        }
        if check_output {
            eval_pass_condition(logs, sentinel_token)
        } else {
            Ok(Outcome::pass())
        }
    })
}
