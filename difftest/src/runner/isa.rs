use std::process::Command;

use crate::{
    config::HarnessConfig,
    exec::Executor,
    layout::{TestCase, Testbench},
    outcome::Outcome,
    report,
};

/// Command line of the ISA simulator for one test case, run from inside the
/// test case directory.
pub(crate) fn isa_sim_command(config: &HarnessConfig, case: &TestCase, quiet: bool) -> Command {
    let mut cmd = Command::new(&config.isa_sim_exec);
    cmd.current_dir(&case.dir)
        .arg(format!("--trigger={}", config.trigger_address))
        .arg("--noprompt")
        .arg("--nomips32")
        .arg(format!("--bram={}", case.image_name()))
        .arg(format!("--map={}", case.map_name()))
        .arg(format!("--trace_log={}", config.sw_exec_log));
    if quiet {
        cmd.arg(format!("--conout={}", config.sw_console_log));
    }
    cmd
}

/// Run a test case on the ISA simulator and judge the outcome from its exit
/// status and execution log.
pub fn sw_sim(
    config: &HarnessConfig,
    executor: &dyn Executor,
    tb: &Testbench,
    case: &TestCase,
    check_output: bool,
) -> anyhow::Result<Outcome> {
    report::progress(format!(
        "Running test case '{}' on SW core simulator...",
        case.name
    ));
    tracing::info!("sw simulation of {} (testbench {})", case.name, tb.name);

    let logs = case.logs(config);
    logs.delete()?;

    let mut cmd = isa_sim_command(config, case, executor.output().is_quiet());
    let status = executor.run(&mut cmd)?;
    super::judge_run(status, &logs, check_output, &config.sentinel_token())
}
