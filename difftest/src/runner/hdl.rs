use std::process::Command;

use crate::{
    build::BuildArtifacts,
    config::HarnessConfig,
    exec::Executor,
    layout::{TestCase, Testbench},
    outcome::Outcome,
    report,
};

/// Command line of the HDL simulator in batch mode. `nogui` keeps the
/// testbench script from setting up the wave window.
///
/// The script picks up the object code packages of the last build by itself;
/// the image it should have been built from is exported in the environment.
pub(crate) fn hdl_sim_command(
    config: &HarnessConfig,
    tb: &Testbench,
    case: &TestCase,
    artifacts: &BuildArtifacts,
) -> Command {
    let mut cmd = Command::new(&config.hdl_sim_exec);
    cmd.current_dir(&tb.dir)
        .arg("-c")
        .arg("-do")
        .arg(format!("set nogui 1; do {}", tb.script_name()))
        .env("DIFFTEST_TEST_CASE", &case.name)
        .env("DIFFTEST_IMAGE", &artifacts.image)
        .env("DIFFTEST_IMAGE_SHA256", &artifacts.fingerprint);
    cmd
}

/// Run the testbench on the HDL simulator.
///
/// The test case must have been built just before: the memory image is
/// checked against the build fingerprint before the simulator starts.
pub fn rtl_sim(
    config: &HarnessConfig,
    executor: &dyn Executor,
    tb: &Testbench,
    case: &TestCase,
    artifacts: &BuildArtifacts,
    check_output: bool,
) -> anyhow::Result<Outcome> {
    report::progress(format!(
        "Running test case '{}' on RTL test bench entity '{}'...",
        case.name, tb.name
    ));
    tracing::info!("rtl simulation of {} on {}", case.name, tb.name);

    let logs = tb.logs(config);
    logs.delete()?;

    artifacts.verify()?.and_then(|| {
        let mut cmd = hdl_sim_command(config, tb, case, artifacts);
        let status = executor.run(&mut cmd)?;
        super::judge_run(status, &logs, check_output, &config.sentinel_token())
    })
}
