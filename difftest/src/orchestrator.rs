//! Sequencing of one test: build the program, run it on the ISA simulator,
//! run it on the RTL testbench, compare both execution logs.
//!
//! Each stage is gated on the previous one. The first failing stage ends the
//! test: a broken build makes both simulations meaningless, and a failed
//! simulation makes the log comparison meaningless.

use std::fmt::Display;

use crate::{
    build::{sw_build, BuildArtifacts, BuildOutcome},
    compare::compare_exec_logs,
    config::HarnessConfig,
    error::ConfigError,
    exec::Executor,
    layout::{TestCase, Testbench},
    outcome::Outcome,
    report,
    runner::{rtl_sim, sw_sim},
};

/// Stages that produce an outcome. Validation and reporting do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Build,
    SoftwareRun,
    HardwareRun,
    Compare,
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Build => "build",
            Stage::SoftwareRun => "sw simulation",
            Stage::HardwareRun => "rtl simulation",
            Stage::Compare => "log comparison",
        };
        f.write_str(s)
    }
}

/// Which stages to run and how strictly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestPlan {
    pub sw: bool,
    pub hw: bool,
    /// Check the error count the program leaves in the sentinel register.
    pub check_output: bool,
    /// Require both execution logs to have the same number of lines.
    pub match_sizes: bool,
}

impl Default for TestPlan {
    fn default() -> Self {
        Self {
            sw: true,
            hw: true,
            check_output: true,
            match_sizes: true,
        }
    }
}

/// Final result of one test case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub test_case: String,
    pub passed: bool,
    /// Every stage that ran, in order, with its outcome.
    pub stages: Vec<(Stage, Outcome)>,
    pub failed_stage: Option<Stage>,
}

impl Verdict {
    pub fn ran(&self, stage: Stage) -> bool {
        self.stages.iter().any(|(s, _)| *s == stage)
    }
}

/// The work behind each stage. [`Toolchain`] runs the real tools.
pub trait Stages {
    fn build(&mut self, tb: &Testbench, case: &TestCase) -> anyhow::Result<BuildOutcome>;
    fn sw_run(
        &mut self,
        tb: &Testbench,
        case: &TestCase,
        check_output: bool,
    ) -> anyhow::Result<Outcome>;
    fn hw_run(
        &mut self,
        tb: &Testbench,
        case: &TestCase,
        artifacts: &BuildArtifacts,
        check_output: bool,
    ) -> anyhow::Result<Outcome>;
    fn compare(
        &mut self,
        tb: &Testbench,
        case: &TestCase,
        match_sizes: bool,
    ) -> anyhow::Result<Outcome>;
}

/// Build tool, ISA simulator and HDL simulator as configured.
pub struct Toolchain<'a> {
    pub config: &'a HarnessConfig,
    pub executor: &'a dyn Executor,
}

impl<'a> Toolchain<'a> {
    pub fn new(config: &'a HarnessConfig, executor: &'a dyn Executor) -> Self {
        Self { config, executor }
    }
}

impl Stages for Toolchain<'_> {
    fn build(&mut self, tb: &Testbench, case: &TestCase) -> anyhow::Result<BuildOutcome> {
        sw_build(self.config, self.executor, tb, case)
    }

    fn sw_run(
        &mut self,
        tb: &Testbench,
        case: &TestCase,
        check_output: bool,
    ) -> anyhow::Result<Outcome> {
        sw_sim(self.config, self.executor, tb, case, check_output)
    }

    fn hw_run(
        &mut self,
        tb: &Testbench,
        case: &TestCase,
        artifacts: &BuildArtifacts,
        check_output: bool,
    ) -> anyhow::Result<Outcome> {
        rtl_sim(self.config, self.executor, tb, case, artifacts, check_output)
    }

    fn compare(
        &mut self,
        tb: &Testbench,
        case: &TestCase,
        match_sizes: bool,
    ) -> anyhow::Result<Outcome> {
        let sw_log = case.logs(self.config).exec;
        let hw_log = tb.logs(self.config).exec;
        let r = compare_exec_logs(&sw_log, &hw_log, match_sizes)?;
        Ok(if r.is_match() {
            Outcome::pass()
        } else {
            Outcome::fail(format!("Exec log mismatch -- {r}"))
        })
    }
}

/// Resolve both names against the configured roots. Failure here is a
/// configuration error, not a failed test.
pub fn validate(
    config: &HarnessConfig,
    tb_name: &str,
    case_name: &str,
) -> Result<(Testbench, TestCase), ConfigError> {
    let case = TestCase::resolve(config, case_name)?;
    let tb = Testbench::resolve(config, tb_name)?;
    Ok((tb, case))
}

struct Progress {
    stages: Vec<(Stage, Outcome)>,
    failed_stage: Option<Stage>,
}

impl Progress {
    /// Record a stage outcome; `true` if the machine may go on.
    fn record(&mut self, stage: Stage, outcome: Outcome) -> bool {
        if let Some(msg) = &outcome.message {
            report::note(msg);
        }
        let passed = outcome.passed;
        if !passed {
            tracing::warn!("{stage} failed: {outcome}");
            self.failed_stage = Some(stage);
        }
        self.stages.push((stage, outcome));
        passed
    }
}

/// Machine state after validation. The build artifacts travel with the
/// states that need them.
enum State {
    Build,
    SoftwareRun(BuildArtifacts),
    HardwareRun(BuildArtifacts),
    Compare,
    Report,
}

/// Run one test case through the stage machine and print its verdict.
///
/// ```text
/// Validate -> Build -> [SoftwareRun] -> [HardwareRun] -> [Compare] -> Report
/// ```
///
/// Compare only runs when both simulations were enabled and both passed.
/// Validation and tool launch errors propagate; every other failure ends up
/// in the verdict.
pub fn run_test(
    config: &HarnessConfig,
    stages: &mut dyn Stages,
    plan: &TestPlan,
    tb_name: &str,
    case_name: &str,
) -> anyhow::Result<Verdict> {
    let (tb, case) = validate(config, tb_name, case_name)?;
    let mut progress = Progress {
        stages: Vec::new(),
        failed_stage: None,
    };
    let mut state = State::Build;

    loop {
        state = match state {
            State::Build => match stages.build(&tb, &case)? {
                BuildOutcome::Built(artifacts) => {
                    progress.record(Stage::Build, Outcome::pass());
                    State::SoftwareRun(artifacts)
                }
                BuildOutcome::Failed(outcome) => {
                    progress.record(Stage::Build, outcome);
                    State::Report
                }
            },
            State::SoftwareRun(artifacts) => {
                if !plan.sw {
                    State::HardwareRun(artifacts)
                } else if progress.record(
                    Stage::SoftwareRun,
                    stages.sw_run(&tb, &case, plan.check_output)?,
                ) {
                    State::HardwareRun(artifacts)
                } else {
                    State::Report
                }
            }
            State::HardwareRun(artifacts) => {
                if !plan.hw {
                    State::Compare
                } else if progress.record(
                    Stage::HardwareRun,
                    stages.hw_run(&tb, &case, &artifacts, plan.check_output)?,
                ) {
                    State::Compare
                } else {
                    State::Report
                }
            }
            State::Compare => {
                if plan.sw && plan.hw {
                    let outcome = stages.compare(&tb, &case, plan.match_sizes)?;
                    progress.record(Stage::Compare, outcome);
                }
                State::Report
            }
            State::Report => break,
        };
    }

    let verdict = Verdict {
        test_case: case.name,
        passed: progress.failed_stage.is_none(),
        stages: progress.stages,
        failed_stage: progress.failed_stage,
    };
    report::print_outcome(&verdict);
    Ok(verdict)
}
