// Run whole tests against stand-in build tool and simulators (shell scripts)
#![cfg(unix)]

use std::{
    collections::HashMap,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
    time::Duration,
};

use difftest::{
    run_regression, run_test, HarnessConfig, OutputMode, ProcessExecutor, Stage, TestPlan,
    Toolchain, Verdict,
};
use interpolator::{format, Formattable};

macro_rules! interp_args {
    ($( $name:ident = $e:expr ),* $(,)?) => {
        &[
            $( (stringify!($name), Formattable::display(&$e)) ),*
        ]
        .into_iter()
        .collect::<HashMap<_, _>>()
    };
}

const BUILD_TOOL: &str = r#"#!/bin/sh
echo build >> "{calls}"
printf 'image of %s' "$(basename "$(pwd)")" > "$(basename "$(pwd)").bin"
exit {code}
"#;

const ISA_SIM: &str = r#"#!/bin/sh
echo sw >> "{calls}"
echo "$@" > isa_args.txt
sleep {delay}
for a in "$@"; do
    case "$a" in
        --trace_log=*) log=$(echo "$a" | sed 's/^--trace_log=//') ;;
    esac
done
if [ -f "{trace}" ]; then cat "{trace}" > "$log"; fi
exit {code}
"#;

const HDL_SIM: &str = r#"#!/bin/sh
echo hw >> "{calls}"
echo "$DIFFTEST_TEST_CASE $DIFFTEST_IMAGE_SHA256" > hdl_env.txt
if [ -f "{trace}" ]; then cat "{trace}" > hw_sim_log.txt; fi
exit {code}
"#;

fn trace(n: usize, errors: u32) -> String {
    let mut s = String::new();
    for i in 0..n {
        s += &std::format!(
            "({:08X}) [{:08X}] |0F|={:08X} WR\n",
            0xBFC0_0000u32 + 4 * i as u32,
            0x8000_0000u32 + 4 * i as u32,
            i
        );
    }
    s += &std::format!("(BFC00F00) [FFFF8018] |0F|={errors:08X} WR\n");
    s
}

/// A scratch tree with one test case `hello`, one testbench `ion_core` and
/// stand-in tools whose behaviour each test tweaks.
struct Bench {
    root: tempfile::TempDir,
    config: HarnessConfig,
    _serial: MutexGuard<'static, ()>,
}

// Writing a script while another test forks can leave the script busy
// (ETXTBSY) when it is executed, so these tests run one at a time.
static SERIAL: Mutex<()> = Mutex::new(());

impl Bench {
    fn new() -> anyhow::Result<Self> {
        let serial = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
        let root = tempfile::tempdir()?;
        let p = root.path();
        let config = HarnessConfig {
            test_root: p.join("sw"),
            hdl_work_root: p.join("modelsim"),
            hdl_sim_exec: p.join("bin/vsim"),
            isa_sim_exec: p.join("bin/ion32sim"),
            build_tool: p.join("bin/make"),
            ..Default::default()
        };
        std::fs::create_dir_all(p.join("bin"))?;
        std::fs::create_dir_all(config.test_case_dir("hello"))?;
        std::fs::create_dir_all(config.testbench_dir("ion_core"))?;
        let bench = Self {
            root,
            config,
            _serial: serial,
        };
        bench.build_tool(0)?;
        bench.isa_sim(0, 0)?;
        bench.hdl_sim(0)?;
        Ok(bench)
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.root.path().join(rel)
    }

    fn script(
        &self,
        path: &Path,
        template: &str,
        code: i32,
        delay: u64,
        trace: &str,
    ) -> anyhow::Result<()> {
        let calls = self.path("calls.txt");
        let trace = self.path(trace);
        let src = format(
            template,
            interp_args!(
                calls = calls.display(),
                trace = trace.display(),
                code = code,
                delay = delay,
            ),
        )?;
        std::fs::write(path, src)?;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
        Ok(())
    }

    fn build_tool(&self, code: i32) -> anyhow::Result<()> {
        self.script(&self.config.build_tool, BUILD_TOOL, code, 0, "")
    }

    fn isa_sim(&self, code: i32, delay: u64) -> anyhow::Result<()> {
        self.script(&self.config.isa_sim_exec, ISA_SIM, code, delay, "sw_trace.txt")
    }

    fn hdl_sim(&self, code: i32) -> anyhow::Result<()> {
        self.script(&self.config.hdl_sim_exec, HDL_SIM, code, 0, "hw_trace.txt")
    }

    fn traces(&self, sw: &str, hw: &str) -> anyhow::Result<()> {
        std::fs::write(self.path("sw_trace.txt"), sw)?;
        std::fs::write(self.path("hw_trace.txt"), hw)?;
        Ok(())
    }

    fn calls(&self) -> Vec<String> {
        std::fs::read_to_string(self.path("calls.txt"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn run(&self, plan: TestPlan, output: OutputMode) -> anyhow::Result<Verdict> {
        let executor = ProcessExecutor::new(output, self.config.timeout());
        let mut toolchain = Toolchain::new(&self.config, &executor);
        run_test(&self.config, &mut toolchain, &plan, "ion_core", "hello")
    }

    fn run_default(&self) -> anyhow::Result<Verdict> {
        self.run(TestPlan::default(), OutputMode::Quiet)
    }

    fn message(verdict: &Verdict, stage: Stage) -> String {
        verdict
            .stages
            .iter()
            .find(|(s, _)| *s == stage)
            .and_then(|(_, o)| o.message.clone())
            .unwrap_or_default()
    }
}

#[test]
fn test_matching_runs_pass() -> anyhow::Result<()> {
    let b = Bench::new()?;
    let t = trace(12, 0);
    b.traces(&t, &t)?;

    let v = b.run_default()?;
    anyhow::ensure!(v.passed, "expected pass: {v:?}");
    assert_eq!(b.calls(), ["build", "sw", "hw"]);
    assert!(v.ran(Stage::Compare));

    // the hdl simulator was told which image it runs
    let env = std::fs::read_to_string(b.config.testbench_dir("ion_core").join("hdl_env.txt"))?;
    assert!(env.starts_with("hello "));
    assert_eq!(env.trim().len(), "hello ".len() + 64);
    Ok(())
}

#[test]
fn test_build_failure_runs_nothing_else() -> anyhow::Result<()> {
    let b = Bench::new()?;
    let t = trace(4, 0);
    b.traces(&t, &t)?;
    b.build_tool(2)?;

    let v = b.run_default()?;
    assert!(!v.passed);
    assert_eq!(v.failed_stage, Some(Stage::Build));
    assert_eq!(b.calls(), ["build"]);
    Ok(())
}

#[test]
fn test_reported_errors_fail_before_rtl() -> anyhow::Result<()> {
    let b = Bench::new()?;
    b.traces(&trace(4, 3), &trace(4, 3))?;

    let v = b.run_default()?;
    assert_eq!(v.failed_stage, Some(Stage::SoftwareRun));
    assert_eq!(Bench::message(&v, Stage::SoftwareRun), "SW reported 3 errors.");
    assert_eq!(b.calls(), ["build", "sw"]);

    // without exit code checking the same logs pass
    let v = b.run(
        TestPlan {
            check_output: false,
            ..Default::default()
        },
        OutputMode::Quiet,
    )?;
    assert!(v.passed);
    Ok(())
}

#[test]
fn test_crash_suspected_without_sentinel_write() -> anyhow::Result<()> {
    let b = Bench::new()?;
    b.traces("", "")?;

    let v = b.run_default()?;
    assert_eq!(v.failed_stage, Some(Stage::SoftwareRun));
    assert!(Bench::message(&v, Stage::SoftwareRun).contains("crash suspected"));
    Ok(())
}

#[test]
fn test_simulator_exit_code_fails_regardless_of_log() -> anyhow::Result<()> {
    let b = Bench::new()?;
    let t = trace(4, 0);
    b.traces(&t, &t)?;
    b.hdl_sim(1)?;

    let v = b.run_default()?;
    assert_eq!(v.failed_stage, Some(Stage::HardwareRun));
    assert_eq!(
        Bench::message(&v, Stage::HardwareRun),
        "Simulation returned error code 1."
    );
    assert!(!v.ran(Stage::Compare));
    Ok(())
}

#[test]
fn test_stale_hw_log_is_not_reused() -> anyhow::Result<()> {
    let b = Bench::new()?;
    let t = trace(4, 0);
    std::fs::write(b.path("sw_trace.txt"), &t)?;
    // a passing log from an earlier run, and a simulator that writes nothing
    std::fs::write(b.config.testbench_dir("ion_core").join("hw_sim_log.txt"), &t)?;

    let v = b.run_default()?;
    assert_eq!(v.failed_stage, Some(Stage::HardwareRun));
    assert!(Bench::message(&v, Stage::HardwareRun).contains("not created"));
    Ok(())
}

#[test]
fn test_length_mismatch_fails_compare() -> anyhow::Result<()> {
    let b = Bench::new()?;
    let sw = trace(9, 0);
    let hw: String = sw.lines().skip(1).map(|l| std::format!("{l}\n")).collect();
    b.traces(&sw, &hw)?;

    let v = b.run_default()?;
    assert_eq!(v.failed_stage, Some(Stage::Compare));
    assert!(Bench::message(&v, Stage::Compare).contains("Different number of lines (10 != 9)"));
    Ok(())
}

#[test]
fn test_divergence_names_first_line() -> anyhow::Result<()> {
    let b = Bench::new()?;
    let sw = trace(60, 0);
    let mut hw: Vec<String> = sw.lines().map(str::to_string).collect();
    hw[41] = "(BFC000A4) [800000A4] |0F|=DEADBEEF WR".into();
    b.traces(&sw, &(hw.join("\n") + "\n"))?;

    let v = b.run_default()?;
    assert_eq!(v.failed_stage, Some(Stage::Compare));
    let msg = Bench::message(&v, Stage::Compare);
    assert!(
        msg.contains(
            "@41: (BFC000A4) [800000A4] |0F|=00000029 WR != (BFC000A4) [800000A4] |0F|=DEADBEEF WR"
        ),
        "{msg}"
    );
    Ok(())
}

#[test]
fn test_quiet_mode_redirects_console() -> anyhow::Result<()> {
    let b = Bench::new()?;
    let t = trace(2, 0);
    b.traces(&t, &t)?;
    let args_file = b.config.test_case_dir("hello").join("isa_args.txt");
    let sw_only = TestPlan {
        hw: false,
        ..Default::default()
    };

    b.run(sw_only, OutputMode::Quiet)?;
    let args = std::fs::read_to_string(&args_file)?;
    assert!(args.contains("--bram=hello.bin --map=hello.map --trace_log=sw_sim_log.txt"));
    assert!(args.contains("--conout=console_log.txt"));

    b.run(sw_only, OutputMode::Passthrough)?;
    let args = std::fs::read_to_string(&args_file)?;
    assert!(!args.contains("--conout"));
    Ok(())
}

#[test]
fn test_hung_simulator_times_out() -> anyhow::Result<()> {
    let mut b = Bench::new()?;
    b.config = b.config.clone().set_timeout_secs(1);
    let t = trace(2, 0);
    b.traces(&t, &t)?;
    b.isa_sim(0, 30)?;

    let v = b.run_default()?;
    assert_eq!(v.failed_stage, Some(Stage::SoftwareRun));
    assert!(Bench::message(&v, Stage::SoftwareRun).contains("timed out"));
    Ok(())
}

#[test]
fn test_missing_simulator_is_an_error() -> anyhow::Result<()> {
    let b = Bench::new()?;
    std::fs::remove_file(&b.config.isa_sim_exec)?;

    let r = b.run_default();
    assert!(r.is_err());
    assert!(std::format!("{:#}", r.unwrap_err()).contains("could not launch"));
    Ok(())
}

#[test]
fn test_regression_runs_each_case() -> anyhow::Result<()> {
    let b = Bench::new()?;
    std::fs::create_dir_all(b.config.test_case_dir("blinky"))?;
    let t = trace(3, 0);
    b.traces(&t, &t)?;

    let executor = ProcessExecutor::new(OutputMode::Quiet, Some(Duration::from_secs(60)));
    let mut toolchain = Toolchain::new(&b.config, &executor);
    let names = vec!["hello".to_string(), "blinky".to_string()];
    let plan = TestPlan::default();
    let verdicts = run_regression(&b.config, &mut toolchain, &plan, "ion_core", &names)?;
    assert_eq!(verdicts.len(), 2);
    assert!(verdicts.iter().all(|v| v.passed));
    assert_eq!(b.calls(), ["build", "sw", "hw", "build", "sw", "hw"]);

    // an unknown name aborts before anything runs
    let names = vec!["hello".to_string(), "nope".to_string()];
    let r = run_regression(&b.config, &mut toolchain, &plan, "ion_core", &names);
    assert!(r.is_err());
    assert_eq!(b.calls().len(), 6);
    Ok(())
}
