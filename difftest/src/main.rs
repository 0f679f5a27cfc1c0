use std::path::PathBuf;

use anyhow::Result;
use binutils::clap;
use clap::{ArgAction, Parser};
use difftest::{
    load_regression_list, run_regression, run_test, ConfigError, HarnessConfig, OutputMode,
    ProcessExecutor, TestPlan, Toolchain,
};

/// Run test programs on the ISA simulator and the RTL testbench and compare
/// their execution logs.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    long_about = None,
    styles = binutils::get_styles(),
    arg_required_else_help = true,
)]
struct Args {
    /// Name of the test case (a directory under the test root)
    #[arg(required_unless_present = "regression", conflicts_with = "regression")]
    test: Option<String>,

    /// Use RTL testbench NAME
    #[arg(long = "tb", value_name = "NAME", default_value = "ion_core")]
    tb: String,

    /// Execute the regression list in FILE
    #[arg(long, value_name = "FILE")]
    regression: Option<PathBuf>,

    /// Don't print build and simulation output to console
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Don't check test program exit code
    #[arg(short = 'n', long = "noexitcode")]
    no_exit_code: bool,

    /// Run only RTL simulation
    #[arg(short = 'r', long = "rtl", conflicts_with = "only_sw")]
    only_rtl: bool,

    /// Run only software simulation
    #[arg(short = 's', long = "sw")]
    only_sw: bool,

    /// JSON file with host paths and tool settings
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Kill any tool that runs longer than SECS seconds (0 waits forever)
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Print harness logs (repeat for more)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn run(args: Args) -> Result<bool> {
    let mut config = match &args.config {
        Some(path) => HarnessConfig::load(path)?,
        None => HarnessConfig::default(),
    };
    if let Some(secs) = args.timeout {
        config = config.set_timeout_secs(secs);
    }
    let config = config.anchored()?;
    tracing::debug!(?config);

    let executor = ProcessExecutor::new(OutputMode::from_quiet(args.quiet), config.timeout());
    let mut toolchain = Toolchain::new(&config, &executor);
    let plan = TestPlan {
        sw: !args.only_rtl,
        hw: !args.only_sw,
        check_output: !args.no_exit_code,
        ..Default::default()
    };

    if let Some(list) = &args.regression {
        let names = load_regression_list(list)?;
        let verdicts = run_regression(&config, &mut toolchain, &plan, &args.tb, &names)?;
        Ok(verdicts.iter().all(|v| v.passed))
    } else {
        let test = args.test.as_deref().unwrap_or_default();
        let verdict = run_test(&config, &mut toolchain, &plan, &args.tb, test)?;
        Ok(verdict.passed)
    }
}

fn main() {
    let args = Args::parse();
    binutils::logging_setup(
        binutils::verbose_count_to_trace(args.verbose),
        None::<&std::fs::File>,
    );

    match run(args) {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) if e.downcast_ref::<ConfigError>().is_some() => {
            eprintln!("Error: {e:#}");
            std::process::exit(2);
        }
        Err(e) => {
            eprintln!("Error: {e:?}");
            std::process::exit(2);
        }
    }
}
