//! Differential testing of the ion32 core.
//!
//! Every test program is built once, then executed on the ISA simulator and on
//! the RTL testbench. A test passes when both runs report zero errors through
//! the testbench message register and their execution logs agree line by line.

pub mod build;
pub mod compare;
pub mod config;
mod error;
pub mod evaluate;
pub mod exec;
pub mod layout;
pub mod orchestrator;
mod outcome;
pub mod regression;
pub mod report;
pub mod runner;

pub use config::HarnessConfig;
pub use error::ConfigError;
pub use exec::{Executor, OutputMode, ProcessExecutor, RunStatus};
pub use orchestrator::{run_test, Stage, Stages, TestPlan, Toolchain, Verdict};
pub use outcome::Outcome;
pub use regression::{load_regression_list, run_regression};
