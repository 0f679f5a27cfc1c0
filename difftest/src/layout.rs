//! On-disk layout of test cases and testbenches, and the lifecycle of the log
//! files each simulator run owns.

use std::{io::ErrorKind, path::PathBuf};

use anyhow::Context;

use crate::{config::HarnessConfig, error::ConfigError};

/// Execution log plus console log of one simulator run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFiles {
    pub exec: PathBuf,
    pub console: PathBuf,
}

impl LogFiles {
    /// Remove both logs so a stale one can never be read as current.
    /// Files that do not exist are fine.
    pub fn delete(&self) -> anyhow::Result<()> {
        for path in [&self.exec, &self.console] {
            match std::fs::remove_file(path) {
                Ok(()) => tracing::debug!("deleted {}", path.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(e).with_context(|| format!("could not delete `{}`", path.display()))
                }
            }
        }
        Ok(())
    }

    pub fn exec_exists(&self) -> bool {
        self.exec.is_file()
    }
}

/// A software test program: a directory under the test root holding its
/// sources, build artifacts and software-side logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub name: String,
    pub dir: PathBuf,
}

impl TestCase {
    pub fn resolve(config: &HarnessConfig, name: &str) -> Result<Self, ConfigError> {
        let dir = config.test_case_dir(name);
        if !dir.is_dir() {
            return Err(ConfigError::UnknownTestCase {
                name: name.into(),
                dir,
            });
        }
        Ok(Self {
            name: name.into(),
            dir,
        })
    }

    pub fn logs(&self, config: &HarnessConfig) -> LogFiles {
        LogFiles {
            exec: self.dir.join(&config.sw_exec_log),
            console: self.dir.join(&config.sw_console_log),
        }
    }

    /// Memory image loaded by the ISA simulator, relative to [`TestCase::dir`].
    pub fn image_name(&self) -> String {
        format!("{}.bin", self.name)
    }

    pub fn map_name(&self) -> String {
        format!("{}.map", self.name)
    }

    pub fn image_path(&self) -> PathBuf {
        self.dir.join(self.image_name())
    }
}

/// An RTL testbench: a work directory holding the HDL simulator's command
/// script `<name>_tb.do` and the hardware-side logs. Only the directory is
/// checked up front; a missing script fails the hardware run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Testbench {
    pub name: String,
    pub dir: PathBuf,
}

impl Testbench {
    pub fn resolve(config: &HarnessConfig, name: &str) -> Result<Self, ConfigError> {
        let dir = config.testbench_dir(name);
        if !dir.is_dir() {
            return Err(ConfigError::UnknownTestbench {
                name: name.into(),
                dir,
            });
        }
        Ok(Self {
            name: name.into(),
            dir,
        })
    }

    pub fn logs(&self, config: &HarnessConfig) -> LogFiles {
        LogFiles {
            exec: self.dir.join(&config.hw_exec_log),
            console: self.dir.join(&config.hw_console_log),
        }
    }

    pub fn script_name(&self) -> String {
        format!("{}_tb.do", self.name)
    }
}
