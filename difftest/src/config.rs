//! Host configuration: where the simulators live, where the test cases and
//! testbench work directories are, and the names baked into the RTL, the
//! makefiles and the ISA simulator.
//!
//! A [`HarnessConfig`] is built once at process entry and handed by reference
//! to every stage. Nothing reads configuration from global state.

use std::{
    path::{Component, Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use serde::Deserialize;

use crate::error::ConfigError;

/// Address of the testbench message register, as it appears in trace logs.
pub const SENTINEL_ADDRESS: u32 = 0xFFFF_8018;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Root directory of the software test cases, one subdirectory each.
    pub test_root: PathBuf,
    /// Root directory of the per-testbench HDL simulator work directories.
    pub hdl_work_root: PathBuf,
    /// HDL simulator executable.
    pub hdl_sim_exec: PathBuf,
    /// ISA simulator executable.
    pub isa_sim_exec: PathBuf,
    pub build_tool: PathBuf,
    pub build_target: String,
    /// PC at which the ISA simulator starts tracing (hex, no prefix).
    pub trigger_address: String,
    pub sentinel_address: u32,
    pub sw_exec_log: String,
    pub sw_console_log: String,
    pub hw_exec_log: String,
    pub hw_console_log: String,
    /// Upper bound on every child process wait, in seconds. `0` waits forever.
    pub timeout_secs: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            test_root: PathBuf::from("../../sw"),
            hdl_work_root: PathBuf::from("../../sim/modelsim"),
            hdl_sim_exec: PathBuf::from("vsim"),
            isa_sim_exec: PathBuf::from("ion32sim"),
            build_tool: PathBuf::from("make"),
            build_target: "tb_core".into(),
            trigger_address: "bfc00000".into(),
            sentinel_address: SENTINEL_ADDRESS,
            sw_exec_log: "sw_sim_log.txt".into(),
            sw_console_log: "console_log.txt".into(),
            hw_exec_log: "hw_sim_log.txt".into(),
            hw_console_log: "hw_sim_console_log.txt".into(),
            timeout_secs: 1800,
        }
    }
}

impl HarnessConfig {
    /// Read a JSON config file. Missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Malformed {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Anchor relative paths at the current directory, so that tools launched
    /// from inside a test case or testbench directory still resolve. Bare
    /// program names such as `vsim` are left for `PATH` lookup.
    pub fn anchored(mut self) -> anyhow::Result<Self> {
        fn anchor(path: &mut PathBuf) -> anyhow::Result<()> {
            if path.is_relative() && path.components().count() > 1 {
                *path = real_path(path)?;
            }
            Ok(())
        }
        self.test_root = real_path(&self.test_root)?;
        self.hdl_work_root = real_path(&self.hdl_work_root)?;
        anchor(&mut self.hdl_sim_exec)?;
        anchor(&mut self.isa_sim_exec)?;
        anchor(&mut self.build_tool)?;
        Ok(self)
    }

    pub fn set_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    /// The sentinel address the way trace logs print it: `[FFFF8018]`.
    pub fn sentinel_token(&self) -> String {
        format!("[{:08X}]", self.sentinel_address)
    }

    pub fn test_case_dir(&self, name: &str) -> PathBuf {
        self.test_root.join(name)
    }

    pub fn testbench_dir(&self, name: &str) -> PathBuf {
        self.hdl_work_root.join(name)
    }
}

/// Absolute form of `path` without `.` or `..`. Existing paths also have
/// their symlinks resolved.
fn real_path(path: &Path) -> anyhow::Result<PathBuf> {
    if let Ok(real) = path.canonicalize() {
        return Ok(real);
    }
    let abs = std::path::absolute(path)
        .with_context(|| format!("could not resolve `{}`", path.display()))?;
    let mut normal = PathBuf::new();
    for c in abs.components() {
        match c {
            Component::CurDir => {}
            Component::ParentDir => {
                normal.pop();
            }
            c => normal.push(c),
        }
    }
    Ok(normal)
}
