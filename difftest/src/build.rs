//! Building a test program: the software image for the ISA simulator and the
//! object code packages the RTL testbench loads.

use std::{
    path::{Path, PathBuf},
    process::Command,
};

use anyhow::Context;
use sha2::{Digest, Sha256};

use crate::{
    config::HarnessConfig,
    exec::Executor,
    layout::{TestCase, Testbench},
    outcome::Outcome,
    report,
};

/// What a successful build leaves behind for the simulation stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArtifacts {
    /// Memory image of the test program.
    pub image: PathBuf,
    /// SHA-256 of [`BuildArtifacts::image`] right after the build, hex encoded.
    pub fingerprint: String,
}

impl BuildArtifacts {
    /// Fail unless the image on disk is still the one the build produced.
    pub fn verify(&self) -> anyhow::Result<Outcome> {
        if !self.image.is_file() {
            return Ok(Outcome::fail(format!(
                "Memory image '{}' disappeared after the build.",
                self.image.display()
            )));
        }
        let now = file_fingerprint(&self.image)?;
        if now != self.fingerprint {
            return Ok(Outcome::fail(format!(
                "Memory image '{}' changed since the build (sha256 {} != {}).",
                self.image.display(),
                now,
                self.fingerprint
            )));
        }
        Ok(Outcome::pass())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Built(BuildArtifacts),
    Failed(Outcome),
}

pub fn file_fingerprint(path: &Path) -> anyhow::Result<String> {
    let content =
        std::fs::read(path).with_context(|| format!("could not read `{}`", path.display()))?;
    let mut hasher = Sha256::new();
    hasher.update(&content);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Run the build tool on the fixed target inside the test case directory.
///
/// The testbench is only named for the operator: the object packages the
/// build emits are the same for every testbench.
pub fn sw_build(
    config: &HarnessConfig,
    executor: &dyn Executor,
    tb: &Testbench,
    case: &TestCase,
) -> anyhow::Result<BuildOutcome> {
    report::progress(format!("Building test case '{}'...", case.name));
    tracing::info!("building {} for testbench {}", case.name, tb.name);

    let mut cmd = Command::new(&config.build_tool);
    cmd.arg(&config.build_target).current_dir(&case.dir);
    let status = executor.run(&mut cmd)?;
    if !status.success() {
        return Ok(BuildOutcome::Failed(Outcome::fail(format!(
            "Build failed with {status}."
        ))));
    }

    let image = case.image_path();
    if !image.is_file() {
        return Ok(BuildOutcome::Failed(Outcome::fail(format!(
            "Build did not produce memory image '{}'.",
            image.display()
        ))));
    }
    let fingerprint = file_fingerprint(&image)?;
    tracing::debug!("{} sha256 {}", image.display(), fingerprint);
    Ok(BuildOutcome::Built(BuildArtifacts { image, fingerprint }))
}
