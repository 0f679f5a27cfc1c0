//! Operator-facing console output: stage progress, verdict banners and the
//! regression summary. All of it goes to stderr.

use ansi_term::Colour::{Green, Red, Yellow};

use crate::orchestrator::Verdict;

pub fn progress(msg: impl AsRef<str>) {
    eprintln!("{}", Yellow.bold().paint(msg.as_ref()));
}

/// Diagnostic of a failed or noteworthy stage.
pub fn note(msg: impl AsRef<str>) {
    eprintln!("{}", msg.as_ref());
}

pub fn banner(test_case: &str, passed: bool) -> String {
    if passed {
        format!("Test '{}' {}", test_case, Green.bold().paint("PASSED"))
    } else {
        format!("Test '{}' {}", test_case, Red.bold().paint("FAILED"))
    }
}

pub fn print_outcome(verdict: &Verdict) {
    eprintln!("{}", banner(&verdict.test_case, verdict.passed));
}

pub fn print_summary(verdicts: &[Verdict]) {
    let passed = verdicts.iter().filter(|v| v.passed).count();
    let failed = verdicts.len() - passed;
    eprintln!();
    eprintln!("{}", Yellow.bold().paint("Regression summary"));
    for v in verdicts {
        let tag = if v.passed {
            Green.paint("PASSED")
        } else {
            Red.paint("FAILED")
        };
        match (&v.failed_stage, v.passed) {
            (Some(stage), false) => eprintln!("  {:<24} {} ({})", v.test_case, tag, stage),
            _ => eprintln!("  {:<24} {}", v.test_case, tag),
        }
    }
    eprintln!("{passed} passed, {failed} failed");
}
