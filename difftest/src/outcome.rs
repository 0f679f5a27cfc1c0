use std::fmt::Display;

/// Pass/fail result of one stage, with an optional diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub passed: bool,
    pub message: Option<String>,
}

impl Outcome {
    pub fn pass() -> Self {
        Self {
            passed: true,
            message: None,
        }
    }

    pub fn pass_with(message: impl Display) -> Self {
        Self {
            passed: true,
            message: Some(message.to_string()),
        }
    }

    pub fn fail(message: impl Display) -> Self {
        Self {
            passed: false,
            message: Some(message.to_string()),
        }
    }

    /// Logical AND with short-circuit: `next` only runs if `self` passed.
    pub fn and_then(self, next: impl FnOnce() -> anyhow::Result<Outcome>) -> anyhow::Result<Self> {
        if self.passed {
            next()
        } else {
            Ok(self)
        }
    }
}

impl Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = if self.passed { "pass" } else { "fail" };
        match &self.message {
            Some(msg) => write!(f, "{status}: {msg}"),
            None => write!(f, "{status}"),
        }
    }
}
