use std::path::PathBuf;

use thiserror::Error;

/// Problems with the harness setup itself. These abort the whole run and are
/// never reported as a failed test.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not find test program '{name}' (looked in {})", dir.display())]
    UnknownTestCase { name: String, dir: PathBuf },

    #[error("could not find RTL testbench '{name}' (looked in {})", dir.display())]
    UnknownTestbench { name: String, dir: PathBuf },

    #[error("could not read `{}`", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config file `{}`", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("regression list `{}` names no test cases", path.display())]
    EmptyRegression { path: PathBuf },
}
