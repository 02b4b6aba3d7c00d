//! Top-level CLI error, wrapping every lower layer with a process exit code.

use thiserror::Error;

use crate::config::ConfigError;

/// Everything `cuckoodrive` can fail with, with the exit code it should produce.
#[derive(Debug, Error)]
pub enum CliError {
    /// Argument/URI configuration was invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A backend or virtual-filesystem operation failed, including lock timeouts.
    #[error(transparent)]
    Backend(#[from] cuckoo_backend::BackendError),
}

impl CliError {
    /// The process exit code this error should produce.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::Backend(err) => match err {
                cuckoo_backend::BackendError::LockTimeout { .. } => 3,
                _ => 1,
            },
        }
    }
}
