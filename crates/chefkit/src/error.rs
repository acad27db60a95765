//! Error types for provisioning operations.
//!
//! Errors are categorized so callers can tell user-input problems (which
//! abort before the host is touched) from transport failures and local
//! packaging failures.

use std::fmt;
use std::io;
use thiserror::Error;

/// Result type alias for provisioning operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of provisioning errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Invalid input or unsupported host; aborts the run.
    Precondition,
    /// A remote command could not run or exited non-zero.
    Transport,
    /// The local cookbook archive could not be built.
    Packaging,
    /// A setting is missing, mistyped or could not be resolved.
    Setting,
    /// Other/unknown errors.
    Other,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Precondition => "Precondition failed",
            Self::Transport => "Remote command failed",
            Self::Packaging => "Cookbook packaging failed",
            Self::Setting => "Invalid setting",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Precondition => "Fix the run list, cookbook paths or target host and run again",
            Self::Transport => "Check connectivity to the host and the remote command output",
            Self::Packaging => "Check that the cookbook directories are readable",
            Self::Setting => "Run `roundsman configuration` to inspect the current settings",
            Self::Other => "Check the error details for more information",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// A precondition that stopped the run before any mutating remote action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionError {
    /// `chef` was called without recipes.
    #[error("You must specify at least one recipe when running chef")]
    EmptyRunList,

    /// None of the configured cookbook directories exist locally.
    #[error("No cookbooks found in {searched:?}")]
    NoCookbooks {
        /// The configured cookbook directories.
        searched: Vec<String>,
    },

    /// The host does not run a supported Linux distribution.
    #[error("This distribution is not (yet) supported: {banner}")]
    UnsupportedDistribution {
        /// Contents of the distribution banner.
        banner: String,
    },

    /// The installed Ruby does not match the required version.
    #[error("Ruby version mismatch: installed {installed}, required {required}")]
    RuntimeVersionMismatch {
        /// What `ruby --version` reported (or "none").
        installed: String,
        /// The normalized required version.
        required: String,
    },
}

/// Errors that can occur while provisioning a host.
#[derive(Debug, Error)]
pub enum Error {
    /// Fatal, non-retryable input or host error.
    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    /// The transport could not execute a command at all.
    #[error("transport error running `{command}`: {message}")]
    Transport {
        /// Command (or transfer) that was attempted.
        command: String,
        /// Reason reported by the transport.
        message: String,
    },

    /// A remote command ran and exited non-zero.
    #[error("remote command failed{}: {command}", .code.map(|c| format!(" with status {c}")).unwrap_or_default())]
    CommandFailed {
        /// The remote command line.
        command: String,
        /// Exit code, when one was reported.
        code: Option<i32>,
    },

    /// The local cookbook archive could not be built.
    #[error("failed to package cookbooks: {message}")]
    Packaging {
        /// Description of what went wrong.
        message: String,
    },

    /// A built-in setting has the wrong kind of value.
    #[error("setting :{name} must be {expected}")]
    InvalidSetting {
        /// Setting name.
        name: String,
        /// Human readable description of the expected value.
        expected: &'static str,
    },

    /// A deferred setting failed to produce its value.
    #[error("could not resolve :{name}: {message}")]
    Deferred {
        /// Setting name.
        name: String,
        /// Reason reported by the deferred computation.
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a transport error.
    pub fn transport(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Create a packaging error.
    pub fn packaging(message: impl Into<String>) -> Self {
        Self::Packaging {
            message: message.into(),
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Precondition(_) => ErrorCategory::Precondition,
            Error::Transport { .. } | Error::CommandFailed { .. } => ErrorCategory::Transport,
            Error::Packaging { .. } => ErrorCategory::Packaging,
            Error::InvalidSetting { .. } | Error::Deferred { .. } => ErrorCategory::Setting,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Other,
        }
    }

    /// Whether this error aborts the run as invalid input.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.category() == ErrorCategory::Precondition
    }
}
