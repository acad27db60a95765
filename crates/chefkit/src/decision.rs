//! Pure install decisions: desired state versus observed state.

use crate::probe::RuntimeVersion;

/// Marker a distribution banner must contain to be supported.
pub const SUPPORTED_DISTRO_MARKER: &str = "Ubuntu";

/// Separator stripped from versions before comparing them.
const VERSION_SEPARATOR: char = '-';

/// Outcome of comparing the installed Ruby with the required one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeVerdict {
    /// No Ruby on the host.
    NotInstalled,
    /// Installed version contains the required one.
    Matches { installed: String, required: String },
    /// Installed version contains the required one, but the caller does not
    /// enforce the version. Kept separate only for the narrative.
    Tolerated { installed: String, required: String },
    /// Installed version does not contain the required one.
    Mismatch { installed: String, required: String },
}

impl RuntimeVerdict {
    /// Whether Ruby must be (re)installed.
    pub fn needs_install(&self) -> bool {
        matches!(self, Self::NotInstalled | Self::Mismatch { .. })
    }

    /// Log line describing the verdict.
    pub fn narrative(&self) -> String {
        match self {
            Self::NotInstalled => "No version of Ruby could be found.".to_string(),
            Self::Matches {
                installed,
                required,
            } => format!("Ruby {installed} matches the required version: {required}."),
            Self::Tolerated {
                installed,
                required,
            } => format!(
                "Already installed Ruby {installed}, not {required}. \
                 Set :care_about_ruby_version if you want to fix this."
            ),
            Self::Mismatch {
                installed,
                required,
            } => format!(
                "Ruby version mismatch. Installed version: {installed}, required is {required}"
            ),
        }
    }
}

fn normalize(version: &str) -> String {
    version.replace(VERSION_SEPARATOR, "")
}

/// Compare the installed Ruby with the required version.
///
/// The comparison is substring containment after stripping `-` from both
/// sides, so `1.9.3-p125` is satisfied by `ruby 1.9.3p125 (2012-02-16)`.
/// It is not a semantic version comparison.
pub fn runtime_verdict(required: &str, installed: &RuntimeVersion, strict: bool) -> RuntimeVerdict {
    let installed = match installed {
        RuntimeVersion::NotFound => return RuntimeVerdict::NotInstalled,
        RuntimeVersion::Installed(v) => v.clone(),
    };
    let required = normalize(required);
    if normalize(&installed).contains(&required) {
        if strict {
            RuntimeVerdict::Matches {
                installed,
                required,
            }
        } else {
            RuntimeVerdict::Tolerated {
                installed,
                required,
            }
        }
    } else {
        RuntimeVerdict::Mismatch {
            installed,
            required,
        }
    }
}

/// Whether Ruby must be installed. `strict` never changes the answer.
pub fn should_install_runtime(required: &str, installed: &RuntimeVersion, strict: bool) -> bool {
    runtime_verdict(required, installed, strict).needs_install()
}

/// Whether chef must be installed, given whether an installed gem satisfies
/// the required version constraint.
pub fn should_install_agent(satisfied: bool) -> bool {
    !satisfied
}

/// Whether the distribution banner names a supported distribution.
pub fn is_supported_distro(banner: &str) -> bool {
    banner.contains(SUPPORTED_DISTRO_MARKER)
}
