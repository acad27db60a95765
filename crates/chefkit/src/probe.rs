//! Read-only queries of remote host state.
//!
//! Probe commands end in `|| true` so that a missing program shows up as
//! output (absence is data). Only a transport failure is an error.

use crate::decision;
use crate::error::{PreconditionError, Result};
use crate::session::Session;

/// Installed Ruby, as reported by `ruby --version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeVersion {
    Installed(String),
    NotFound,
}

impl RuntimeVersion {
    /// Interpret the trimmed output of the runtime probe.
    pub fn from_output(output: &str) -> Self {
        let output = output.trim();
        if output.is_empty() || output.contains("not found") {
            Self::NotFound
        } else {
            Self::Installed(output.to_string())
        }
    }
}

/// Query the installed Ruby version.
pub fn runtime_version(session: &Session<'_>) -> Result<RuntimeVersion> {
    let output = session.capture("ruby --version || true")?;
    Ok(RuntimeVersion::from_output(&output))
}

/// Whether an installed chef gem satisfies `constraint`.
///
/// `gem list -i` prints `true` or `false`; any other output (including a
/// missing `gem`) is treated as satisfied, matching the installer's
/// behavior of only acting on an explicit `false`.
pub fn agent_satisfies_version(session: &Session<'_>, constraint: &str) -> Result<bool> {
    let output = session.capture(&format!("gem list -i -v {constraint:?} || true"))?;
    Ok(output != "false")
}

/// The distribution banner, read once per session.
pub fn distribution(session: &mut Session<'_>) -> Result<String> {
    if let Some(banner) = &session.distribution {
        return Ok(banner.clone());
    }
    let banner = session.capture("cat /etc/issue")?;
    session.distribution = Some(banner.clone());
    Ok(banner)
}

/// Abort unless the host runs a supported distribution. Checked once per session.
pub fn ensure_supported_distro(session: &mut Session<'_>) -> Result<()> {
    if session.distro_checked {
        return Ok(());
    }
    let banner = distribution(session)?;
    log::info!("Using Linux distribution {banner}");
    if !decision::is_supported_distro(&banner) {
        return Err(PreconditionError::UnsupportedDistribution { banner }.into());
    }
    session.distro_checked = true;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::transport::MockTransport;

    #[test]
    fn test_runtime_version_from_output() {
        assert_eq!(RuntimeVersion::from_output(""), RuntimeVersion::NotFound);
        assert_eq!(
            RuntimeVersion::from_output("bash: ruby: command not found"),
            RuntimeVersion::NotFound
        );
        assert_eq!(
            RuntimeVersion::from_output("  ruby 1.9.3p125\n"),
            RuntimeVersion::Installed("ruby 1.9.3p125".to_string())
        );
    }

    #[test]
    fn test_runtime_version_probe() {
        let mock = MockTransport::new().respond("ruby --version", "ruby 1.9.3p125\n");
        let session = Session::new(&mock, "/tmp/chef", false);
        assert_eq!(
            runtime_version(&session).unwrap(),
            RuntimeVersion::Installed("ruby 1.9.3p125".to_string())
        );
        assert_eq!(mock.commands(), vec!["ruby --version || true"]);
    }

    #[test]
    fn test_runtime_probe_transport_error() {
        let mock = MockTransport::new().fail_on("ruby");
        let session = Session::new(&mock, "/tmp/chef", false);
        assert!(matches!(
            runtime_version(&session).unwrap_err(),
            Error::CommandFailed { .. }
        ));
    }

    #[test]
    fn test_agent_probe() {
        let mock = MockTransport::new().respond("gem list", "false\n");
        let session = Session::new(&mock, "/tmp/chef", false);
        assert!(!agent_satisfies_version(&session, "~> 0.10.8").unwrap());
        assert_eq!(mock.commands(), vec!["gem list -i -v \"~> 0.10.8\" || true"]);

        let mock = MockTransport::new().respond("gem list", "true");
        let session = Session::new(&mock, "/tmp/chef", false);
        assert!(agent_satisfies_version(&session, "~> 0.10.8").unwrap());
    }

    #[test]
    fn test_distribution_memoized() {
        let mock = MockTransport::new().respond("/etc/issue", "Ubuntu 12.04 LTS \\n \\l\n");
        let mut session = Session::new(&mock, "/tmp/chef", false);
        assert_eq!(distribution(&mut session).unwrap(), "Ubuntu 12.04 LTS \\n \\l");
        distribution(&mut session).unwrap();
        ensure_supported_distro(&mut session).unwrap();
        ensure_supported_distro(&mut session).unwrap();
        assert_eq!(mock.commands(), vec!["cat /etc/issue"]);
    }

    #[test]
    fn test_unsupported_distro_aborts() {
        let mock = MockTransport::new().respond("/etc/issue", "CentOS release 6.3 (Final)");
        let mut session = Session::new(&mock, "/tmp/chef", false);
        let err = ensure_supported_distro(&mut session).unwrap_err();
        assert!(err.is_fatal());
        assert!(ensure_supported_distro(&mut session).is_err());
        assert_eq!(mock.commands(), vec!["cat /etc/issue"]);
    }
}
