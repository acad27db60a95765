//! Per-invocation run context.
//!
//! A [`Session`] lives for exactly one orchestrator call. It carries the
//! memoized once-per-run facts (working directory ensured, distribution
//! checked, distribution banner) so they can never leak into the next call.

use crate::error::Result;
use crate::transport::{Transport, remote_join};

pub struct Session<'a> {
    transport: &'a dyn Transport,
    working_directory: String,
    stream_output: bool,
    pub(crate) directory_ensured: bool,
    pub(crate) distro_checked: bool,
    pub(crate) distribution: Option<String>,
}

impl<'a> Session<'a> {
    pub fn new(transport: &'a dyn Transport, working_directory: &str, stream_output: bool) -> Self {
        Self {
            transport,
            working_directory: working_directory.to_string(),
            stream_output,
            directory_ensured: false,
            distro_checked: false,
            distribution: None,
        }
    }

    pub fn transport(&self) -> &'a dyn Transport {
        self.transport
    }

    /// Run a command as the login user, streamed when verbose output is on.
    pub fn run(&self, command: &str) -> Result<()> {
        log::debug!("run: {command}");
        if self.stream_output {
            self.transport.stream(command)
        } else {
            self.transport.run(command)
        }
    }

    /// Run a command as root.
    pub fn root(&self, command: &str) -> Result<()> {
        self.run(&format!("{} {command}", self.transport.sudo()))
    }

    /// Capture a read-only command's trimmed stdout.
    pub fn capture(&self, command: &str) -> Result<String> {
        log::debug!("capture: {command}");
        Ok(self.transport.capture(command)?.trim().to_string())
    }

    /// Create the remote working directory and hand it to the login user.
    /// Only the first call in a session touches the host.
    pub fn ensure_working_directory(&mut self) -> Result<()> {
        if self.directory_ensured {
            return Ok(());
        }
        self.run(&format!("mkdir -p {}", self.working_directory))?;
        self.root(&format!(
            "chown -R {} {}",
            self.transport.login_user(),
            self.working_directory
        ))?;
        self.directory_ensured = true;
        Ok(())
    }

    /// Path of `name` inside the working directory, ensuring the directory exists.
    pub fn working_path(&mut self, name: &str) -> Result<String> {
        self.ensure_working_directory()?;
        Ok(remote_join(&self.working_directory, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;

    #[test]
    fn test_ensure_working_directory_once() {
        let mock = MockTransport::new();
        let mut session = Session::new(&mock, "/tmp/chef", false);

        for _ in 0..3 {
            session.ensure_working_directory().unwrap();
        }
        session.working_path("solo.rb").unwrap();

        assert_eq!(
            mock.commands(),
            vec!["mkdir -p /tmp/chef", "sudo chown -R deploy /tmp/chef"]
        );
    }

    #[test]
    fn test_failed_ensure_is_retried_next_call() {
        let mock = MockTransport::new().fail_on("chown");
        let mut session = Session::new(&mock, "/tmp/chef", false);
        assert!(session.ensure_working_directory().is_err());
        assert!(!session.directory_ensured);
    }

    #[test]
    fn test_new_session_starts_fresh() {
        let mock = MockTransport::new();
        Session::new(&mock, "/tmp/chef", false)
            .ensure_working_directory()
            .unwrap();
        Session::new(&mock, "/tmp/chef", false)
            .ensure_working_directory()
            .unwrap();
        assert_eq!(mock.commands().len(), 4);
    }

    #[test]
    fn test_working_path() {
        let mock = MockTransport::new();
        let mut session = Session::new(&mock, "/tmp/chef/", true);
        assert_eq!(session.working_path("solo.json").unwrap(), "/tmp/chef/solo.json");
    }

    #[test]
    fn test_stream_flag_selects_channel() {
        let mock = MockTransport::new();
        Session::new(&mock, "/tmp/chef", true).run("ls").unwrap();
        Session::new(&mock, "/tmp/chef", false).root("ls").unwrap();
        assert_eq!(
            mock.calls(),
            vec![
                crate::transport::Call::Run {
                    command: "ls".to_string(),
                    streamed: true
                },
                crate::transport::Call::Run {
                    command: "sudo ls".to_string(),
                    streamed: false
                },
            ]
        );
    }
}
