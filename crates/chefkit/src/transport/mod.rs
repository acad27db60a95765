//! Remote execution channel abstraction.
//!
//! The [`Transport`] trait is everything the orchestrator needs from the
//! remote side: run a command (quietly or with streamed output), capture a
//! command's stdout, and copy files. Privilege escalation is a command
//! prefix supplied by the transport.
//!
//! # Testing
//!
//! Use [`MockTransport`] to script responses and record every call:
//!
//! ```
//! use chefkit::transport::{MockTransport, Transport};
//!
//! let mock = MockTransport::new().respond("cat /etc/issue", "Ubuntu 12.04 LTS");
//! assert_eq!(mock.capture("cat /etc/issue").unwrap(), "Ubuntu 12.04 LTS");
//! assert_eq!(mock.commands(), vec!["cat /etc/issue"]);
//! ```

mod mock;

pub use mock::{Call, MockTransport};

use crate::error::Result;
use std::path::Path;

/// A remote execution channel (ssh or equivalent).
///
/// Implementations return [`Error::Transport`](crate::Error::Transport) when
/// a command cannot be executed and
/// [`Error::CommandFailed`](crate::Error::CommandFailed) when it exits
/// non-zero. They never retry internally on behalf of the orchestrator.
pub trait Transport: Send + Sync {
    /// Run a command, discarding its output.
    fn run(&self, command: &str) -> Result<()>;

    /// Run a command, streaming its output to the user.
    fn stream(&self, command: &str) -> Result<()>;

    /// Run a command and return its stdout.
    fn capture(&self, command: &str) -> Result<String>;

    /// Copy a local file to a remote path.
    fn upload(&self, local: &Path, remote: &str) -> Result<()>;

    /// Write `contents` to a remote path.
    fn put(&self, contents: &[u8], remote: &str) -> Result<()>;

    /// The user the channel is logged in as.
    fn login_user(&self) -> String;

    /// Prefix used to run a command as root.
    fn sudo(&self) -> String {
        "sudo".to_string()
    }
}

/// Join a remote directory and a name with exactly one `/`.
pub fn remote_join(dir: &str, name: &str) -> String {
    if name.is_empty() {
        return dir.to_string();
    }
    format!("{}/{}", dir.trim_end_matches('/'), name.trim_start_matches('/'))
}
