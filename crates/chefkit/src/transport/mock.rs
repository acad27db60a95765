//! In-memory transport for tests.

use super::Transport;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// A call recorded by [`MockTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// `run` or `stream`.
    Run { command: String, streamed: bool },
    /// `capture`.
    Capture { command: String },
    /// `upload`; `existed` is whether the local file was present at call time.
    Upload {
        local: PathBuf,
        remote: String,
        existed: bool,
    },
    /// `put`.
    Put { remote: String, contents: Vec<u8> },
}

impl Call {
    /// The command line, for `Run` and `Capture` calls.
    pub fn command(&self) -> Option<&str> {
        match self {
            Call::Run { command, .. } | Call::Capture { command } => Some(command),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<Call>,
    responses: Vec<(String, String)>,
    failures: Vec<String>,
}

/// Mock transport that records calls and replays scripted output.
///
/// Clones share state, so a test can hand one clone to the code under test
/// and inspect the calls through another.
#[derive(Debug, Clone)]
pub struct MockTransport {
    state: Arc<Mutex<State>>,
    user: String,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self {
            state: Arc::default(),
            user: "deploy".to_string(),
        }
    }
}

impl MockTransport {
    /// Create a mock where every capture returns an empty string.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `output` from any captured command containing `pattern`.
    /// Earlier responses take precedence.
    #[must_use]
    pub fn respond(self, pattern: &str, output: &str) -> Self {
        self.lock()
            .responses
            .push((pattern.to_string(), output.to_string()));
        self
    }

    /// Fail any run/stream/capture whose command contains `pattern`.
    #[must_use]
    pub fn fail_on(self, pattern: &str) -> Self {
        self.lock().failures.push(pattern.to_string());
        self
    }

    /// Use a different login user (default `deploy`).
    #[must_use]
    pub fn with_user(mut self, user: &str) -> Self {
        self.user = user.to_string();
        self
    }

    /// Every recorded call, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Command lines of every run/stream/capture call, in order.
    pub fn commands(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| c.command().map(str::to_string))
            .collect()
    }

    /// Contents of the last `put` to `remote`.
    pub fn put_contents(&self, remote: &str) -> Option<Vec<u8>> {
        self.lock().calls.iter().rev().find_map(|c| match c {
            Call::Put {
                remote: r,
                contents,
            } if r == remote => Some(contents.clone()),
            _ => None,
        })
    }

    /// Forget recorded calls; responses and failures are kept.
    pub fn clear(&self) {
        self.lock().calls.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn execute(&self, command: &str, streamed: bool) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(Call::Run {
            command: command.to_string(),
            streamed,
        });
        check_failure(&state, command)
    }
}

fn check_failure(state: &State, command: &str) -> Result<()> {
    if state.failures.iter().any(|p| command.contains(p.as_str())) {
        return Err(Error::CommandFailed {
            command: command.to_string(),
            code: Some(1),
        });
    }
    Ok(())
}

impl Transport for MockTransport {
    fn run(&self, command: &str) -> Result<()> {
        self.execute(command, false)
    }

    fn stream(&self, command: &str) -> Result<()> {
        self.execute(command, true)
    }

    fn capture(&self, command: &str) -> Result<String> {
        let mut state = self.lock();
        state.calls.push(Call::Capture {
            command: command.to_string(),
        });
        check_failure(&state, command)?;
        Ok(state
            .responses
            .iter()
            .find(|(pattern, _)| command.contains(pattern.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or_default())
    }

    fn upload(&self, local: &Path, remote: &str) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(Call::Upload {
            local: local.to_path_buf(),
            remote: remote.to_string(),
            existed: local.exists(),
        });
        if state.failures.iter().any(|p| remote.contains(p.as_str())) {
            return Err(Error::transport(
                format!("upload {}", local.display()),
                "scripted failure",
            ));
        }
        Ok(())
    }

    fn put(&self, contents: &[u8], remote: &str) -> Result<()> {
        self.lock().calls.push(Call::Put {
            remote: remote.to_string(),
            contents: contents.to_vec(),
        });
        Ok(())
    }

    fn login_user(&self) -> String {
        self.user.clone()
    }
}
