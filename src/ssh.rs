//! ssh/scp transport for chefkit.
//!
//! Every remote command is a separate `ssh` invocation in batch mode, so
//! authentication must be non-interactive (agent or identity file).

use chefkit::{Error, Result, Transport};
use std::io::Write;
use std::path::Path;
use std::process::Output;

use crate::config::HostConfig;
use crate::{progress, runner, ui};

/// Transport that shells out to the system `ssh` and `scp`.
pub struct SshTransport {
    address: String,
    user: Option<String>,
    port: Option<u16>,
    identity_file: Option<String>,
    sudo: String,
}

impl SshTransport {
    pub fn new(host: &HostConfig) -> anyhow::Result<Self> {
        let Some(address) = host.address.clone() else {
            anyhow::bail!("No host configured. Add [host] address = \"...\" to roundsman.toml");
        };
        if !runner::command_exists("ssh") {
            anyhow::bail!("`ssh` was not found on $PATH");
        }
        Ok(Self {
            address,
            user: host.user.clone(),
            port: host.port,
            identity_file: host
                .identity_file
                .as_deref()
                .map(|p| crate::paths::expand(p).to_string_lossy().into_owned()),
            sudo: host.sudo.clone().unwrap_or_else(|| "sudo".to_string()),
        })
    }

    fn destination(&self) -> String {
        match &self.user {
            Some(user) => format!("{user}@{}", self.address),
            None => self.address.clone(),
        }
    }

    fn common_args(&self, port_flag: &str) -> Vec<String> {
        let mut args = vec!["-o".to_string(), "BatchMode=yes".to_string()];
        if let Some(port) = self.port {
            args.push(port_flag.to_string());
            args.push(port.to_string());
        }
        if let Some(identity) = &self.identity_file {
            args.push("-i".to_string());
            args.push(identity.clone());
        }
        args
    }

    fn ssh_args(&self, command: &str) -> Vec<String> {
        let mut args = self.common_args("-p");
        args.push(self.destination());
        args.push(command.to_string());
        args
    }

    fn output(&self, command: &str) -> Result<Output> {
        let output = runner::run_output("ssh", &self.ssh_args(command))
            .map_err(|e| Error::transport(command, format!("{e:#}")))?;
        check(command, &output)?;
        Ok(output)
    }
}

fn check(command: &str, output: &Output) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        log::warn!("{}", stderr.trim());
    }
    // ssh exits 255 when the connection itself fails
    if output.status.code() == Some(255) {
        return Err(Error::transport(command, stderr.trim().to_string()));
    }
    Err(Error::CommandFailed {
        command: command.to_string(),
        code: output.status.code(),
    })
}

impl Transport for SshTransport {
    fn run(&self, command: &str) -> Result<()> {
        let pb = progress::spinner(command);
        let result = self.output(command).map(|_| ());
        progress::finish_clear(&pb);
        result
    }

    fn stream(&self, command: &str) -> Result<()> {
        ui::dim(&format!("$ {command}"));
        let status = runner::run("ssh", &self.ssh_args(command))
            .map_err(|e| Error::transport(command, format!("{e:#}")))?;
        if status.success() {
            Ok(())
        } else if status.code() == Some(255) {
            Err(Error::transport(command, "ssh connection failed"))
        } else {
            Err(Error::CommandFailed {
                command: command.to_string(),
                code: status.code(),
            })
        }
    }

    fn capture(&self, command: &str) -> Result<String> {
        let output = self.output(command)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn upload(&self, local: &Path, remote: &str) -> Result<()> {
        let label = format!("scp {} {remote}", local.display());
        let mut args = self.common_args("-P");
        args.push("-q".to_string());
        args.push(local.to_string_lossy().into_owned());
        args.push(format!("{}:{remote}", self.destination()));

        let pb = progress::spinner(&format!("Uploading {remote}"));
        let output = runner::run_output("scp", &args);
        progress::finish_clear(&pb);

        let output = output.map_err(|e| Error::transport(&label, format!("{e:#}")))?;
        if output.status.success() {
            Ok(())
        } else {
            Err(Error::transport(
                label,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ))
        }
    }

    fn put(&self, contents: &[u8], remote: &str) -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(contents)?;
        file.flush()?;
        self.upload(file.path(), remote)
    }

    fn login_user(&self) -> String {
        self.user
            .clone()
            .or_else(|| std::env::var("USER").ok())
            .unwrap_or_else(|| "root".to_string())
    }

    fn sudo(&self) -> String {
        self.sudo.clone()
    }
}
