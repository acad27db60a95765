// Provisioning commands
pub mod chef;
pub mod configuration;
pub mod install;

use anyhow::Result;
use chefkit::{Handle, Provisioner, Settings, Value};
use colored::Colorize;
use std::path::{Path, PathBuf};

use crate::cli::{NAMESPACE, TASKS};
use crate::config::{self, HostConfig, RoundsmanConfig};
use crate::ssh::SshTransport;
use crate::ui;

/// Host and settings for one invocation.
pub struct Project {
    pub host: HostConfig,
    pub settings: Settings,
    pub source: Option<PathBuf>,
}

impl Project {
    /// Load the config file, apply `-s` overrides and register task names.
    pub fn load(explicit: Option<&Path>, overrides: &[String]) -> Result<Self> {
        let (file, source) = RoundsmanConfig::load(explicit)?;
        let mut settings = file.settings()?;
        config::apply_overrides(&mut settings, overrides)?;
        settings.set(NAMESPACE, Value::Handle(Handle::Namespace(NAMESPACE.to_string())));
        for task in TASKS {
            settings.register_task(task);
        }
        Ok(Self {
            host: file.host,
            settings,
            source,
        })
    }

    /// Provisioner talking to the configured host over ssh.
    pub fn provisioner(self) -> Result<Provisioner> {
        let transport = SshTransport::new(&self.host)?;
        Ok(Provisioner::new(Box::new(transport), self.settings))
    }

    pub fn host_label(&self) -> String {
        self.host
            .address
            .clone()
            .unwrap_or_else(|| "<no host>".to_string())
    }
}

/// Print the advice for a provisioning failure. The error itself is
/// reported once, by `main`.
pub fn report_failure(err: chefkit::Error) -> anyhow::Error {
    let category = err.category();
    println!("  {} {}", "Fix:".cyan(), category.advice());
    if err.is_fatal() {
        ui::dim("Nothing was changed on the host.");
    }
    anyhow::Error::new(err).context(category.description())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_registers_tasks_and_overrides() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("roundsman.toml");
        fs::write(
            &path,
            "[host]\naddress = \"app1\"\n\n[settings]\nchef_version = \"0.10.10\"\n",
        )
        .unwrap();

        let project = Project::load(Some(&path), &["ruby_version=1.9.3-p194".to_string()]).unwrap();
        assert_eq!(project.host_label(), "app1");
        assert_eq!(project.source.as_deref(), Some(path.as_path()));
        assert_eq!(project.settings.string("chef_version").unwrap(), "0.10.10");
        assert_eq!(project.settings.string("ruby_version").unwrap(), "1.9.3-p194");
        for task in TASKS {
            assert!(matches!(project.settings.get(task), Some(Value::Handle(_))));
        }
        assert!(matches!(
            project.settings.get(NAMESPACE),
            Some(Value::Handle(Handle::Namespace(_)))
        ));
    }

    #[test]
    fn test_report_failure_keeps_the_error() {
        let err = report_failure(chefkit::PreconditionError::EmptyRunList.into());
        assert_eq!(err.to_string(), "Precondition failed");
        let chain: Vec<String> = err.chain().map(ToString::to_string).collect();
        assert_eq!(
            chain,
            vec![
                "Precondition failed",
                "You must specify at least one recipe when running chef"
            ]
        );
        assert!(err.downcast_ref::<chefkit::Error>().is_some());
    }

    #[test]
    fn test_host_label_without_address() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("roundsman.json");
        fs::write(&path, "{}").unwrap();
        let project = Project::load(Some(&path), &[]).unwrap();
        assert_eq!(project.host_label(), "<no host>");
        assert!(project.provisioner().is_err());
    }
}
