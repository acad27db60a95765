//! Typed view of the built-in settings.

use crate::error::Result;
use crate::settings::{Settings, keys};
use std::path::Path;

/// The built-in settings the orchestrator reads, checked once per run.
///
/// Built-in settings must be concrete. Deferred values are reserved for the
/// attributes document, so a deferred built-in is reported as an
/// [`Error::InvalidSetting`](crate::Error::InvalidSetting).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionOptions {
    pub ruby_version: String,
    pub cookbooks_directory: Vec<String>,
    pub stream_output: bool,
    pub care_about_ruby_version: bool,
    pub chef_directory: String,
    pub chef_version: String,
    pub copyfile_disable: bool,
    pub ruby_dependencies: Vec<String>,
    pub ruby_install_dir: String,
    pub ruby_install_script: String,
}

impl ProvisionOptions {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self {
            ruby_version: settings.string(keys::RUBY_VERSION)?,
            cookbooks_directory: settings.string_list(keys::COOKBOOKS_DIRECTORY)?,
            stream_output: settings.flag(keys::STREAM_CHEF_OUTPUT)?,
            care_about_ruby_version: settings.flag(keys::CARE_ABOUT_RUBY_VERSION)?,
            chef_directory: settings.string(keys::CHEF_DIRECTORY)?,
            chef_version: settings.string(keys::CHEF_VERSION)?,
            copyfile_disable: settings.flag(keys::COPYFILE_DISABLE)?,
            ruby_dependencies: settings.string_list(keys::RUBY_DEPENDENCIES)?,
            ruby_install_dir: settings.string(keys::RUBY_INSTALL_DIR)?,
            ruby_install_script: settings.string(keys::RUBY_INSTALL_SCRIPT)?,
        })
    }

    /// Configured cookbook directories that exist locally, in order.
    pub fn cookbook_paths(&self) -> Vec<String> {
        self.cookbooks_directory
            .iter()
            .filter(|path| Path::new(path).exists())
            .cloned()
            .collect()
    }

    /// The Ruby install script with its placeholders filled in.
    pub fn render_install_script(&self) -> String {
        self.ruby_install_script
            .replace("{chef_directory}", &self.chef_directory)
            .replace("{ruby_version}", &self.ruby_version)
            .replace("{ruby_install_dir}", &self.ruby_install_dir)
    }
}
