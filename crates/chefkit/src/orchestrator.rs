//! The provisioning entry points.
//!
//! [`Provisioner::chef`] walks the run through these steps, aborting at the
//! first failure:
//!
//! 1. validate the run list and cookbook directories (no remote calls)
//! 2. check the distribution
//! 3. install OS dependencies and Ruby, if Ruby is missing or mismatched
//! 4. install chef, if no installed gem satisfies the constraint
//! 5. generate `solo.rb` and `solo.json` and upload them
//! 6. archive, upload and unpack the cookbooks
//! 7. run chef-solo
//!
//! Every public method starts a fresh [`Session`], so memoized facts never
//! carry over from one call to the next.

use crate::bundle;
use crate::decision::{self, RuntimeVerdict};
use crate::error::{PreconditionError, Result};
use crate::options::ProvisionOptions;
use crate::probe;
use crate::session::Session;
use crate::settings::{ConfigurationEntry, Settings};
use crate::transfer::{self, ATTRIBUTES_FILE, ArchiveOptions, CONFIG_FILE};
use crate::transport::Transport;
use std::fmt;
use std::path::PathBuf;

/// A step the orchestrator performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    InstallDependencies,
    InstallRuntime,
    InstallAgent,
    AssembleConfig,
    AssembleAttributes,
    TransferCookbooks,
    TriggerConvergence,
}

impl Step {
    pub fn description(&self) -> &'static str {
        match self {
            Self::InstallDependencies => "Installed Ruby build dependencies",
            Self::InstallRuntime => "Installed Ruby",
            Self::InstallAgent => "Installed chef",
            Self::AssembleConfig => "Generated solo.rb",
            Self::AssembleAttributes => "Generated solo.json",
            Self::TransferCookbooks => "Uploaded cookbooks",
            Self::TriggerConvergence => "Ran chef-solo",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// What a `chef` run did, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub steps: Vec<Step>,
    pub run_list: Vec<String>,
    pub cookbook_paths: Vec<String>,
}

impl RunReport {
    pub fn installed_anything(&self) -> bool {
        self.steps.iter().any(|s| {
            matches!(
                s,
                Step::InstallDependencies | Step::InstallRuntime | Step::InstallAgent
            )
        })
    }
}

/// Provisions one host through a transport.
pub struct Provisioner {
    transport: Box<dyn Transport>,
    settings: Settings,
    archive_dir: Option<PathBuf>,
}

impl Provisioner {
    pub fn new(transport: Box<dyn Transport>, settings: Settings) -> Self {
        Self {
            transport,
            settings,
            archive_dir: None,
        }
    }

    /// Build cookbook archives in `dir` instead of the system temp dir.
    pub fn with_archive_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.archive_dir = Some(dir.into());
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Every registered default with its displayed value.
    pub fn configuration(&self) -> Vec<ConfigurationEntry> {
        self.settings.configuration()
    }

    /// Bring the host up to date and converge it with `run_list`.
    pub fn chef(&self, run_list: &[String]) -> Result<RunReport> {
        let options = ProvisionOptions::from_settings(&self.settings)?;
        let cookbook_paths = validate_preconditions(&options, run_list)?;

        let mut session = self.session(&options);
        let mut report = RunReport {
            run_list: run_list.to_vec(),
            cookbook_paths: cookbook_paths.clone(),
            ..RunReport::default()
        };

        probe::ensure_supported_distro(&mut session)?;

        if runtime_verdict(&session, &options)?.needs_install() {
            install_dependencies(&mut session, &options)?;
            report.steps.push(Step::InstallDependencies);
            install_runtime(&mut session, &options)?;
            report.steps.push(Step::InstallRuntime);
        }

        if decision::should_install_agent(probe::agent_satisfies_version(
            &session,
            &options.chef_version,
        )?) {
            install_agent(&session, &options)?;
            report.steps.push(Step::InstallAgent);
        }

        let config = bundle::build_config_document(&cookbook_paths);
        report.steps.push(Step::AssembleConfig);
        let attributes = bundle::build_attributes_document(&self.settings, run_list)?;
        let attributes = bundle::render_attributes(&attributes)?;
        report.steps.push(Step::AssembleAttributes);
        transfer::transfer_bundle(&mut session, &config, &attributes)?;

        let archive = ArchiveOptions {
            copyfile_disable: options.copyfile_disable,
            temp_dir: self.archive_dir.clone(),
        };
        transfer::transfer_cookbooks(&mut session, &cookbook_paths, &archive)?;
        report.steps.push(Step::TransferCookbooks);

        let solo_rb = session.working_path(CONFIG_FILE)?;
        let solo_json = session.working_path(ATTRIBUTES_FILE)?;
        session.root(&format!("chef-solo -c {solo_rb} -j {solo_json}"))?;
        report.steps.push(Step::TriggerConvergence);

        Ok(report)
    }

    /// Install the OS packages Ruby needs.
    pub fn install_dependencies(&self) -> Result<()> {
        let options = ProvisionOptions::from_settings(&self.settings)?;
        install_dependencies(&mut self.session(&options), &options)
    }

    /// Build and install Ruby with the install script.
    pub fn install_runtime(&self) -> Result<()> {
        let options = ProvisionOptions::from_settings(&self.settings)?;
        install_runtime(&mut self.session(&options), &options)
    }

    /// Reinstall chef at the pinned version.
    pub fn install_agent(&self) -> Result<()> {
        let options = ProvisionOptions::from_settings(&self.settings)?;
        install_agent(&self.session(&options), &options)
    }

    /// Fail unless the installed Ruby satisfies the required version.
    pub fn check_runtime_version(&self) -> Result<RuntimeVerdict> {
        let options = ProvisionOptions::from_settings(&self.settings)?;
        let session = self.session(&options);
        let verdict = runtime_verdict(&session, &options)?;
        match &verdict {
            RuntimeVerdict::NotInstalled => Err(PreconditionError::RuntimeVersionMismatch {
                installed: "none".to_string(),
                required: options.ruby_version.replace('-', ""),
            }
            .into()),
            RuntimeVerdict::Mismatch {
                installed,
                required,
            } => Err(PreconditionError::RuntimeVersionMismatch {
                installed: installed.clone(),
                required: required.clone(),
            }
            .into()),
            _ => Ok(verdict),
        }
    }

    fn session(&self, options: &ProvisionOptions) -> Session<'_> {
        Session::new(
            self.transport.as_ref(),
            &options.chef_directory,
            options.stream_output,
        )
    }
}

fn validate_preconditions(options: &ProvisionOptions, run_list: &[String]) -> Result<Vec<String>> {
    if run_list.is_empty() {
        return Err(PreconditionError::EmptyRunList.into());
    }
    let cookbook_paths = options.cookbook_paths();
    if cookbook_paths.is_empty() {
        return Err(PreconditionError::NoCookbooks {
            searched: options.cookbooks_directory.clone(),
        }
        .into());
    }
    Ok(cookbook_paths)
}

fn runtime_verdict(session: &Session<'_>, options: &ProvisionOptions) -> Result<RuntimeVerdict> {
    let installed = probe::runtime_version(session)?;
    let verdict = decision::runtime_verdict(
        &options.ruby_version,
        &installed,
        options.care_about_ruby_version,
    );
    log::info!("{}", verdict.narrative());
    Ok(verdict)
}

fn install_dependencies(session: &mut Session<'_>, options: &ProvisionOptions) -> Result<()> {
    probe::ensure_supported_distro(session)?;
    session.root("aptitude -yq update")?;
    session.root(&format!(
        "aptitude -yq install {}",
        options.ruby_dependencies.join(" ")
    ))
}

fn install_runtime(session: &mut Session<'_>, options: &ProvisionOptions) -> Result<()> {
    let script = options.render_install_script();
    let path = session.working_path("install_ruby.sh")?;
    session.transport().put(script.as_bytes(), &path)?;
    session.root(&format!("bash {path}"))
}

fn install_agent(session: &Session<'_>, options: &ProvisionOptions) -> Result<()> {
    if let Err(e) = session.root("gem uninstall -xaI chef || true") {
        log::warn!("Could not remove existing chef: {e}");
    }
    session.root(&format!(
        "gem install chef -v {:?} --quiet --no-ri --no-rdoc",
        options.chef_version
    ))?;
    session.root("gem install ruby-shadow --quiet --no-ri --no-rdoc")
}
