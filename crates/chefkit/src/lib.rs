//! # chefkit
//!
//! Provision a host with Ruby and chef, then converge it with chef-solo,
//! entirely through a remote command channel.
//!
//! This crate provides:
//! - A settings registry with default/override tracking and deferred values
//! - Read-only probes of the remote host (Ruby, chef gem, distribution)
//! - Pure install decisions
//! - Generation of `solo.rb` and `solo.json`
//! - Cookbook packaging and transfer
//! - The [`Provisioner`] that sequences all of the above
//!
//! ## Example
//!
//! ```no_run
//! use chefkit::{Provisioner, Settings};
//! use chefkit::transport::MockTransport;
//!
//! let mut settings = Settings::with_defaults();
//! settings.set("ruby_version", "1.9.3-p194");
//! settings.set("application", "shop");
//!
//! let provisioner = Provisioner::new(Box::new(MockTransport::new()), settings);
//! let report = provisioner.chef(&["base".to_string()]).expect("provisioning failed");
//! for step in &report.steps {
//!     println!("{step}");
//! }
//! ```
//!
//! ## Transport
//!
//! The crate does not speak ssh. Callers implement [`Transport`] for their
//! channel; [`transport::MockTransport`] records calls for tests.

#![warn(clippy::all)]

pub mod bundle;
pub mod decision;
pub mod error;
pub mod options;
pub mod orchestrator;
pub mod probe;
pub mod session;
pub mod settings;
pub mod transfer;
pub mod transport;

pub use decision::RuntimeVerdict;
pub use error::{Error, ErrorCategory, PreconditionError, Result};
pub use options::ProvisionOptions;
pub use orchestrator::{Provisioner, RunReport, Step};
pub use probe::RuntimeVersion;
pub use settings::{ConfigurationEntry, Deferred, Handle, Settings, Value};
pub use transport::Transport;
