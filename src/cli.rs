use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "roundsman")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Provision hosts with Ruby and chef-solo over ssh", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (defaults to ./roundsman.toml or ./roundsman.json)
    #[arg(short, long, global = true, env = "ROUNDSMAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override a setting, e.g. -s ruby_version=1.9.3-p194 (repeatable)
    #[arg(short = 's', long = "set", value_name = "NAME=VALUE", global = true)]
    pub set: Vec<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List every setting with its value
    Configuration,

    /// Provision the host and run chef-solo with the given recipes
    Chef(ChefArgs),

    /// Install Ruby with ruby-build
    InstallRuby,

    /// Install the OS packages needed to build Ruby
    InstallDependencies,

    /// Reinstall chef at the pinned version
    InstallChef,

    /// Fail unless the installed Ruby matches ruby_version
    CheckRubyVersion,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser)]
pub struct ChefArgs {
    /// Recipes to run, e.g. base nginx::server
    pub run_list: Vec<String>,
}

/// Namespace the tasks live under.
pub const NAMESPACE: &str = "roundsman";

/// Names under which the invocable commands are registered as tasks.
pub const TASKS: &[&str] = &[
    "roundsman:configuration",
    "roundsman:chef",
    "roundsman:install_ruby",
    "roundsman:install_dependencies",
    "roundsman:install_chef",
    "roundsman:check_ruby_version",
];
