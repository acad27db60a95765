mod cli;
mod commands;
mod config;
mod paths;
mod progress;
mod prompt;
mod runner;
mod ssh;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use commands::Project;
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    if let Command::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "roundsman", &mut io::stdout());
        return Ok(());
    }

    let project = Project::load(cli.config.as_deref(), &cli.set)?;
    if let Some(source) = &project.source {
        log::debug!("Loaded {}", source.display());
    }

    match cli.command {
        Command::Configuration => commands::configuration::run(&ctx, &project),
        Command::Chef(args) => commands::chef::run(&ctx, project, args),
        Command::InstallRuby => commands::install::ruby(&ctx, project),
        Command::InstallDependencies => commands::install::dependencies(&ctx, project),
        Command::InstallChef => commands::install::chef(&ctx, project),
        Command::CheckRubyVersion => commands::install::check_ruby_version(&ctx, project),
        Command::Completions { .. } => Ok(()),
    }
}
