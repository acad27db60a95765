use anyhow::Result;
use chefkit::RuntimeVerdict;

use crate::Context;
use crate::commands::{Project, report_failure};
use crate::ui;

pub fn ruby(ctx: &Context, project: Project) -> Result<()> {
    let host = project.host_label();
    announce(ctx, "Installing Ruby", &host);
    project
        .provisioner()?
        .install_runtime()
        .map_err(report_failure)?;
    ui::success(&format!("Ruby installed on {host}"));
    Ok(())
}

pub fn dependencies(ctx: &Context, project: Project) -> Result<()> {
    let host = project.host_label();
    announce(ctx, "Installing Ruby build dependencies", &host);
    project
        .provisioner()?
        .install_dependencies()
        .map_err(report_failure)?;
    ui::success(&format!("Dependencies installed on {host}"));
    Ok(())
}

pub fn chef(ctx: &Context, project: Project) -> Result<()> {
    let host = project.host_label();
    announce(ctx, "Installing chef", &host);
    project
        .provisioner()?
        .install_agent()
        .map_err(report_failure)?;
    ui::success(&format!("chef installed on {host}"));
    Ok(())
}

pub fn check_ruby_version(ctx: &Context, project: Project) -> Result<()> {
    let host = project.host_label();
    announce(ctx, "Checking Ruby version", &host);
    let verdict = project
        .provisioner()?
        .check_runtime_version()
        .map_err(report_failure)?;
    match verdict {
        RuntimeVerdict::Tolerated { .. } => ui::warn(&verdict.narrative()),
        _ => ui::success(&verdict.narrative()),
    }
    Ok(())
}

fn announce(ctx: &Context, action: &str, host: &str) {
    if !ctx.quiet {
        ui::header(&format!("{action} on {host}"));
    }
}
