use anyhow::Result;
use chefkit::RunReport;

use crate::Context;
use crate::cli::ChefArgs;
use crate::commands::{Project, report_failure};
use crate::ui;

const COOKBOOK_DISPLAY_WIDTH: usize = 60;

pub fn run(ctx: &Context, project: Project, args: ChefArgs) -> Result<()> {
    let host = project.host_label();
    if !ctx.quiet {
        ui::header(&format!("Provisioning {host}"));
        ui::kv("Run list", &args.run_list.join(", "));
    }

    let provisioner = project.provisioner()?;
    let report = provisioner.chef(&args.run_list).map_err(report_failure)?;

    if !ctx.quiet {
        print_report(ctx, &report);
    }
    ui::success(&format!("{host} converged"));
    Ok(())
}

fn print_report(ctx: &Context, report: &RunReport) {
    ui::section("Steps");
    let total = report.steps.len();
    for (i, step) in report.steps.iter().enumerate() {
        ui::step(i + 1, total, step.description());
    }

    if !report.installed_anything() {
        ui::info("Ruby and chef were already up to date");
    }

    if ctx.verbose > 0 {
        ui::section("Cookbooks");
        for path in &report.cookbook_paths {
            ui::dim(&ui::truncate_path(path, COOKBOOK_DISPLAY_WIDTH));
        }
    }
    println!();
}
