use anyhow::Result;

use crate::Context;
use crate::commands::Project;
use crate::ui;

/// Print every built-in setting with its effective value.
pub fn run(ctx: &Context, project: &Project) -> Result<()> {
    if !ctx.quiet {
        ui::header("Roundsman configuration");
        if let Some(source) = &project.source {
            ui::kv("Config", &source.display().to_string());
        }
        ui::kv("Host", &project.host_label());
        println!();
    }

    for entry in project.settings.configuration() {
        println!("{entry}");
    }
    Ok(())
}
