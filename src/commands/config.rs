//! `fbexec config show` and `fbexec config normalize`

use anyhow::{Context, Result};
use colored::Colorize;

use super::ProjectArgs;
use crate::config::{read_input_file, render_input, write_input_file, InputOptions};
use crate::fs::ProjectLayout;

fn load(project: &ProjectArgs) -> Result<(ProjectLayout, InputOptions, String)> {
    let settings = project.settings()?;
    let layout = ProjectLayout::new(&project.root, &settings.prefix);
    let path = layout.input_file();
    let options = read_input_file(&path)
        .with_context(|| format!("Failed to read input file {}", path.display()))?;
    Ok((layout, options, settings.checkpoint_file))
}

/// Print the parsed option tree, as JSON or in the input dialect.
pub fn show(project: &ProjectArgs, json: bool) -> Result<()> {
    let (_, options, checkpoint_file) = load(project)?;
    if json {
        let text =
            serde_json::to_string_pretty(&options).context("Failed to serialize options")?;
        println!("{text}");
    } else {
        print!("{}", render_input(&options, &checkpoint_file));
    }
    Ok(())
}

/// Rewrite the input file through the writer, normalizing values and layout.
pub fn normalize(project: &ProjectArgs) -> Result<()> {
    let (layout, options, checkpoint_file) = load(project)?;
    let path = layout.input_file();
    write_input_file(&path, &options, &checkpoint_file)
        .with_context(|| format!("Failed to write input file {}", path.display()))?;
    println!(
        "{} {} ({} target(s))",
        "Normalized".green().bold(),
        path.display(),
        options.targets.len()
    );
    Ok(())
}
