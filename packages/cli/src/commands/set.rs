use super::{resolve, Page};
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct SetArgs {
    /// Page to edit
    pub file: PathBuf,

    /// Component id
    pub id: String,

    /// Property name, or event name with --event
    pub property: String,

    /// New value in markup form; omit to reset to the default
    pub value: Option<String>,

    /// Bind an event handler instead of setting a property
    #[arg(short, long)]
    pub event: bool,
}

/// Change one property through the designer and save the page
pub fn set(args: SetArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let path = resolve(cwd, &args.file);
    let mut page = Page::open(&path, &config, cwd)?;
    page.print_issues();

    match (&args.value, args.event) {
        (value, true) => page
            .host
            .set_event_handler(&args.id, &args.property, value.as_deref())?,
        (Some(value), false) => page
            .host
            .set_component_property_text(&args.id, &args.property, value)?,
        (None, false) => page.host.reset_component_property(&args.id, &args.property)?,
    }

    let shown = args.value.as_deref().unwrap_or("(default)");
    if page.save()? {
        println!(
            "  {} {}.{} = {}",
            "✓".green(),
            args.id,
            args.property,
            shown.cyan()
        );
    } else {
        println!(
            "  {} {}.{} already {}",
            "•".dimmed(),
            args.id,
            args.property,
            shown
        );
    }
    Ok(())
}
