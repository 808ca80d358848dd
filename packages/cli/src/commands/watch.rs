use super::render::{output_path, render_page, write_output};
use super::{resolve, Page};
use crate::config::Config;
use crate::watcher::FileWatcher;
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Page to watch
    pub file: PathBuf,

    /// Output file (overrides config outDir)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Quiet period before re-rendering, in milliseconds
    #[arg(long, default_value = "100")]
    pub debounce: u64,
}

/// Re-render design-time HTML every time the page is saved
pub fn watch(args: WatchArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let path = resolve(cwd, &args.file);
    let target = output_path(&config, cwd, &path, args.output.as_deref())
        .ok_or_else(|| anyhow!("watch needs --output or an outDir in the config"))?;

    let watcher = FileWatcher::new(path.clone())?;
    println!("{}", "👀 Watching for changes...".bright_blue());
    println!("   {} → {}", args.file.display(), target.display());

    rebuild(&path, &target, &config, cwd);
    loop {
        watcher.next_change()?;
        watcher.debounce(Duration::from_millis(args.debounce));
        rebuild(&path, &target, &config, cwd);
    }
}

/// Render once; failures are reported and watching goes on
fn rebuild(path: &Path, target: &Path, config: &Config, cwd: &str) {
    let result = Page::open(path, config, cwd).and_then(|mut page| {
        page.print_issues();
        let html = render_page(&mut page, &[])?;
        write_output(target, &html)
    });
    match result {
        Ok(()) => println!("  {} rendered {}", "✓".green(), path.display()),
        Err(e) => eprintln!("  {} {}", "✗".red(), e.to_string().red()),
    }
}
