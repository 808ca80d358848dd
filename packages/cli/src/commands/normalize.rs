use super::{find_pages, resolve, Page};
use crate::config::Config;
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct NormalizeArgs {
    /// Page or directory of pages (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Report pages that need ids without writing them
    #[arg(long)]
    pub check: bool,
}

/// Give every server control a unique id, writing the ids into the markup
pub fn normalize(args: NormalizeArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let root = resolve(cwd, &args.path);
    let pages = find_pages(&root);

    if pages.is_empty() {
        println!("{}", "⚠️  No pages found".yellow());
        return Ok(());
    }

    let mut changed = 0;
    let mut error_count = 0;

    for path in &pages {
        let relative = path.strip_prefix(&root).unwrap_or(path);
        let mut page = match Page::open(path, &config, cwd) {
            Ok(page) => page,
            Err(e) => {
                error_count += 1;
                eprintln!("  {} {} - {}", "✗".red(), relative.display(), e.to_string().red());
                continue;
            }
        };
        page.print_issues();

        if !page.is_changed() {
            tracing::debug!("{} already normalized", relative.display());
            continue;
        }
        changed += 1;
        let ids = page.report.ids_inserted.join(", ");
        if args.check {
            println!("  {} {} needs ids: {}", "•".yellow(), relative.display(), ids);
        } else {
            page.save()?;
            println!("  {} {} ← {}", "✓".green(), relative.display(), ids.cyan());
        }
    }

    println!();
    println!(
        "{} {} of {} page(s) {}",
        if changed == 0 { "✅".green() } else { "✏️".yellow() },
        changed,
        pages.len(),
        if args.check { "need ids" } else { "updated" }
    );

    if error_count > 0 {
        return Err(anyhow!("{} page(s) could not be loaded", error_count));
    }
    if args.check && changed > 0 {
        return Err(anyhow!("{} page(s) are not normalized", changed));
    }
    Ok(())
}
