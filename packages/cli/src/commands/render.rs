use super::{resolve, Page};
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use formsmith_editor::DesignTimeHtml;
use formsmith_parser::{format_diagnostics, SourceText};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Page to render
    pub file: PathBuf,

    /// Output file (overrides config outDir)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,

    /// Components to mark as selected, comma separated
    #[arg(short, long, value_delimiter = ',')]
    pub select: Vec<String>,
}

pub fn render(args: RenderArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let path = resolve(cwd, &args.file);

    let mut page = Page::open(&path, &config, cwd)?;
    page.print_issues();
    let html = render_page(&mut page, &args.select)?;

    let target = if args.stdout {
        None
    } else {
        output_path(&config, cwd, &path, args.output.as_deref())
    };
    match target {
        Some(target) => {
            write_output(&target, &html)?;
            println!(
                "  {} {} → {}",
                "✓".green(),
                args.file.display(),
                target.display()
            );
        }
        None => println!("{}", html.html),
    }
    Ok(())
}

/// Activate the page and produce its design-time HTML, printing any
/// markup warnings
pub fn render_page(page: &mut Page, select: &[String]) -> Result<Arc<DesignTimeHtml>> {
    page.host.activate()?;
    if !select.is_empty() {
        page.host.select(select, 0);
    }
    let html = page.host.serialize_document()?;

    if !html.warnings.is_empty() {
        let source = SourceText::new(page.text());
        eprint!(
            "{}",
            format_diagnostics(&source, &page.display_name(), &html.warnings)
        );
    }
    Ok(html)
}

/// Explicit output, else `<outDir>/<page>.html`, else stdout
pub fn output_path(config: &Config, cwd: &str, page: &Path, explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(explicit) = explicit {
        return Some(resolve(cwd, explicit));
    }
    let out_dir = config.get_out_dir(cwd)?;
    let name = page.file_name()?.to_string_lossy();
    Some(out_dir.join(format!("{}.html", name)))
}

pub fn write_output(target: &Path, html: &DesignTimeHtml) -> Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(target, &html.html)?;
    Ok(())
}
