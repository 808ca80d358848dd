pub mod normalize;
pub mod remove;
pub mod render;
pub mod set;
pub mod watch;

pub use normalize::{normalize, NormalizeArgs};
pub use remove::{remove, RemoveArgs};
pub use render::{render, RenderArgs};
pub use set::{set, SetArgs};
pub use watch::{watch, WatchArgs};

use crate::config::Config;
use anyhow::{Context, Result};
use colored::Colorize;
use formsmith_editor::{DesignerHost, ScanReport};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions of markup files the designer understands
pub const PAGE_EXTENSIONS: &[&str] = &["aspx", "ascx", "master"];

/// One markup file loaded into its own designer host
pub struct Page {
    pub path: PathBuf,
    pub host: DesignerHost,
    pub report: ScanReport,
    original: String,
}

impl Page {
    pub fn open(path: &Path, config: &Config, cwd: &str) -> Result<Self> {
        let original = fs::read_to_string(path)
            .with_context(|| format!("Cannot read {}", path.display()))?;
        let mut host = DesignerHost::with_options(config.designer_options(cwd));
        let report = host
            .load_text(&original)
            .with_context(|| format!("Cannot load {}", path.display()))?;

        Ok(Self {
            path: path.to_path_buf(),
            host,
            report,
            original,
        })
    }

    pub fn display_name(&self) -> String {
        self.path.display().to_string()
    }

    pub fn text(&mut self) -> String {
        self.host.settle();
        self.host
            .document()
            .map(|document| document.text())
            .unwrap_or_default()
    }

    pub fn is_changed(&mut self) -> bool {
        let text = self.text();
        text != self.original
    }

    /// Write the markup back if the designer changed it
    pub fn save(&mut self) -> Result<bool> {
        let text = self.text();
        if text == self.original {
            return Ok(false);
        }
        fs::write(&self.path, &text)
            .with_context(|| format!("Cannot write {}", self.path.display()))?;
        tracing::info!("saved {}", self.path.display());
        self.original = text;
        Ok(true)
    }

    pub fn print_issues(&self) {
        for issue in &self.report.issues {
            eprintln!("  {} {}", "⚠".yellow(), issue.to_string().yellow());
        }
    }
}

pub fn is_page_file(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| {
            PAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(extension))
        })
}

/// Markup files under `path`, or `path` itself when it is a file
pub fn find_pages(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        return vec![path.to_path_buf()];
    }
    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.into_path())
        .filter(|path| path.is_file() && is_page_file(path))
        .collect();
    files.sort();
    files
}

/// Resolve a command-line path against the working directory
pub fn resolve(cwd: &str, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        Path::new(cwd).join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_pages() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("admin")).unwrap();
        fs::write(dir.path().join("Default.aspx"), "").unwrap();
        fs::write(dir.path().join("admin/Site.Master"), "").unwrap();
        fs::write(dir.path().join("admin/Menu.ascx"), "").unwrap();
        fs::write(dir.path().join("style.css"), "").unwrap();

        let pages = find_pages(dir.path());
        let names: Vec<String> = pages
            .iter()
            .map(|page| page.strip_prefix(dir.path()).unwrap().display().to_string())
            .collect();
        assert_eq!(names, vec!["Default.aspx", "admin/Menu.ascx", "admin/Site.Master"]);

        let single = dir.path().join("style.css");
        assert_eq!(find_pages(&single), vec![single]);
    }

    #[test]
    fn test_page_save_only_when_changed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.aspx");
        fs::write(&path, r#"<p><asp:Label id="l" runat="server" /></p>"#).unwrap();

        let mut page = Page::open(&path, &Config::default(), ".").unwrap();
        assert!(!page.is_changed());
        assert!(!page.save().unwrap());

        page.host
            .set_component_property_text("l", "Text", "Hello")
            .unwrap();
        assert!(page.save().unwrap());
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            r#"<p><asp:Label id="l" runat="server" Text="Hello" /></p>"#
        );
    }
}
