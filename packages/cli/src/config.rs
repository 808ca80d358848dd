use formsmith_editor::{designer_context, DesignerOptions, DEFAULT_MAX_SCAN_PASSES};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_NAME: &str = "formsmith.config.json";

/// Formsmith configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Directory holding the designer's own scripts and style sheets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub designer_context_dir: Option<String>,

    /// Scripts injected into `<head>` of design-time HTML
    #[serde(default)]
    pub scripts: Vec<String>,

    /// Style sheets injected into `<head>` of design-time HTML
    #[serde(default)]
    pub style_sheets: Vec<String>,

    /// Bound on control scan restarts
    #[serde(default = "default_max_scan_passes")]
    pub max_scan_passes: usize,

    /// Where rendered design-time HTML goes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_dir: Option<String>,
}

fn default_max_scan_passes() -> usize {
    DEFAULT_MAX_SCAN_PASSES
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            tracing::debug!("loaded {}", config_path.display());
            Ok(config)
        } else {
            // Return default config if none exists
            Ok(Config::default())
        }
    }

    /// Script/stylesheet reference, resolved against the context directory
    fn context_url(&self, cwd: &str, path: &str) -> String {
        if path.contains("://") {
            return path.to_string();
        }
        match &self.designer_context_dir {
            Some(dir) => {
                let full = Path::new(cwd).join(dir).join(path);
                format!("file://{}", full.display())
            }
            None => path.to_string(),
        }
    }

    pub fn designer_options(&self, cwd: &str) -> DesignerOptions {
        let scripts: Vec<String> = self
            .scripts
            .iter()
            .map(|script| self.context_url(cwd, script))
            .collect();
        let style_sheets: Vec<String> = self
            .style_sheets
            .iter()
            .map(|sheet| self.context_url(cwd, sheet))
            .collect();

        DesignerOptions::default()
            .with_designer_context(designer_context(&scripts, &style_sheets))
            .with_max_scan_passes(self.max_scan_passes)
    }

    /// Output directory for rendered pages, if configured
    pub fn get_out_dir(&self, cwd: &str) -> Option<PathBuf> {
        self.out_dir.as_ref().map(|dir| PathBuf::from(cwd).join(dir))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            designer_context_dir: None,
            scripts: vec![],
            style_sheets: vec![],
            max_scan_passes: default_max_scan_passes(),
            out_dir: None,
        }
    }
}
