//! Designer options

/// Default bound for the fixed-point control scan
pub const DEFAULT_MAX_SCAN_PASSES: usize = 64;

/// Tuning knobs for one designer host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesignerOptions {
    /// Markup injected at the start of `<head>` in design-time HTML
    pub designer_context: String,
    /// How many times a control scan may restart after editing the markup
    pub max_scan_passes: usize,
}

impl Default for DesignerOptions {
    fn default() -> Self {
        Self {
            designer_context: String::new(),
            max_scan_passes: DEFAULT_MAX_SCAN_PASSES,
        }
    }
}

impl DesignerOptions {
    pub fn with_designer_context(mut self, context: impl Into<String>) -> Self {
        self.designer_context = context.into();
        self
    }

    pub fn with_max_scan_passes(mut self, passes: usize) -> Self {
        self.max_scan_passes = passes.max(1);
        self
    }
}

/// Build the designer context from script and stylesheet URLs
pub fn designer_context<S: AsRef<str>>(scripts: &[S], style_sheets: &[S]) -> String {
    let mut context = String::new();
    for script in scripts {
        context.push_str(&format!(
            "<script type=\"text/javascript\" src=\"{}\"></script>\n",
            script.as_ref()
        ));
    }
    for sheet in style_sheets {
        context.push_str(&format!(
            "<link rel=\"stylesheet\" type=\"text/css\" href=\"{}\" />\n",
            sheet.as_ref()
        ));
    }
    context
}
