//! # Control Designers
//!
//! A designer decides what a component looks like on the design surface.
//!
//! ## Design
//!
//! - [`BaseDesigner`] runs the pre-render hook, then the control's own
//!   rendering, and falls back to a placeholder when that renders nothing
//! - Type-specific designers tweak a throwaway copy of the component so the
//!   live component's properties are never touched by rendering
//! - [`DesignerRegistry`] maps type names to designers, with the base
//!   designer as fallback

use crate::component::{Component, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Produces design-time HTML for a component
pub trait ControlDesigner: Send + Sync + fmt::Debug {
    fn design_time_html(&self, site_name: &str, component: &mut dyn Component) -> String;
}

/// Grey box showing the site name
pub fn placeholder_html(site_name: &str) -> String {
    let label = if site_name.is_empty() {
        "Control"
    } else {
        site_name
    };
    format!(
        "<span style=\"width:100px; height:20px; background-color: #e3e3e3; color: #670023;\">{}</span>",
        label
    )
}

/// Copy of a component with the same property values
fn preview(component: &dyn Component) -> Box<dyn Component> {
    let mut copy = component.descriptor().instantiate();
    *copy.properties_mut() = component.properties().clone();
    copy
}

fn render_or_placeholder(site_name: &str, component: &mut dyn Component) -> String {
    if let Some(hook) = component.as_pre_renderable() {
        hook.pre_render();
    }
    let html = component.render(site_name);
    if html.trim().is_empty() {
        placeholder_html(site_name)
    } else {
        html
    }
}

#[derive(Debug, Default)]
pub struct BaseDesigner;

impl ControlDesigner for BaseDesigner {
    fn design_time_html(&self, site_name: &str, component: &mut dyn Component) -> String {
        render_or_placeholder(site_name, component)
    }
}

/// Shows `[name]` on buttons without text
#[derive(Debug, Default)]
pub struct ButtonDesigner;

impl ControlDesigner for ButtonDesigner {
    fn design_time_html(&self, site_name: &str, component: &mut dyn Component) -> String {
        if !component.properties().get_str("Text").is_empty() {
            return render_or_placeholder(site_name, component);
        }
        let mut copy = preview(component);
        let _ = copy.set_property("Text", Value::Str(format!("[{}]", site_name)));
        render_or_placeholder(site_name, copy.as_mut())
    }
}

/// Labels without text would be invisible
#[derive(Debug, Default)]
pub struct LabelDesigner;

impl ControlDesigner for LabelDesigner {
    fn design_time_html(&self, site_name: &str, component: &mut dyn Component) -> String {
        if !component.properties().get_str("Text").is_empty() {
            return render_or_placeholder(site_name, component);
        }
        let mut copy = preview(component);
        let _ = copy.set_property("Text", Value::Str(format!("[{}]", site_name)));
        render_or_placeholder(site_name, copy.as_mut())
    }
}

/// Gives unsized multi-line boxes a visible size
#[derive(Debug, Default)]
pub struct TextBoxDesigner;

impl ControlDesigner for TextBoxDesigner {
    fn design_time_html(&self, site_name: &str, component: &mut dyn Component) -> String {
        let properties = component.properties();
        let multi_line = properties.get_str("TextMode") == "MultiLine";
        if !multi_line || properties.get_int("Rows") > 0 {
            return render_or_placeholder(site_name, component);
        }
        let mut copy = preview(component);
        let _ = copy.set_property("Rows", Value::Int(2));
        if copy.properties().get_int("Columns") <= 0 {
            let _ = copy.set_property("Columns", Value::Int(20));
        }
        render_or_placeholder(site_name, copy.as_mut())
    }
}

#[derive(Debug)]
pub struct DesignerRegistry {
    by_type: HashMap<String, Arc<dyn ControlDesigner>>,
    fallback: Arc<dyn ControlDesigner>,
}

impl Default for DesignerRegistry {
    fn default() -> Self {
        Self {
            by_type: HashMap::new(),
            fallback: Arc::new(BaseDesigner),
        }
    }
}

impl DesignerRegistry {
    /// Designers for the built-in controls
    pub fn standard() -> Self {
        let mut registry = Self::default();
        registry.register("Button", Arc::new(ButtonDesigner));
        registry.register("Label", Arc::new(LabelDesigner));
        registry.register("TextBox", Arc::new(TextBoxDesigner));
        registry
    }

    pub fn register(&mut self, type_name: &str, designer: Arc<dyn ControlDesigner>) {
        self.by_type.insert(type_name.to_ascii_lowercase(), designer);
    }

    pub fn designer_for(&self, type_name: &str) -> Arc<dyn ControlDesigner> {
        self.by_type
            .get(&type_name.to_ascii_lowercase())
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }
}
