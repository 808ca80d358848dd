//! Notifications broadcast by the designer host

use crate::component::Value;
use crate::design_html::DesignTimeHtml;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    TransactionOpening { description: String },
    TransactionOpened { description: String },
    TransactionClosing { description: String, commit: bool },
    TransactionClosed { description: String, commit: bool },

    LoadComplete { components: usize, issues: usize },
    Activated,
    Deactivated,

    ComponentAdded { name: String, type_name: &'static str },
    ComponentRemoved { name: String },
    ComponentRenamed { old_name: String, new_name: String },
    /// A property changed through the host; carries both values
    ComponentChanged {
        name: String,
        property: String,
        old: Option<Value>,
        new: Value,
    },

    /// Fresh design-time HTML for the surface
    DocumentChanged { html: Arc<DesignTimeHtml> },
    SelectionChanged {
        selected: Vec<String>,
        primary: Option<String>,
    },
    ContextMenuRequested {
        x: i64,
        y: i64,
        component: Option<String>,
    },
}
