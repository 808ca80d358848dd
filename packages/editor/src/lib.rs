//! # Formsmith Editor
//!
//! Design-time core for web-forms pages: keeps a tree of live components and
//! the page markup in agreement, in both directions.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ parser: markup text → node tree + regions   │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: Document + DesignerHost             │
//! │  - Scan tags into components                │
//! │  - Write property edits back as attributes  │
//! │  - Transactions, selection, undo/redo       │
//! │  - Owner-thread text mutation               │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ design-time HTML for the design surface     │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Markup is source of truth**: components are rebuilt from tags, and
//!    every component edit is written straight back to the text
//! 2. **Minimal edits**: only the touched attribute or tag changes, so
//!    untouched markup round-trips byte for byte
//! 3. **One writer**: the thread that loads a document owns its text; other
//!    threads marshal edits onto it
//!
//! ## Usage
//!
//! ```rust,ignore
//! use formsmith_editor::{DesignerHost, Value};
//!
//! let mut host = DesignerHost::default();
//! host.load_file("Default.aspx".as_ref())?;
//! host.activate()?;
//!
//! let name = host.create_component("Button", None)?;
//! host.set_component_property(&name, "Text", Value::from("Send"))?;
//!
//! let html = host.serialize_document()?;
//! println!("{}", html.html);
//! ```

mod component;
mod container;
mod controls;
mod design_html;
mod designer;
mod directives;
mod document;
mod errors;
mod events;
mod host;
mod messages;
mod options;
mod selection;
pub mod tag_serializer;
mod text_buffer;
mod transaction;
mod undo_tracker;

pub use component::{
    BoolConverter, Component, ComponentFactory, ComponentKind, ControlRegistry, EnumConverter,
    EventDescriptor, Initializable, IntConverter, PreRenderable, PropertyBag, PropertyDescriptor,
    StringConverter, TypeConverter, TypeDescriptor, Value,
};
pub use container::{is_valid_name, DesignContainer};
pub use controls::{escape_attribute, escape_text, page_descriptor, standard_registry, ASP_PREFIX};
pub use design_html::{
    DesignTimeHtml, COMPONENT_MARKER_CLASS, INIT_VALUES_ID, SELECTABLE_ITEMS_ID, SELECTED_ITEMS_ID,
};
pub use designer::{placeholder_html, ControlDesigner, DesignerRegistry};
pub use directives::DirectiveRecord;
pub use document::{new_document_markup, ComponentRef, Document, ScanIssue, ScanReport};
pub use errors::{ConversionError, EditorError, EditorResult};
pub use events::HostEvent;
pub use host::{DesignerHost, HostPhase};
pub use messages::{parse_message, ContextMenuArgs, DesignerMessage, SelectionChangedArgs};
pub use options::{designer_context, DesignerOptions, DEFAULT_MAX_SCAN_PASSES};
pub use selection::SelectionService;
pub use text_buffer::{
    BufferEvent, MutationGate, OwnerQueue, RopeBuffer, SuppressGuard, TextBuffer, TextBufferAdapter,
};
pub use transaction::DesignerTransaction;
pub use undo_tracker::UndoTracker;

// Re-export parser types that appear in the public API
pub use formsmith_parser::{Diagnostic, Region, Severity, TextLocation};
