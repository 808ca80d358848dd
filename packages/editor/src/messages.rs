//! # Designer Messages
//!
//! The design surface talks back through a JSON side channel:
//!
//! ```text
//! {"MsgName": "selection_changed", "Arguments": "{\"SelectedIds\": [\"Button1\"], \"PrimarySelection\": 0}"}
//! ```
//!
//! `Arguments` is normally a JSON document encoded as a string; a plain
//! object is accepted as well. Anything that is not a JSON object, fails to
//! decode or names an unknown message is ignored.

use serde::de::DeserializeOwned;
use serde::Deserialize;

pub const SELECTION_CHANGED: &str = "selection_changed";
pub const CONTEXT_MENU_REQUEST: &str = "context_menu_request";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Envelope {
    msg_name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SelectionChangedArgs {
    #[serde(default)]
    pub selected_ids: Vec<String>,
    #[serde(default)]
    pub primary_selection: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContextMenuArgs {
    pub x: i64,
    pub y: i64,
    #[serde(default)]
    pub component_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DesignerMessage {
    SelectionChanged(SelectionChangedArgs),
    ContextMenuRequest(ContextMenuArgs),
}

fn arguments<T: DeserializeOwned>(value: serde_json::Value) -> Option<T> {
    let decoded = match value {
        serde_json::Value::String(text) => serde_json::from_str(&text),
        other => serde_json::from_value(other),
    };
    decoded
        .map_err(|e| tracing::debug!("bad designer message arguments: {}", e))
        .ok()
}

/// Decode a raw message; `None` for anything that is not a known message
pub fn parse_message(raw: &str) -> Option<DesignerMessage> {
    let raw = raw.trim();
    // the surface also reports plain status text on this channel
    if !raw.starts_with('{') {
        return None;
    }
    let envelope: Envelope = serde_json::from_str(raw)
        .map_err(|e| tracing::debug!("malformed designer message: {}", e))
        .ok()?;

    if envelope.msg_name.eq_ignore_ascii_case(SELECTION_CHANGED) {
        arguments(envelope.arguments).map(DesignerMessage::SelectionChanged)
    } else if envelope.msg_name.eq_ignore_ascii_case(CONTEXT_MENU_REQUEST) {
        arguments(envelope.arguments).map(DesignerMessage::ContextMenuRequest)
    } else {
        tracing::debug!("ignoring designer message '{}'", envelope.msg_name);
        None
    }
}
