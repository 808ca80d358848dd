//! Selection service shared by the designer host and the design surface

use crate::text_buffer::lock;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct SelectionState {
    selected: Vec<String>,
    primary: Option<String>,
}

/// Currently selected site names. Clones share state.
///
/// Callers never get a live view: reads return copies, writes replace the
/// whole selection.
#[derive(Debug, Clone, Default)]
pub struct SelectionService {
    state: Arc<Mutex<SelectionState>>,
}

impl SelectionService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the selection. The primary selection is the first name.
    pub fn set_selected_components(&self, names: &[String]) {
        self.set_selected_with_primary(names, 0);
    }

    /// Replace the selection with an explicit primary index (clamped)
    pub fn set_selected_with_primary(&self, names: &[String], primary: usize) {
        let mut state = lock(&self.state);
        let mut selected: Vec<String> = Vec::with_capacity(names.len());
        for name in names {
            if !selected.iter().any(|s| s.eq_ignore_ascii_case(name)) {
                selected.push(name.clone());
            }
        }
        state.primary = selected
            .get(primary.min(selected.len().saturating_sub(1)))
            .cloned();
        state.selected = selected;
    }

    pub fn get_selected_components(&self) -> Vec<String> {
        lock(&self.state).selected.clone()
    }

    pub fn primary_selection(&self) -> Option<String> {
        lock(&self.state).primary.clone()
    }

    pub fn is_selected(&self, name: &str) -> bool {
        lock(&self.state)
            .selected
            .iter()
            .any(|selected| selected.eq_ignore_ascii_case(name))
    }

    pub fn selection_count(&self) -> usize {
        lock(&self.state).selected.len()
    }

    /// Keep the selection pointing at a renamed component
    pub fn rename(&self, old_name: &str, new_name: &str) {
        let mut state = lock(&self.state);
        for selected in state.selected.iter_mut() {
            if selected.eq_ignore_ascii_case(old_name) {
                *selected = new_name.to_string();
            }
        }
        if let Some(primary) = state.primary.as_mut() {
            if primary.eq_ignore_ascii_case(old_name) {
                *primary = new_name.to_string();
            }
        }
    }

    pub fn clear(&self) {
        let mut state = lock(&self.state);
        state.selected.clear();
        state.primary = None;
    }
}
