//! # Design Container
//!
//! Registry of sited components, keyed by a unique site name.
//!
//! Site names mirror the markup `id` attribute, so lookups and uniqueness
//! are case-insensitive like id lookups in the markup.

use crate::component::Component;
use crate::errors::{EditorError, EditorResult};

#[derive(Debug)]
struct Site {
    name: String,
    component: Box<dyn Component>,
}

/// Components in the order they were sited
#[derive(Debug, Default)]
pub struct DesignContainer {
    sites: Vec<Site>,
}

/// Valid site names look like identifiers
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

impl DesignContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Stored spelling of a site name
    pub fn canonical_name(&self, name: &str) -> Option<&str> {
        self.position(name).map(|index| self.sites[index].name.as_str())
    }

    /// `<TypeName><n>` with the smallest `n >= 1` not already taken
    pub fn create_name(&self, type_name: &str) -> String {
        (1..)
            .map(|n| format!("{}{}", type_name, n))
            .find(|candidate| !self.contains(candidate))
            .unwrap_or_else(|| type_name.to_string())
    }

    /// Site a component. An empty or missing name gets a generated one.
    pub fn add(&mut self, name: Option<&str>, component: Box<dyn Component>) -> EditorResult<String> {
        let name = match name.filter(|name| !name.is_empty()) {
            Some(name) => {
                if !is_valid_name(name) {
                    return Err(EditorError::InvalidName(name.to_string()));
                }
                if self.contains(name) {
                    return Err(EditorError::DuplicateName(name.to_string()));
                }
                name.to_string()
            }
            None => self.create_name(component.type_name()),
        };

        tracing::debug!("siting {} as '{}'", component.type_name(), name);
        self.sites.push(Site {
            name: name.clone(),
            component,
        });
        Ok(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Box<dyn Component>> {
        let index = self.position(name)?;
        Some(self.sites.remove(index).component)
    }

    /// Re-key a component; fails if `new_name` belongs to another component
    pub fn rename(&mut self, old_name: &str, new_name: &str) -> EditorResult<String> {
        let index = self
            .position(old_name)
            .ok_or_else(|| EditorError::ComponentNotFound(old_name.to_string()))?;
        if !is_valid_name(new_name) {
            return Err(EditorError::InvalidName(new_name.to_string()));
        }
        if let Some(existing) = self.position(new_name) {
            if existing != index {
                return Err(EditorError::DuplicateName(new_name.to_string()));
            }
        }
        let previous = std::mem::replace(&mut self.sites[index].name, new_name.to_string());
        Ok(previous)
    }

    pub fn get(&self, name: &str) -> Option<&dyn Component> {
        self.position(name)
            .map(|index| self.sites[index].component.as_ref())
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Box<dyn Component>> {
        let index = self.position(name)?;
        Some(&mut self.sites[index].component)
    }

    pub fn names(&self) -> Vec<String> {
        self.sites.iter().map(|site| site.name.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &dyn Component)> {
        self.sites
            .iter()
            .map(|site| (site.name.as_str(), site.component.as_ref()))
    }

    /// Remove every component, most recently sited first
    pub fn drain(&mut self) -> Vec<(String, Box<dyn Component>)> {
        self.sites
            .drain(..)
            .rev()
            .map(|site| (site.name, site.component))
            .collect()
    }

    pub(crate) fn index_of(&self, name: &str) -> Option<usize> {
        self.position(name)
    }

    pub(crate) fn at(&self, index: usize) -> &(dyn Component + 'static) {
        self.sites[index].component.as_ref()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.sites
            .iter()
            .position(|site| site.name.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::standard_registry;

    fn button() -> Box<dyn Component> {
        standard_registry()
            .by_type_name("Button")
            .expect("button type")
            .instantiate()
    }

    #[test]
    fn test_generated_names_fill_gaps() {
        let mut container = DesignContainer::new();
        assert_eq!(container.add(None, button()).unwrap(), "Button1");
        assert_eq!(container.add(Some(""), button()).unwrap(), "Button2");
        container.remove("button1");
        assert_eq!(container.create_name("Button"), "Button1");
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut container = DesignContainer::new();
        container.add(Some("Save"), button()).unwrap();
        assert_eq!(
            container.add(Some("SAVE"), button()),
            Err(EditorError::DuplicateName("SAVE".to_string()))
        );
        assert_eq!(container.len(), 1);
    }

    #[test]
    fn test_rename() {
        let mut container = DesignContainer::new();
        container.add(Some("A"), button()).unwrap();
        container.add(Some("B"), button()).unwrap();

        assert_eq!(
            container.rename("A", "b"),
            Err(EditorError::DuplicateName("b".to_string()))
        );
        assert_eq!(container.rename("A", "C").unwrap(), "A");
        assert!(container.contains("c"));
        assert!(!container.contains("A"));
        // case-only change of its own name is allowed
        assert!(container.rename("C", "c").is_ok());
        assert_eq!(container.canonical_name("C"), Some("c"));
        assert!(matches!(
            container.rename("Missing", "D"),
            Err(EditorError::ComponentNotFound(_))
        ));
        assert!(matches!(
            container.rename("B", "1x"),
            Err(EditorError::InvalidName(_))
        ));
    }

    #[test]
    fn test_drain_is_reverse_order() {
        let mut container = DesignContainer::new();
        container.add(Some("A"), button()).unwrap();
        container.add(Some("B"), button()).unwrap();
        let names: Vec<_> = container.drain().into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["B", "A"]);
        assert!(container.is_empty());
    }
}
