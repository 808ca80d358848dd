//! # Directive Table
//!
//! Tracks the `<%@ Name key="value" %>` directives of a document.
//!
//! Every directive gets a placeholder key, unique for the lifetime of the
//! table, so it can be pulled back out by key when a placeholder is
//! serialized. A document holds at most one `Page` and at most one `Control`
//! directive.

use crate::controls::escape_attribute;
use crate::errors::{EditorError, EditorResult};
use formsmith_parser::Directive;
use std::fmt;

const UNIQUE_DIRECTIVES: &[&str] = &["Page", "Control"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveRecord {
    pub name: String,
    /// Attributes in markup order
    pub properties: Vec<(String, String)>,
    pub key: usize,
}

impl DirectiveRecord {
    /// Case-insensitive property lookup
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

impl fmt::Display for DirectiveRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<%@ {}", self.name)?;
        for (key, value) in &self.properties {
            write!(f, " {}=\"{}\"", key, escape_attribute(value))?;
        }
        f.write_str(" %>")
    }
}

/// Placeholder markup standing in for a directive
pub fn placeholder(key: usize) -> String {
    format!("<directiveplaceholder id=\"{}\" />", key)
}

#[derive(Debug, Default)]
pub struct DirectiveTable {
    records: Vec<DirectiveRecord>,
    next_key: usize,
}

impl DirectiveTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Register a directive and return its placeholder markup
    pub fn add(&mut self, name: &str, properties: Vec<(String, String)>) -> EditorResult<String> {
        if let Some(unique) = UNIQUE_DIRECTIVES
            .iter()
            .find(|unique| unique.eq_ignore_ascii_case(name))
        {
            if self.first(unique).is_some() {
                return Err(EditorError::DuplicateDirective(unique.to_string()));
            }
        }

        let key = self.next_key;
        self.next_key += 1;
        self.records.push(DirectiveRecord {
            name: name.to_string(),
            properties,
            key,
        });
        Ok(placeholder(key))
    }

    /// Register a parsed directive
    pub fn add_parsed(&mut self, directive: &Directive) -> EditorResult<String> {
        let properties = directive
            .attributes
            .iter()
            .map(|attr| (attr.name.full_name(), attr.value.clone()))
            .collect();
        self.add(&directive.name, properties)
    }

    /// Remove a directive by placeholder key, returning its markup
    pub fn remove(&mut self, key: usize) -> EditorResult<String> {
        let index = self
            .records
            .iter()
            .position(|record| record.key == key)
            .ok_or(EditorError::UnknownDirective(key))?;
        Ok(self.records.remove(index).to_string())
    }

    pub fn first(&self, name: &str) -> Option<&DirectiveRecord> {
        self.records
            .iter()
            .find(|record| record.name.eq_ignore_ascii_case(name))
    }

    /// First directive of a type, adding an empty one when missing
    pub fn first_or_create(&mut self, name: &str) -> EditorResult<&DirectiveRecord> {
        if self.first(name).is_none() {
            self.add(name, Vec::new())?;
        }
        self.first(name)
            .ok_or_else(|| EditorError::DuplicateDirective(name.to_string()))
    }

    pub fn all(&self, name: &str) -> Vec<&DirectiveRecord> {
        self.records
            .iter()
            .filter(|record| record.name.eq_ignore_ascii_case(name))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DirectiveRecord> {
        self.records.iter()
    }

    /// Drop every record. Keys keep counting up.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_second_page_directive_fails() {
        let mut table = DirectiveTable::new();
        table.add("Page", props(&[("Language", "C#")])).unwrap();
        assert_eq!(
            table.add("page", Vec::new()),
            Err(EditorError::DuplicateDirective("Page".to_string()))
        );
        // other directive types may repeat
        table.add("Register", Vec::new()).unwrap();
        table.add("Register", Vec::new()).unwrap();
        assert_eq!(table.all("register").len(), 2);
    }

    #[test]
    fn test_placeholder_keys_increase() {
        let mut table = DirectiveTable::new();
        assert_eq!(
            table.add("Import", Vec::new()).unwrap(),
            "<directiveplaceholder id=\"0\" />"
        );
        assert_eq!(
            table.add("Import", Vec::new()).unwrap(),
            "<directiveplaceholder id=\"1\" />"
        );
        table.clear();
        assert_eq!(
            table.add("Import", Vec::new()).unwrap(),
            "<directiveplaceholder id=\"2\" />"
        );
    }

    #[test]
    fn test_remove_by_key_returns_markup() {
        let mut table = DirectiveTable::new();
        table
            .add("Page", props(&[("Language", "C#"), ("AutoEventWireup", "true")]))
            .unwrap();
        assert_eq!(
            table.remove(0).unwrap(),
            "<%@ Page Language=\"C#\" AutoEventWireup=\"true\" %>"
        );
        assert_eq!(table.remove(0), Err(EditorError::UnknownDirective(0)));
        // the page slot is free again
        assert!(table.add("Page", Vec::new()).is_ok());
    }

    #[test]
    fn test_first_or_create() {
        let mut table = DirectiveTable::new();
        let record = table.first_or_create("Control").unwrap();
        assert_eq!(record.name, "Control");
        assert_eq!(table.len(), 1);
        table.first_or_create("CONTROL").unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let mut table = DirectiveTable::new();
        table.add("Page", props(&[("Title", "Home")])).unwrap();
        let page = table.first("PAGE").unwrap();
        assert_eq!(page.property("title"), Some("Home"));
    }
}
