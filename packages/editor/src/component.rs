//! # Component Model
//!
//! Typed, reflectable components that stand behind server-control tags.
//!
//! ## Design
//!
//! - Each control type publishes a [`TypeDescriptor`]: its tag, its
//!   properties (type, default, string converter) and its events
//! - Descriptors are built once into a [`ControlRegistry`] at startup and
//!   shared through `Arc`; there is no runtime reflection
//! - Property values live in a [`PropertyBag`]; unset properties read as
//!   their declared default
//! - Lifecycle hooks are opt-in capabilities ([`Initializable`],
//!   [`PreRenderable`])

use crate::errors::{ConversionError, EditorError, EditorResult};
use formsmith_parser::Element;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Typed property value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Str(String),
    Int(i64),
    Bool(bool),
    /// Canonical variant name of an enumeration
    Enum(String),
}

impl Value {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Int(_) => "integer",
            Value::Bool(_) => "boolean",
            Value::Enum(_) => "enumeration",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) | Value::Enum(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) | Value::Enum(s) => f.write_str(s),
            Value::Int(i) => write!(f, "{}", i),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
        }
    }
}

/// Converts property values to and from their markup form
pub trait TypeConverter: Send + Sync {
    fn from_markup(&self, text: &str) -> Result<Value, ConversionError>;

    fn to_markup(&self, value: &Value) -> Result<String, ConversionError>;

    /// Kind of value this converter produces
    fn value_kind(&self) -> &'static str;
}

pub struct StringConverter;

impl TypeConverter for StringConverter {
    fn from_markup(&self, text: &str) -> Result<Value, ConversionError> {
        Ok(Value::Str(text.to_string()))
    }

    fn to_markup(&self, value: &Value) -> Result<String, ConversionError> {
        match value {
            Value::Str(s) => Ok(s.clone()),
            other => Err(mismatch("string", other)),
        }
    }

    fn value_kind(&self) -> &'static str {
        "string"
    }
}

pub struct IntConverter;

impl TypeConverter for IntConverter {
    fn from_markup(&self, text: &str) -> Result<Value, ConversionError> {
        text.trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| ConversionError::InvalidValue {
                kind: "integer",
                value: text.to_string(),
            })
    }

    fn to_markup(&self, value: &Value) -> Result<String, ConversionError> {
        match value {
            Value::Int(i) => Ok(i.to_string()),
            other => Err(mismatch("integer", other)),
        }
    }

    fn value_kind(&self) -> &'static str {
        "integer"
    }
}

/// Markup spelling is `True`/`False`; parsing is case-insensitive
pub struct BoolConverter;

impl TypeConverter for BoolConverter {
    fn from_markup(&self, text: &str) -> Result<Value, ConversionError> {
        let text = text.trim();
        if text.eq_ignore_ascii_case("true") {
            Ok(Value::Bool(true))
        } else if text.eq_ignore_ascii_case("false") {
            Ok(Value::Bool(false))
        } else {
            Err(ConversionError::InvalidValue {
                kind: "boolean",
                value: text.to_string(),
            })
        }
    }

    fn to_markup(&self, value: &Value) -> Result<String, ConversionError> {
        match value {
            Value::Bool(_) => Ok(value.to_string()),
            other => Err(mismatch("boolean", other)),
        }
    }

    fn value_kind(&self) -> &'static str {
        "boolean"
    }
}

pub struct EnumConverter {
    pub variants: &'static [&'static str],
}

impl TypeConverter for EnumConverter {
    fn from_markup(&self, text: &str) -> Result<Value, ConversionError> {
        self.variants
            .iter()
            .find(|variant| variant.eq_ignore_ascii_case(text.trim()))
            .map(|variant| Value::Enum(variant.to_string()))
            .ok_or_else(|| ConversionError::InvalidValue {
                kind: "enumeration",
                value: text.to_string(),
            })
    }

    fn to_markup(&self, value: &Value) -> Result<String, ConversionError> {
        match value {
            Value::Enum(name) if self.variants.contains(&name.as_str()) => Ok(name.clone()),
            Value::Enum(name) => Err(ConversionError::InvalidValue {
                kind: "enumeration",
                value: name.clone(),
            }),
            other => Err(mismatch("enumeration", other)),
        }
    }

    fn value_kind(&self) -> &'static str {
        "enumeration"
    }
}

fn mismatch(expected: &'static str, found: &Value) -> ConversionError {
    ConversionError::TypeMismatch {
        expected,
        found: found.kind_name(),
    }
}

/// A browsable property of a control type
#[derive(Clone)]
pub struct PropertyDescriptor {
    pub name: &'static str,
    pub default: Option<Value>,
    pub converter: Option<Arc<dyn TypeConverter>>,
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("name", &self.name)
            .field("default", &self.default)
            .field("has_converter", &self.converter.is_some())
            .finish()
    }
}

impl PropertyDescriptor {
    pub fn string(name: &'static str, default: &str) -> Self {
        Self {
            name,
            default: Some(Value::Str(default.to_string())),
            converter: Some(Arc::new(StringConverter)),
        }
    }

    pub fn int(name: &'static str, default: i64) -> Self {
        Self {
            name,
            default: Some(Value::Int(default)),
            converter: Some(Arc::new(IntConverter)),
        }
    }

    pub fn bool(name: &'static str, default: bool) -> Self {
        Self {
            name,
            default: Some(Value::Bool(default)),
            converter: Some(Arc::new(BoolConverter)),
        }
    }

    pub fn enumeration(
        name: &'static str,
        variants: &'static [&'static str],
        default: &'static str,
    ) -> Self {
        Self {
            name,
            default: Some(Value::Enum(default.to_string())),
            converter: Some(Arc::new(EnumConverter { variants })),
        }
    }

    /// Declared default, compared by strict typed equality
    pub fn is_default(&self, value: &Value) -> bool {
        self.default.as_ref() == Some(value)
    }

    pub fn convert_from(&self, text: &str) -> Result<Value, ConversionError> {
        self.converter
            .as_ref()
            .ok_or_else(|| ConversionError::NoConverter(self.name.to_string()))?
            .from_markup(text)
    }

    pub fn convert_to(&self, value: &Value) -> Result<String, ConversionError> {
        self.converter
            .as_ref()
            .ok_or_else(|| ConversionError::NoConverter(self.name.to_string()))?
            .to_markup(value)
    }

    fn check_kind(&self, value: &Value) -> Result<(), ConversionError> {
        let expected = match (&self.converter, &self.default) {
            (Some(converter), _) => converter.value_kind(),
            (None, Some(default)) => default.kind_name(),
            (None, None) => return Ok(()),
        };
        if expected == value.kind_name() {
            Ok(())
        } else {
            Err(mismatch(expected, value))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDescriptor {
    pub name: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    /// Root of the design surface; never created through `create_component`
    Page,
    Control,
}

pub type ComponentFactory = fn(Arc<TypeDescriptor>) -> Box<dyn Component>;

/// Everything the designer knows about one control type
pub struct TypeDescriptor {
    pub type_name: &'static str,
    /// `asp` in `<asp:Button>`; `None` for HTML server controls
    pub tag_prefix: Option<&'static str>,
    pub tag_name: &'static str,
    pub kind: ComponentKind,
    pub properties: Vec<PropertyDescriptor>,
    pub events: Vec<EventDescriptor>,
    pub factory: ComponentFactory,
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("type_name", &self.type_name)
            .field("tag", &self.tag())
            .field("kind", &self.kind)
            .finish()
    }
}

impl TypeDescriptor {
    /// Markup tag name, `asp:Button` or `form`
    pub fn tag(&self) -> String {
        match self.tag_prefix {
            Some(prefix) => format!("{}:{}", prefix, self.tag_name),
            None => self.tag_name.to_string(),
        }
    }

    /// Case-insensitive property lookup
    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties
            .iter()
            .find(|property| property.name.eq_ignore_ascii_case(name))
    }

    pub fn event(&self, name: &str) -> Option<&EventDescriptor> {
        self.events
            .iter()
            .find(|event| event.name.eq_ignore_ascii_case(name))
    }

    pub fn instantiate(self: &Arc<Self>) -> Box<dyn Component> {
        (self.factory)(self.clone())
    }
}

/// Property and event-binding values of one component
#[derive(Debug, Clone)]
pub struct PropertyBag {
    descriptor: Arc<TypeDescriptor>,
    values: BTreeMap<&'static str, Value>,
    events: BTreeMap<&'static str, String>,
}

impl PropertyBag {
    pub fn new(descriptor: Arc<TypeDescriptor>) -> Self {
        Self {
            descriptor,
            values: BTreeMap::new(),
            events: BTreeMap::new(),
        }
    }

    pub fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.descriptor
    }

    /// Current value, falling back to the declared default
    pub fn get(&self, name: &str) -> Option<Value> {
        let property = self.descriptor.property(name)?;
        self.values
            .get(property.name)
            .cloned()
            .or_else(|| property.default.clone())
    }

    /// String value or empty
    pub fn get_str(&self, name: &str) -> String {
        self.get(name)
            .and_then(|value| value.as_str().map(str::to_string))
            .unwrap_or_default()
    }

    pub fn get_bool(&self, name: &str) -> bool {
        self.get(name).and_then(|value| value.as_bool()).unwrap_or(false)
    }

    pub fn get_int(&self, name: &str) -> i64 {
        self.get(name).and_then(|value| value.as_int()).unwrap_or(0)
    }

    /// Set a property, returning the previous value
    pub fn set(&mut self, name: &str, value: Value) -> EditorResult<Option<Value>> {
        let property = self.lookup(name)?;
        property.check_kind(&value)?;
        let key = property.name;
        let old = self.get(key);
        self.values.insert(key, value);
        Ok(old)
    }

    /// Drop an explicit value so the property reads as its default
    pub fn reset(&mut self, name: &str) -> EditorResult<Option<Value>> {
        let key = self.lookup(name)?.name;
        let old = self.get(key);
        self.values.remove(key);
        Ok(old)
    }

    pub fn is_default(&self, name: &str) -> bool {
        match (self.descriptor.property(name), self.get(name)) {
            (Some(property), Some(value)) => property.is_default(&value),
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    pub fn bind_event(&mut self, event: &str, handler: &str) -> EditorResult<()> {
        let key = self
            .descriptor
            .event(event)
            .ok_or_else(|| EditorError::PropertyNotFound {
                component: self.descriptor.type_name.to_string(),
                property: format!("On{}", event),
            })?
            .name;
        self.events.insert(key, handler.to_string());
        Ok(())
    }

    pub fn unbind_event(&mut self, event: &str) {
        if let Some(descriptor) = self.descriptor.event(event) {
            let key = descriptor.name;
            self.events.remove(key);
        }
    }

    pub fn event_handler(&self, event: &str) -> Option<&str> {
        let descriptor = self.descriptor.event(event)?;
        self.events.get(descriptor.name).map(String::as_str)
    }

    fn lookup(&self, name: &str) -> EditorResult<&PropertyDescriptor> {
        self.descriptor
            .property(name)
            .ok_or_else(|| EditorError::PropertyNotFound {
                component: self.descriptor.type_name.to_string(),
                property: name.to_string(),
            })
    }
}

/// Hook run once when a control is added from the design surface
pub trait Initializable {
    fn initialize(&mut self, site_name: &str);
}

/// Hook run before each design-time render
pub trait PreRenderable {
    fn pre_render(&mut self);
}

/// A live component on the design surface
pub trait Component: Send + fmt::Debug {
    fn properties(&self) -> &PropertyBag;

    fn properties_mut(&mut self) -> &mut PropertyBag;

    /// Standard control rendering
    fn render(&self, site_name: &str) -> String;

    /// Controls that wrap markup children render around the already
    /// serialized `inner` content instead of through [`Component::render`]
    fn render_container(&self, _site_name: &str, _inner: &str) -> Option<String> {
        None
    }

    /// Sync state that comes from the tag itself rather than properties
    fn bind_element(&mut self, _element: &Element) {}

    /// Site names of child controls (only the page has any)
    fn child_controls(&self) -> &[String] {
        &[]
    }

    fn child_controls_mut(&mut self) -> Option<&mut Vec<String>> {
        None
    }

    fn as_initializable(&mut self) -> Option<&mut dyn Initializable> {
        None
    }

    fn as_pre_renderable(&mut self) -> Option<&mut dyn PreRenderable> {
        None
    }

    fn dispose(&mut self) {}

    fn descriptor(&self) -> &Arc<TypeDescriptor> {
        self.properties().descriptor()
    }

    fn type_name(&self) -> &'static str {
        self.descriptor().type_name
    }

    fn get_property(&self, name: &str) -> Option<Value> {
        self.properties().get(name)
    }

    fn set_property(&mut self, name: &str, value: Value) -> EditorResult<Option<Value>> {
        self.properties_mut().set(name, value)
    }
}

/// Tag → control type table, built once at startup
#[derive(Debug, Default)]
pub struct ControlRegistry {
    by_tag: HashMap<String, Arc<TypeDescriptor>>,
    by_type: HashMap<String, Arc<TypeDescriptor>>,
    /// Used for `runat="server"` tags with no dedicated type
    html_fallback: Option<Arc<TypeDescriptor>>,
}

impl ControlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: TypeDescriptor) -> Arc<TypeDescriptor> {
        let descriptor = Arc::new(descriptor);
        self.by_tag
            .insert(descriptor.tag().to_ascii_lowercase(), descriptor.clone());
        self.by_type.insert(
            descriptor.type_name.to_ascii_lowercase(),
            descriptor.clone(),
        );
        descriptor
    }

    pub fn set_html_fallback(&mut self, descriptor: TypeDescriptor) {
        let descriptor = Arc::new(descriptor);
        self.by_type.insert(
            descriptor.type_name.to_ascii_lowercase(),
            descriptor.clone(),
        );
        self.html_fallback = Some(descriptor);
    }

    pub fn by_type_name(&self, type_name: &str) -> Option<Arc<TypeDescriptor>> {
        self.by_type.get(&type_name.to_ascii_lowercase()).cloned()
    }

    /// Resolve the control type for a server-control tag
    pub fn resolve(&self, element: &Element) -> Option<Arc<TypeDescriptor>> {
        let tag = element.name.full_name().to_ascii_lowercase();
        if let Some(descriptor) = self
            .by_tag
            .get(&tag)
            .filter(|descriptor| descriptor.kind == ComponentKind::Control)
        {
            return Some(descriptor.clone());
        }
        if element.name.has_prefix() {
            return None;
        }
        self.html_fallback.clone()
    }

    pub fn type_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.by_type.values().map(|d| d.type_name).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Gadget {
        properties: PropertyBag,
    }

    impl Component for Gadget {
        fn properties(&self) -> &PropertyBag {
            &self.properties
        }

        fn properties_mut(&mut self) -> &mut PropertyBag {
            &mut self.properties
        }

        fn render(&self, site_name: &str) -> String {
            format!("<i id=\"{}\"></i>", site_name)
        }
    }

    fn gadget_descriptor() -> Arc<TypeDescriptor> {
        Arc::new(TypeDescriptor {
            type_name: "Gadget",
            tag_prefix: Some("test"),
            tag_name: "Gadget",
            kind: ComponentKind::Control,
            properties: vec![
                PropertyDescriptor::string("Text", ""),
                PropertyDescriptor::int("Count", 0),
                PropertyDescriptor::bool("Enabled", true),
                PropertyDescriptor::enumeration("Mode", &["Fast", "Slow"], "Fast"),
                PropertyDescriptor {
                    name: "Font",
                    default: None,
                    converter: None,
                },
            ],
            events: vec![EventDescriptor { name: "Click" }],
            factory: |descriptor| {
                Box::new(Gadget {
                    properties: PropertyBag::new(descriptor),
                })
            },
        })
    }

    #[test]
    fn test_converters() {
        assert_eq!(BoolConverter.from_markup("TRUE"), Ok(Value::Bool(true)));
        assert_eq!(BoolConverter.to_markup(&Value::Bool(false)), Ok("False".to_string()));
        assert!(IntConverter.from_markup("12px").is_err());

        let modes = EnumConverter {
            variants: &["SingleLine", "MultiLine"],
        };
        assert_eq!(
            modes.from_markup("multiline"),
            Ok(Value::Enum("MultiLine".to_string()))
        );
        assert!(modes.to_markup(&Value::Enum("Other".to_string())).is_err());
    }

    #[test]
    fn test_property_bag_defaults_and_reset() {
        let mut component = gadget_descriptor().instantiate();
        assert_eq!(component.get_property("count"), Some(Value::Int(0)));
        assert!(component.properties().is_default("Enabled"));

        let old = component
            .set_property("enabled", Value::Bool(false))
            .unwrap();
        assert_eq!(old, Some(Value::Bool(true)));
        assert!(!component.properties().is_default("Enabled"));

        component.properties_mut().reset("ENABLED").unwrap();
        assert_eq!(component.get_property("Enabled"), Some(Value::Bool(true)));
    }

    #[test]
    fn test_set_rejects_wrong_kind() {
        let mut component = gadget_descriptor().instantiate();
        let result = component.set_property("Count", Value::Str("3".to_string()));
        assert!(matches!(
            result,
            Err(EditorError::Conversion(ConversionError::TypeMismatch { .. }))
        ));
        assert!(matches!(
            component.set_property("Missing", Value::Int(1)),
            Err(EditorError::PropertyNotFound { .. })
        ));
    }

    #[test]
    fn test_property_without_converter() {
        let descriptor = gadget_descriptor();
        let font = descriptor.property("font").unwrap();
        assert_eq!(
            font.convert_from("Arial"),
            Err(ConversionError::NoConverter("Font".to_string()))
        );
    }

    #[test]
    fn test_default_detection_is_strict() {
        let descriptor = gadget_descriptor();
        let count = descriptor.property("Count").unwrap();
        assert!(count.is_default(&Value::Int(0)));
        assert!(!count.is_default(&Value::Str(String::new())));
        assert!(!count.is_default(&Value::Int(-1)));
    }

    #[test]
    fn test_event_binding() {
        let mut component = gadget_descriptor().instantiate();
        component
            .properties_mut()
            .bind_event("click", "Gadget_Click")
            .unwrap();
        assert_eq!(component.properties().event_handler("Click"), Some("Gadget_Click"));
        assert!(component.properties_mut().bind_event("Hover", "x").is_err());
    }
}
