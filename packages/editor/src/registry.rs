//! # Type Registry
//!
//! The registry is the sole source of legal component type names. Each type
//! is described by a [`ComponentShape`]: its proxy bindings, default name,
//! name formatting rule and duplication filter. Documents receive the
//! registry explicitly at construction.
//!
//! Shapes are registered in code or loaded from a JSON registry file:
//!
//! ```json
//! {
//!   "types": [
//!     {
//!       "typeName": "Lamp",
//!       "proxies": [
//!         { "name": "intensity", "kind": "float", "via": "field", "field": "intensity" }
//!       ]
//!     }
//!   ]
//! }
//! ```

use crate::errors::RegistryError;
use crate::item::{ComponentItem, BUILTIN_PROPERTIES, GROUP_TYPE};
use crate::proxy::{Accessor, Proxy};
use crate::value::{Value, ValueKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Declaration of one proxy binding on a shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxySpec {
    pub name: String,
    pub kind: ValueKind,
    #[serde(flatten)]
    pub accessor: Accessor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ProxySpec {
    pub fn new(name: impl Into<String>, kind: ValueKind, accessor: Accessor, default: Option<Value>) -> Self {
        Self {
            name: name.into(),
            kind,
            accessor,
            default,
        }
    }

    pub fn field(name: impl Into<String>, kind: ValueKind, field: impl Into<String>) -> Self {
        Self::new(name, kind, Accessor::Field { field: field.into() }, None)
    }

    pub fn member(
        name: impl Into<String>,
        kind: ValueKind,
        member: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        let accessor = Accessor::Member {
            member: member.into(),
            field: field.into(),
        };
        Self::new(name, kind, accessor, None)
    }

    pub fn trait_key(name: impl Into<String>, kind: ValueKind, key: impl Into<String>) -> Self {
        Self::new(name, kind, Accessor::Trait { key: key.into() }, None)
    }

    /// Degrees on the item, rotation matrix in `field` on the instance
    pub fn orientation(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self::new(name, ValueKind::Vector, Accessor::Orientation { field: field.into() }, None)
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Declared default coerced to the proxy kind, or the kind's default
    pub fn initial_value(&self) -> Value {
        self.default
            .clone()
            .and_then(|value| value.coerce(self.kind))
            .unwrap_or_else(|| self.kind.default_value())
    }

    pub fn build(&self) -> Proxy {
        Proxy::new(self.name.clone(), self.kind, self.accessor.clone(), self.initial_value())
    }
}

/// How a shape normalizes names assigned to its items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NameFormat {
    #[default]
    Verbatim,
    /// A name equal to the default name gets the short item id appended
    QualifyDefault,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentShape {
    pub type_name: String,
    #[serde(default)]
    pub script_class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_name: Option<String>,
    #[serde(default)]
    pub name_format: NameFormat,
    #[serde(default)]
    pub proxies: Vec<ProxySpec>,
    /// Properties left out of `duplicate` and `impersonate`
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub duplicate_filter: BTreeSet<String>,
}

impl ComponentShape {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            script_class: String::new(),
            default_name: None,
            name_format: NameFormat::Verbatim,
            proxies: Vec::new(),
            duplicate_filter: BTreeSet::new(),
        }
    }

    pub fn with_proxy(mut self, proxy: ProxySpec) -> Self {
        self.proxies.push(proxy);
        self
    }

    pub fn with_default_name(mut self, name: impl Into<String>) -> Self {
        self.default_name = Some(name.into());
        self
    }

    pub fn with_name_format(mut self, format: NameFormat) -> Self {
        self.name_format = format;
        self
    }

    pub fn with_script_class(mut self, script_class: impl Into<String>) -> Self {
        self.script_class = script_class.into();
        self
    }

    pub fn filtering(mut self, property: impl Into<String>) -> Self {
        self.duplicate_filter.insert(property.into());
        self
    }

    /// Name given to new items of this shape
    pub fn default_name(&self) -> &str {
        self.default_name.as_deref().unwrap_or(&self.type_name)
    }

    pub fn proxy(&self, name: &str) -> Option<&ProxySpec> {
        self.proxies.iter().find(|p| p.name == name)
    }

    pub fn filters(&self, property: &str) -> bool {
        self.duplicate_filter.contains(property)
    }

    fn validate(&self) -> Result<(), RegistryError> {
        if self.type_name.is_empty() {
            return Err(RegistryError::EmptyTypeName);
        }
        if self.type_name == GROUP_TYPE {
            return Err(RegistryError::ReservedType(self.type_name.clone()));
        }
        let mut seen = HashSet::new();
        for proxy in &self.proxies {
            if BUILTIN_PROPERTIES.contains(&proxy.name.as_str()) {
                return Err(RegistryError::ReservedProperty {
                    type_name: self.type_name.clone(),
                    property: proxy.name.clone(),
                });
            }
            if !seen.insert(proxy.name.as_str()) {
                return Err(RegistryError::DuplicateProperty {
                    type_name: self.type_name.clone(),
                    property: proxy.name.clone(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct RegistryFile {
    types: Vec<ComponentShape>,
}

#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    shapes: BTreeMap<String, Arc<ComponentShape>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the shapes that ship with the editor
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for shape in builtin_shapes() {
            let type_name = shape.type_name.clone();
            if let Err(err) = registry.register(shape) {
                warn!(type_name = %type_name, error = %err, "Skipping built-in type");
            }
        }
        registry
    }

    pub fn register(&mut self, shape: ComponentShape) -> Result<(), RegistryError> {
        shape.validate()?;
        if self.shapes.contains_key(&shape.type_name) {
            return Err(RegistryError::DuplicateType(shape.type_name));
        }
        debug!(type_name = %shape.type_name, proxies = shape.proxies.len(), "Registered component type");
        self.shapes.insert(shape.type_name.clone(), Arc::new(shape));
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let file: RegistryFile = serde_json::from_str(json)?;
        let mut registry = Self::new();
        for shape in file.types {
            registry.register(shape)?;
        }
        Ok(registry)
    }

    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String, RegistryError> {
        let file = RegistryFile {
            types: self.shapes.values().map(|s| ComponentShape::clone(s)).collect(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    pub fn get(&self, type_name: &str) -> Option<&Arc<ComponentShape>> {
        self.shapes.get(type_name)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.shapes.contains_key(type_name)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.shapes.keys().map(String::as_str)
    }

    pub fn shapes(&self) -> impl Iterator<Item = &Arc<ComponentShape>> {
        self.shapes.values()
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Fresh, unbound component item of `type_name`
    pub fn create_item(&self, type_name: &str) -> Option<ComponentItem> {
        self.shapes.get(type_name).map(|shape| ComponentItem::new(Arc::clone(shape)))
    }
}

fn builtin_shapes() -> Vec<ComponentShape> {
    vec![
        ComponentShape::new("Widget")
            .with_proxy(ProxySpec::field("label", ValueKind::Text, "label"))
            .with_proxy(ProxySpec::field("position", ValueKind::Vector, "position"))
            .with_proxy(ProxySpec::trait_key("visible", ValueKind::Bool, "visible").with_default(true)),
        ComponentShape::new("Light")
            .with_name_format(NameFormat::QualifyDefault)
            .with_proxy(ProxySpec::field("position", ValueKind::Vector, "position"))
            .with_proxy(ProxySpec::field("intensity", ValueKind::Float, "intensity").with_default(1.0))
            .with_proxy(ProxySpec::member("color", ValueKind::Vector, "light", "color").with_default([1.0, 1.0, 1.0]))
            .with_proxy(ProxySpec::trait_key("cast_shadows", ValueKind::Bool, "shadows")),
        ComponentShape::new("Camera")
            .with_proxy(ProxySpec::field("position", ValueKind::Vector, "position"))
            .with_proxy(ProxySpec::orientation("rotation", "transform"))
            .with_proxy(ProxySpec::field("fov", ValueKind::Float, "fov").with_default(60.0))
            .with_proxy(ProxySpec::field("primary", ValueKind::Bool, "primary"))
            .filtering("primary"),
        ComponentShape::new("Scene")
            .with_default_name("Scene Root")
            .with_proxy(ProxySpec::field("ambient", ValueKind::Vector, "ambient").with_default([0.2, 0.2, 0.2])),
    ]
}
