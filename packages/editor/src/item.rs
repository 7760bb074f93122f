//! # Items
//!
//! Identity-bearing nodes of the document graph. Items are a closed set:
//! [`ComponentItem`] (bound to a live instance through proxies) and
//! [`GroupItem`] (pure hierarchy node, grouped documents only).
//!
//! ## Properties
//!
//! Every item exposes its state as named [`Value`]s. The built-in
//! properties are `id` (read-only), `parent_id` (set through the document),
//! `name`, `expanded` and, on components, `script_class`. Components add
//! one property per proxy binding, in declaration order.
//!
//! `duplicate` and `impersonate` walk these descriptors instead of
//! reflecting over fields, honoring the shape's duplication filter.

use crate::errors::PropertyError;
use crate::id::ItemId;
use crate::proxy::Proxy;
use crate::registry::{ComponentShape, NameFormat};
use crate::runtime::{InstanceError, InstanceId, Runtime};
use crate::value::{Value, ValueKind};
use std::sync::Arc;
use tracing::warn;

/// Type name reported by group items
pub const GROUP_TYPE: &str = "Group";

/// Property names no proxy may take
pub const BUILTIN_PROPERTIES: [&str; 5] = ["id", "parent_id", "name", "expanded", "script_class"];

/// Name and kind of one item property
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDescriptor {
    pub name: String,
    pub kind: ValueKind,
    /// Whether `duplicate` / `impersonate` may copy it
    pub settable: bool,
}

impl PropertyDescriptor {
    fn new(name: &str, kind: ValueKind, settable: bool) -> Self {
        Self {
            name: name.to_string(),
            kind,
            settable,
        }
    }
}

/// State shared by every item
#[derive(Debug, Clone, PartialEq)]
pub struct ItemCore {
    pub(crate) id: ItemId,
    pub(crate) parent_id: Option<ItemId>,
    pub(crate) name: String,
    pub(crate) expanded: bool,
}

impl ItemCore {
    fn new(name: String) -> Self {
        Self {
            id: ItemId::new(),
            parent_id: None,
            name,
            expanded: true,
        }
    }

    fn property(&self, property: &str) -> Option<Value> {
        match property {
            "id" => Some(Value::Id(Some(self.id))),
            "parent_id" => Some(Value::Id(self.parent_id)),
            "name" => Some(Value::Text(self.name.clone())),
            "expanded" => Some(Value::Bool(self.expanded)),
            _ => None,
        }
    }

    fn descriptors() -> Vec<PropertyDescriptor> {
        vec![
            PropertyDescriptor::new("id", ValueKind::Id, false),
            PropertyDescriptor::new("parent_id", ValueKind::Id, false),
            PropertyDescriptor::new("name", ValueKind::Text, true),
            PropertyDescriptor::new("expanded", ValueKind::Bool, false),
        ]
    }

    fn set_expanded(&mut self, value: Value) -> Result<Option<Value>, PropertyError> {
        let expanded = expect_bool("expanded", value)?;
        if expanded == self.expanded {
            return Ok(None);
        }
        self.expanded = expanded;
        Ok(Some(Value::Bool(!expanded)))
    }
}

fn expect_text(property: &str, value: Value) -> Result<String, PropertyError> {
    match value.coerce(ValueKind::Text) {
        Some(Value::Text(text)) => Ok(text),
        other => Err(PropertyError::KindMismatch {
            property: property.to_string(),
            expected: ValueKind::Text,
            found: other.map_or(ValueKind::Null, |v| v.kind()),
        }),
    }
}

fn expect_bool(property: &str, value: Value) -> Result<bool, PropertyError> {
    value.as_bool().ok_or_else(|| PropertyError::KindMismatch {
        property: property.to_string(),
        expected: ValueKind::Bool,
        found: value.kind(),
    })
}

/// Item bound to a live instance
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentItem {
    pub(crate) core: ItemCore,
    shape: Arc<ComponentShape>,
    script_class: String,
    proxies: Vec<Proxy>,
    pub(crate) instance: Option<InstanceId>,
}

impl ComponentItem {
    /// Fresh, unbound item of `shape`
    pub fn new(shape: Arc<ComponentShape>) -> Self {
        let proxies = shape.proxies.iter().map(|spec| spec.build()).collect();
        let mut item = Self {
            core: ItemCore::new(String::new()),
            script_class: shape.script_class.clone(),
            proxies,
            instance: None,
            shape,
        };
        item.core.name = item.format_name(item.shape.default_name());
        item
    }

    pub fn id(&self) -> ItemId {
        self.core.id
    }

    pub fn parent_id(&self) -> Option<ItemId> {
        self.core.parent_id
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    pub fn expanded(&self) -> bool {
        self.core.expanded
    }

    pub fn item_type(&self) -> &str {
        &self.shape.type_name
    }

    pub fn script_class(&self) -> &str {
        &self.script_class
    }

    pub fn shape(&self) -> &Arc<ComponentShape> {
        &self.shape
    }

    /// Live instance, `None` while the item is outside a document
    pub fn instance(&self) -> Option<InstanceId> {
        self.instance
    }

    pub fn proxies(&self) -> &[Proxy] {
        &self.proxies
    }

    pub fn proxy(&self, name: &str) -> Option<&Proxy> {
        self.proxies.iter().find(|p| p.name() == name)
    }

    /// Apply the shape's naming rule to `name`
    pub fn format_name(&self, name: &str) -> String {
        match self.shape.name_format {
            NameFormat::Verbatim => name.to_string(),
            NameFormat::QualifyDefault if name == self.shape.default_name() => {
                format!("{} ({})", name, self.core.id.short())
            }
            NameFormat::QualifyDefault => name.to_string(),
        }
    }

    /// Assign a new id. Only meaningful for items outside a document.
    pub fn regenerate_id(&mut self) -> ItemId {
        self.core.id = ItemId::new();
        self.core.id
    }

    pub fn property(&self, property: &str) -> Option<Value> {
        match property {
            "script_class" => Some(Value::Text(self.script_class.clone())),
            _ => self
                .core
                .property(property)
                .or_else(|| self.proxy(property).map(|p| p.value().clone())),
        }
    }

    pub fn property_names(&self) -> Vec<PropertyDescriptor> {
        let mut descriptors = ItemCore::descriptors();
        descriptors.push(PropertyDescriptor::new("script_class", ValueKind::Text, true));
        descriptors.extend(
            self.proxies
                .iter()
                .map(|p| PropertyDescriptor::new(p.name(), p.kind(), true)),
        );
        descriptors
    }

    /// Set a property, pushing to the live instance when bound.
    ///
    /// Returns the old value when it changed. `id` and `parent_id` are
    /// read-only here; parentage is owned by the document.
    pub(crate) fn set_property(
        &mut self,
        runtime: &mut dyn Runtime,
        property: &str,
        value: Value,
    ) -> Result<Option<Value>, PropertyError> {
        match property {
            "id" | "parent_id" => Err(PropertyError::ReadOnly(property.to_string())),
            "name" => {
                let name = self.format_name(&expect_text(property, value)?);
                if name == self.core.name {
                    return Ok(None);
                }
                if let Some(instance) = self.instance {
                    runtime.set_name(instance, &name)?;
                }
                Ok(Some(Value::Text(std::mem::replace(&mut self.core.name, name))))
            }
            "expanded" => self.core.set_expanded(value),
            "script_class" => {
                let class = expect_text(property, value)?;
                if class == self.script_class {
                    return Ok(None);
                }
                Ok(Some(Value::Text(std::mem::replace(&mut self.script_class, class))))
            }
            _ => {
                let instance = self.instance;
                let proxy = self
                    .proxies
                    .iter_mut()
                    .find(|p| p.name() == property)
                    .ok_or_else(|| PropertyError::Unknown(property.to_string()))?;
                proxy.set_value(runtime, instance, value)
            }
        }
    }

    /// Copy of this item with a fresh id, no parent and no instance
    pub fn duplicate(&self) -> ComponentItem {
        let mut copy = ComponentItem::new(Arc::clone(&self.shape));
        for descriptor in self.property_names() {
            if !descriptor.settable || self.shape.filters(&descriptor.name) {
                continue;
            }
            if let Some(value) = self.property(&descriptor.name) {
                copy.assign(&descriptor.name, value);
            }
        }
        copy
    }

    /// Adopt every property of `source` whose name and kind match, except
    /// `id` and anything either shape filters. Parentage and the expand
    /// flag come along too.
    pub fn impersonate(&mut self, source: &ComponentItem) {
        self.core.parent_id = source.core.parent_id;
        self.core.expanded = source.core.expanded;

        let targets = self.property_names();
        for descriptor in source.property_names() {
            if !descriptor.settable
                || source.shape.filters(&descriptor.name)
                || self.shape.filters(&descriptor.name)
            {
                continue;
            }
            let matches = targets
                .iter()
                .any(|t| t.name == descriptor.name && t.kind == descriptor.kind && t.kind != ValueKind::Null);
            if !matches {
                continue;
            }
            if let Some(value) = source.property(&descriptor.name) {
                self.assign(&descriptor.name, value);
            }
        }
    }

    /// Write into the caches of an unbound item, skipping name formatting
    fn assign(&mut self, property: &str, value: Value) {
        match property {
            "name" => {
                if let Some(Value::Text(name)) = value.coerce(ValueKind::Text) {
                    self.core.name = name;
                }
            }
            "script_class" => {
                if let Some(Value::Text(class)) = value.coerce(ValueKind::Text) {
                    self.script_class = class;
                }
            }
            _ => {
                if let Some(proxy) = self.proxies.iter_mut().find(|p| p.name() == property) {
                    if let Err(err) = proxy.restore(value) {
                        warn!(item = %self.core.id, property, error = %err, "Dropped property value");
                    }
                }
            }
        }
    }

    /// Pull every proxy from the live instance. Returns `(property, old)` for
    /// each value that changed.
    pub(crate) fn synchronize_from(&mut self, runtime: &dyn Runtime) -> Result<Vec<(String, Value)>, InstanceError> {
        let mut changed = Vec::new();
        for proxy in &mut self.proxies {
            if let Some(old) = proxy.synchronize_from(runtime, self.instance)? {
                changed.push((proxy.name().to_string(), old));
            }
        }
        Ok(changed)
    }

    /// Push the name and every proxy onto the live instance
    pub(crate) fn synchronize_to(&self, runtime: &mut dyn Runtime) -> Result<(), InstanceError> {
        let instance = self.instance.ok_or(InstanceError::Unbound)?;
        runtime.set_name(instance, &self.core.name)?;
        for proxy in &self.proxies {
            proxy.synchronize_to(runtime, Some(instance))?;
        }
        Ok(())
    }

    /// Overwrite proxy caches from loaded values, ignoring unknown names
    pub(crate) fn restore(&mut self, property: &str, value: Value) -> Result<(), PropertyError> {
        match self.proxies.iter_mut().find(|p| p.name() == property) {
            Some(proxy) => proxy.restore(value),
            None => Err(PropertyError::Unknown(property.to_string())),
        }
    }

    pub(crate) fn set_script_class(&mut self, class: String) {
        self.script_class = class;
    }
}

/// Pure hierarchy node
#[derive(Debug, Clone, PartialEq)]
pub struct GroupItem {
    pub(crate) core: ItemCore,
}

impl GroupItem {
    pub fn new() -> Self {
        Self {
            core: ItemCore::new(GROUP_TYPE.to_string()),
        }
    }

    pub fn id(&self) -> ItemId {
        self.core.id
    }

    pub fn parent_id(&self) -> Option<ItemId> {
        self.core.parent_id
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    pub fn expanded(&self) -> bool {
        self.core.expanded
    }

    pub fn item_type(&self) -> &str {
        GROUP_TYPE
    }

    pub fn regenerate_id(&mut self) -> ItemId {
        self.core.id = ItemId::new();
        self.core.id
    }

    pub fn property(&self, property: &str) -> Option<Value> {
        self.core.property(property)
    }

    pub fn property_names(&self) -> Vec<PropertyDescriptor> {
        ItemCore::descriptors()
    }

    pub(crate) fn set_property(&mut self, property: &str, value: Value) -> Result<Option<Value>, PropertyError> {
        match property {
            "id" | "parent_id" => Err(PropertyError::ReadOnly(property.to_string())),
            "name" => {
                let name = expect_text(property, value)?;
                if name == self.core.name {
                    return Ok(None);
                }
                Ok(Some(Value::Text(std::mem::replace(&mut self.core.name, name))))
            }
            "expanded" => self.core.set_expanded(value),
            _ => Err(PropertyError::Unknown(property.to_string())),
        }
    }

    pub fn duplicate(&self) -> GroupItem {
        let mut copy = GroupItem::new();
        copy.core.name = self.core.name.clone();
        copy
    }
}

impl Default for GroupItem {
    fn default() -> Self {
        Self::new()
    }
}

/// Owned item of either variant
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Component(ComponentItem),
    Group(GroupItem),
}

impl Item {
    pub fn view(&self) -> ItemRef<'_> {
        match self {
            Item::Component(component) => ItemRef::Component(component),
            Item::Group(group) => ItemRef::Group(group),
        }
    }

    pub fn id(&self) -> ItemId {
        self.view().id()
    }
}

impl From<ComponentItem> for Item {
    fn from(component: ComponentItem) -> Self {
        Item::Component(component)
    }
}

impl From<GroupItem> for Item {
    fn from(group: GroupItem) -> Self {
        Item::Group(group)
    }
}

/// Borrowed view of an item owned by a document
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ItemRef<'a> {
    Component(&'a ComponentItem),
    Group(&'a GroupItem),
}

impl<'a> ItemRef<'a> {
    fn core(&self) -> &'a ItemCore {
        match *self {
            ItemRef::Component(component) => &component.core,
            ItemRef::Group(group) => &group.core,
        }
    }

    pub fn id(&self) -> ItemId {
        self.core().id
    }

    pub fn parent_id(&self) -> Option<ItemId> {
        self.core().parent_id
    }

    pub fn name(&self) -> &'a str {
        &self.core().name
    }

    pub fn expanded(&self) -> bool {
        self.core().expanded
    }

    pub fn item_type(&self) -> &'a str {
        match *self {
            ItemRef::Component(component) => component.item_type(),
            ItemRef::Group(_) => GROUP_TYPE,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, ItemRef::Group(_))
    }

    pub fn as_component(&self) -> Option<&'a ComponentItem> {
        match *self {
            ItemRef::Component(component) => Some(component),
            ItemRef::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&'a GroupItem> {
        match *self {
            ItemRef::Group(group) => Some(group),
            ItemRef::Component(_) => None,
        }
    }

    pub fn property(&self, property: &str) -> Option<Value> {
        match self {
            ItemRef::Component(component) => component.property(property),
            ItemRef::Group(group) => group.property(property),
        }
    }

    pub fn property_names(&self) -> Vec<PropertyDescriptor> {
        match self {
            ItemRef::Component(component) => component.property_names(),
            ItemRef::Group(group) => group.property_names(),
        }
    }

    pub fn to_item(&self) -> Item {
        match *self {
            ItemRef::Component(component) => Item::Component(component.clone()),
            ItemRef::Group(group) => Item::Group(group.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{ProxySpec, TypeRegistry};
    use crate::runtime::SceneRuntime;

    fn light() -> ComponentItem {
        TypeRegistry::builtin().create_item("Light").unwrap()
    }

    #[test]
    fn test_new_item_defaults() {
        let widget = TypeRegistry::builtin().create_item("Widget").unwrap();
        assert_eq!(widget.name(), "Widget");
        assert_eq!(widget.item_type(), "Widget");
        assert!(widget.expanded());
        assert_eq!(widget.parent_id(), None);
        assert_eq!(widget.instance(), None);
        assert_eq!(widget.property("visible"), Some(Value::Bool(true)));
    }

    #[test]
    fn test_qualified_default_name() {
        let item = light();
        assert_eq!(item.name(), format!("Light ({})", item.id().short()));
        assert_eq!(item.format_name("Key Light"), "Key Light");
    }

    #[test]
    fn test_null_name_becomes_empty() {
        let mut runtime = SceneRuntime::new();
        let mut item = TypeRegistry::builtin().create_item("Widget").unwrap();
        let old = item.set_property(&mut runtime, "name", Value::Null).unwrap();
        assert_eq!(old, Some(Value::from("Widget")));
        assert_eq!(item.name(), "");
    }

    #[test]
    fn test_read_only_properties() {
        let mut runtime = SceneRuntime::new();
        let mut item = light();
        let id = ItemId::new();
        assert!(matches!(
            item.set_property(&mut runtime, "id", Value::from(id)),
            Err(PropertyError::ReadOnly(_))
        ));
        assert!(matches!(
            item.set_property(&mut runtime, "parent_id", Value::from(id)),
            Err(PropertyError::ReadOnly(_))
        ));
        assert!(matches!(
            item.set_property(&mut runtime, "wattage", Value::Float(1.0)),
            Err(PropertyError::Unknown(_))
        ));
    }

    #[test]
    fn test_property_names_in_declaration_order() {
        let names: Vec<_> = light().property_names().into_iter().map(|d| d.name).collect();
        assert_eq!(
            names,
            vec!["id", "parent_id", "name", "expanded", "script_class", "position", "intensity", "color", "cast_shadows"]
        );
    }

    #[test]
    fn test_duplicate_copies_unfiltered_properties() {
        let mut runtime = SceneRuntime::new();
        let mut camera = TypeRegistry::builtin().create_item("Camera").unwrap();
        camera.core.parent_id = Some(ItemId::new());
        camera.core.expanded = false;
        camera.set_property(&mut runtime, "name", Value::from("Main")).unwrap();
        camera.set_property(&mut runtime, "fov", Value::Float(45.0)).unwrap();
        camera.set_property(&mut runtime, "primary", Value::Bool(true)).unwrap();

        let copy = camera.duplicate();
        assert_ne!(copy.id(), camera.id());
        assert_eq!(copy.parent_id(), None);
        assert!(copy.expanded());
        assert_eq!(copy.name(), "Main");
        assert_eq!(copy.property("fov"), Some(Value::Float(45.0)));
        // Filtered
        assert_eq!(copy.property("primary"), Some(Value::Bool(false)));
    }

    #[test]
    fn test_impersonate_matches_name_and_kind() {
        let mut runtime = SceneRuntime::new();
        let registry = TypeRegistry::builtin();
        let mut widget = registry.create_item("Widget").unwrap();
        widget.core.parent_id = Some(ItemId::new());
        widget.set_property(&mut runtime, "name", Value::from("Door")).unwrap();
        widget.set_property(&mut runtime, "position", Value::Vector([1.0, 2.0, 3.0])).unwrap();

        let mut lamp = registry.create_item("Light").unwrap();
        let lamp_id = lamp.id();
        lamp.impersonate(&widget);

        assert_eq!(lamp.id(), lamp_id);
        assert_eq!(lamp.parent_id(), widget.parent_id());
        assert_eq!(lamp.name(), "Door");
        assert_eq!(lamp.property("position"), Some(Value::Vector([1.0, 2.0, 3.0])));
        assert_eq!(lamp.property("intensity"), Some(Value::Float(1.0)));
    }

    #[test]
    fn test_impersonate_skips_kind_mismatch() {
        let mut registry = TypeRegistry::new();
        registry
            .register(ComponentShape::new("A").with_proxy(ProxySpec::field("size", ValueKind::Float, "size")))
            .unwrap();
        registry
            .register(ComponentShape::new("B").with_proxy(ProxySpec::field("size", ValueKind::Vector, "size")))
            .unwrap();

        let mut runtime = SceneRuntime::new();
        let mut a = registry.create_item("A").unwrap();
        a.set_property(&mut runtime, "size", Value::Float(4.0)).unwrap();
        let mut b = registry.create_item("B").unwrap();
        b.impersonate(&a);
        assert_eq!(b.property("size"), Some(Value::Vector([0.0; 3])));
    }

    #[test]
    fn test_group_properties() {
        let mut group = GroupItem::new();
        assert_eq!(group.item_type(), GROUP_TYPE);
        assert_eq!(group.name(), "Group");

        assert_eq!(group.set_property("expanded", Value::Bool(false)).unwrap(), Some(Value::Bool(true)));
        assert_eq!(group.set_property("expanded", Value::Bool(false)).unwrap(), None);
        assert!(group.set_property("script_class", Value::from("x")).is_err());

        let copy = group.duplicate();
        assert_ne!(copy.id(), group.id());
        assert!(copy.expanded());
    }

    #[test]
    fn test_item_ref_dispatch() {
        let group = GroupItem::new();
        let widget = TypeRegistry::builtin().create_item("Widget").unwrap();

        let items = [ItemRef::Group(&group), ItemRef::Component(&widget)];
        let types: Vec<_> = items.iter().map(|i| i.item_type()).collect();
        assert_eq!(types, vec!["Group", "Widget"]);
        assert!(items[0].is_group());
        assert_eq!(items[1].as_component().map(|c| c.id()), Some(widget.id()));
        assert_eq!(Item::from(group.clone()).id(), group.id());
    }
}
