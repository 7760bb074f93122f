//! # Live Instance Runtime
//!
//! The running application owns the live objects that component items
//! mirror. The document only talks to them through [`Runtime`]: a stable
//! [`InstanceId`], a name, named properties, nested members, a keyed trait
//! map and a parent link.
//!
//! [`SceneRuntime`] is an in-memory implementation used by tooling and
//! tests.

use crate::proxy::Accessor;
use crate::registry::ComponentShape;
use crate::value::{Value, ValueKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use thiserror::Error;

/// Identity of a live instance inside its runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(pub u64);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InstanceError {
    #[error("Component is not bound to a live instance")]
    Unbound,

    #[error("Instance not found: {0}")]
    NotFound(InstanceId),

    #[error("Instance {instance} has no property '{property}'")]
    MissingProperty { instance: InstanceId, property: String },

    #[error("Property '{property}' expects {expected}, got {found}")]
    KindMismatch {
        property: String,
        expected: ValueKind,
        found: ValueKind,
    },

    #[error("Property '{0}' is locked")]
    Locked(String),

    #[error("Instance error: {0}")]
    Custom(String),
}

/// Live-object collaborator
pub trait Runtime {
    /// Create a live instance for a component shape
    fn spawn(&mut self, shape: &ComponentShape) -> Result<InstanceId, InstanceError>;

    /// Destroy a live instance. Returns `false` if it did not exist.
    fn despawn(&mut self, instance: InstanceId) -> bool;

    fn contains(&self, instance: InstanceId) -> bool;

    fn name(&self, instance: InstanceId) -> Option<String>;

    fn set_name(&mut self, instance: InstanceId, name: &str) -> Result<(), InstanceError>;

    fn get(&self, instance: InstanceId, property: &str) -> Result<Value, InstanceError>;

    fn set(&mut self, instance: InstanceId, property: &str, value: Value) -> Result<(), InstanceError>;

    fn get_member(&self, instance: InstanceId, member: &str, field: &str) -> Result<Value, InstanceError>;

    fn set_member(
        &mut self,
        instance: InstanceId,
        member: &str,
        field: &str,
        value: Value,
    ) -> Result<(), InstanceError>;

    fn get_trait(&self, instance: InstanceId, key: &str) -> Result<Value, InstanceError>;

    fn set_trait(&mut self, instance: InstanceId, key: &str, value: Value) -> Result<(), InstanceError>;

    fn parent(&self, instance: InstanceId) -> Option<InstanceId>;

    fn set_parent(&mut self, instance: InstanceId, parent: Option<InstanceId>) -> Result<(), InstanceError>;
}

/// One object living in a [`SceneRuntime`]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LiveObject {
    pub type_name: String,
    pub name: String,
    pub fields: BTreeMap<String, Value>,
    pub members: BTreeMap<String, BTreeMap<String, Value>>,
    pub traits: BTreeMap<String, Value>,
    pub parent: Option<InstanceId>,
    pub(crate) locked: BTreeSet<String>,
}

/// In-memory runtime
#[derive(Debug, Default)]
pub struct SceneRuntime {
    objects: HashMap<InstanceId, LiveObject>,
    next_id: u64,
}

impl SceneRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an object created outside the document (for `External` adoption)
    pub fn insert(&mut self, object: LiveObject) -> InstanceId {
        let id = InstanceId(self.next_id);
        self.next_id += 1;
        self.objects.insert(id, object);
        id
    }

    pub fn object(&self, instance: InstanceId) -> Option<&LiveObject> {
        self.objects.get(&instance)
    }

    pub fn object_mut(&mut self, instance: InstanceId) -> Option<&mut LiveObject> {
        self.objects.get_mut(&instance)
    }

    /// Make every write to `property` (field, `member.field` or trait key) fail
    pub fn lock(&mut self, instance: InstanceId, property: &str) -> bool {
        match self.objects.get_mut(&instance) {
            Some(object) => object.locked.insert(property.to_string()),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn lookup(&self, instance: InstanceId) -> Result<&LiveObject, InstanceError> {
        self.objects.get(&instance).ok_or(InstanceError::NotFound(instance))
    }

    fn lookup_mut(&mut self, instance: InstanceId, path: &str) -> Result<&mut LiveObject, InstanceError> {
        let object = self
            .objects
            .get_mut(&instance)
            .ok_or(InstanceError::NotFound(instance))?;
        if object.locked.contains(path) {
            return Err(InstanceError::Locked(path.to_string()));
        }
        Ok(object)
    }
}

/// Overwrite a slot, keeping its kind stable once set
fn store(slot: &mut BTreeMap<String, Value>, key: &str, value: Value) -> Result<(), InstanceError> {
    if let Some(existing) = slot.get(key) {
        if !existing.is_null() && existing.kind() != value.kind() {
            return Err(InstanceError::KindMismatch {
                property: key.to_string(),
                expected: existing.kind(),
                found: value.kind(),
            });
        }
    }
    slot.insert(key.to_string(), value);
    Ok(())
}

impl Runtime for SceneRuntime {
    fn spawn(&mut self, shape: &ComponentShape) -> Result<InstanceId, InstanceError> {
        let mut object = LiveObject {
            type_name: shape.type_name.clone(),
            name: shape.default_name().to_string(),
            ..LiveObject::default()
        };

        for proxy in &shape.proxies {
            let initial = proxy.initial_value();
            match &proxy.accessor {
                Accessor::Field { field } => {
                    object.fields.insert(field.clone(), initial);
                }
                Accessor::Member { member, field } => {
                    object
                        .members
                        .entry(member.clone())
                        .or_default()
                        .insert(field.clone(), initial);
                }
                Accessor::Trait { key } => {
                    object.traits.insert(key.clone(), initial);
                }
                Accessor::Orientation { field } => {
                    let degrees = initial.as_vector().unwrap_or([0.0; 3]);
                    object
                        .fields
                        .insert(field.clone(), Value::Matrix(crate::proxy::degrees_to_matrix(degrees)));
                }
                // Custom accessors create their own storage on first write
                Accessor::Custom(_) => {}
            }
        }

        Ok(self.insert(object))
    }

    fn despawn(&mut self, instance: InstanceId) -> bool {
        let removed = self.objects.remove(&instance).is_some();
        if removed {
            for object in self.objects.values_mut() {
                if object.parent == Some(instance) {
                    object.parent = None;
                }
            }
        }
        removed
    }

    fn contains(&self, instance: InstanceId) -> bool {
        self.objects.contains_key(&instance)
    }

    fn name(&self, instance: InstanceId) -> Option<String> {
        self.objects.get(&instance).map(|o| o.name.clone())
    }

    fn set_name(&mut self, instance: InstanceId, name: &str) -> Result<(), InstanceError> {
        self.lookup_mut(instance, "name")?.name = name.to_string();
        Ok(())
    }

    fn get(&self, instance: InstanceId, property: &str) -> Result<Value, InstanceError> {
        self.lookup(instance)?
            .fields
            .get(property)
            .cloned()
            .ok_or_else(|| InstanceError::MissingProperty {
                instance,
                property: property.to_string(),
            })
    }

    fn set(&mut self, instance: InstanceId, property: &str, value: Value) -> Result<(), InstanceError> {
        let object = self.lookup_mut(instance, property)?;
        store(&mut object.fields, property, value)
    }

    fn get_member(&self, instance: InstanceId, member: &str, field: &str) -> Result<Value, InstanceError> {
        self.lookup(instance)?
            .members
            .get(member)
            .and_then(|fields| fields.get(field))
            .cloned()
            .ok_or_else(|| InstanceError::MissingProperty {
                instance,
                property: format!("{}.{}", member, field),
            })
    }

    fn set_member(
        &mut self,
        instance: InstanceId,
        member: &str,
        field: &str,
        value: Value,
    ) -> Result<(), InstanceError> {
        let path = format!("{}.{}", member, field);
        let object = self.lookup_mut(instance, &path)?;
        store(object.members.entry(member.to_string()).or_default(), field, value)
    }

    fn get_trait(&self, instance: InstanceId, key: &str) -> Result<Value, InstanceError> {
        self.lookup(instance)?
            .traits
            .get(key)
            .cloned()
            .ok_or_else(|| InstanceError::MissingProperty {
                instance,
                property: key.to_string(),
            })
    }

    fn set_trait(&mut self, instance: InstanceId, key: &str, value: Value) -> Result<(), InstanceError> {
        let object = self.lookup_mut(instance, key)?;
        store(&mut object.traits, key, value)
    }

    fn parent(&self, instance: InstanceId) -> Option<InstanceId> {
        self.objects.get(&instance).and_then(|o| o.parent)
    }

    fn set_parent(&mut self, instance: InstanceId, parent: Option<InstanceId>) -> Result<(), InstanceError> {
        if let Some(parent) = parent {
            if !self.objects.contains_key(&parent) {
                return Err(InstanceError::NotFound(parent));
            }
        }
        self.lookup_mut(instance, "parent")?.parent = parent;
        Ok(())
    }
}
