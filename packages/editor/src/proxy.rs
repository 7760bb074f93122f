//! # Proxy Bindings
//!
//! A proxy mirrors one named property between a component item and its
//! live instance. Every flavor shares the same contract:
//!
//! - `value()` returns the cached last-known value
//! - `set_value()` validates, compares, pushes to the instance (when bound)
//!   and only then commits the cache
//! - `synchronize_from()` pulls, `synchronize_to()` pushes unconditionally
//!
//! Flavors only differ in how the instance is read and written, see
//! [`Accessor`].

use crate::errors::PropertyError;
use crate::runtime::{InstanceError, InstanceId, Runtime};
use crate::value::{Value, ValueKind};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type CustomGetter = fn(&dyn Runtime, InstanceId) -> Result<Value, InstanceError>;
pub type CustomSetter = fn(&mut dyn Runtime, InstanceId, &Value) -> Result<(), InstanceError>;

/// User-supplied getter/setter pair
#[derive(Clone, Copy)]
pub struct CustomAccessor {
    pub label: &'static str,
    pub get: CustomGetter,
    pub set: CustomSetter,
}

impl fmt::Debug for CustomAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomAccessor").field("label", &self.label).finish()
    }
}

impl PartialEq for CustomAccessor {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label
    }
}

/// How a proxy reaches into its live instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "via", rename_all = "camelCase")]
pub enum Accessor {
    /// Direct instance property
    Field { field: String },

    /// Property of a nested member object
    Member { member: String, field: String },

    /// Entry of the instance's keyed trait map
    Trait { key: String },

    /// Getter/setter functions registered in code
    #[serde(skip)]
    Custom(CustomAccessor),

    /// Degrees on the item, rotation matrix on the instance
    Orientation { field: String },
}

impl Accessor {
    pub fn read(&self, runtime: &dyn Runtime, instance: InstanceId) -> Result<Value, InstanceError> {
        match self {
            Accessor::Field { field } => runtime.get(instance, field),
            Accessor::Member { member, field } => runtime.get_member(instance, member, field),
            Accessor::Trait { key } => runtime.get_trait(instance, key),
            Accessor::Custom(custom) => (custom.get)(runtime, instance),
            Accessor::Orientation { field } => match runtime.get(instance, field)? {
                Value::Matrix(m) => Ok(Value::Vector(matrix_to_degrees(&m))),
                other => Err(InstanceError::KindMismatch {
                    property: field.clone(),
                    expected: ValueKind::Matrix,
                    found: other.kind(),
                }),
            },
        }
    }

    pub fn write(&self, runtime: &mut dyn Runtime, instance: InstanceId, value: &Value) -> Result<(), InstanceError> {
        match self {
            Accessor::Field { field } => runtime.set(instance, field, value.clone()),
            Accessor::Member { member, field } => runtime.set_member(instance, member, field, value.clone()),
            Accessor::Trait { key } => runtime.set_trait(instance, key, value.clone()),
            Accessor::Custom(custom) => (custom.set)(runtime, instance, value),
            Accessor::Orientation { field } => {
                let degrees = value.as_vector().ok_or_else(|| InstanceError::KindMismatch {
                    property: field.clone(),
                    expected: ValueKind::Vector,
                    found: value.kind(),
                })?;
                runtime.set(instance, field, Value::Matrix(degrees_to_matrix(degrees)))
            }
        }
    }

    /// Whether a value read back from the instance matches `cached`.
    /// Orientations compare as rotations, since many angle triples share a matrix.
    pub fn equivalent(&self, cached: &Value, live: &Value) -> bool {
        match (self, cached.as_vector(), live.as_vector()) {
            (Accessor::Orientation { .. }, Some(cached), Some(live)) => {
                let (a, b) = (degrees_to_matrix(cached), degrees_to_matrix(live));
                a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() <= ROTATION_TOLERANCE)
            }
            _ => cached == live,
        }
    }
}

/// Elementwise slack when comparing rotation matrices
const ROTATION_TOLERANCE: f64 = 1e-6;

/// Euler angles in degrees (X, then Y, then Z) to a row-major rotation matrix
pub fn degrees_to_matrix(degrees: [f64; 3]) -> [f64; 9] {
    let [a, b, c] = degrees.map(f64::to_radians);
    let (sa, ca) = a.sin_cos();
    let (sb, cb) = b.sin_cos();
    let (sc, cc) = c.sin_cos();

    [
        cb * cc,
        sa * sb * cc - ca * sc,
        ca * sb * cc + sa * sc,
        cb * sc,
        sa * sb * sc + ca * cc,
        ca * sb * sc - sa * cc,
        -sb,
        sa * cb,
        ca * cb,
    ]
}

/// Inverse of [`degrees_to_matrix`], rounded to 1e-6 degrees
pub fn matrix_to_degrees(m: &[f64; 9]) -> [f64; 3] {
    let b = (-m[6]).clamp(-1.0, 1.0).asin();
    let (a, c) = if b.cos().abs() > 1e-9 {
        (m[7].atan2(m[8]), m[3].atan2(m[0]))
    } else {
        // Gimbal lock: fold Z into X
        ((-m[5]).atan2(m[4]), 0.0)
    };
    [a, b, c].map(|r| {
        let rounded = (r.to_degrees() * 1e6).round() / 1e6;
        // Normalize negative zero
        if rounded == 0.0 { 0.0 } else { rounded }
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct Proxy {
    name: String,
    kind: ValueKind,
    accessor: Accessor,
    cached: Value,
}

impl Proxy {
    pub fn new(name: impl Into<String>, kind: ValueKind, accessor: Accessor, initial: Value) -> Self {
        let cached = initial.coerce(kind).unwrap_or_else(|| kind.default_value());
        Self {
            name: name.into(),
            kind,
            accessor,
            cached,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn accessor(&self) -> &Accessor {
        &self.accessor
    }

    pub fn value(&self) -> &Value {
        &self.cached
    }

    /// Coerce `value` to this proxy's kind
    pub fn validate(&self, value: Value) -> Result<Value, PropertyError> {
        let found = value.kind();
        value.coerce(self.kind).ok_or_else(|| PropertyError::KindMismatch {
            property: self.name.clone(),
            expected: self.kind,
            found,
        })
    }

    /// Set the value, pushing it onto the live instance first.
    ///
    /// Returns the previous value when it changed. A failed push leaves the
    /// cache untouched; an unbound proxy still commits the cache.
    pub fn set_value(
        &mut self,
        runtime: &mut dyn Runtime,
        instance: Option<InstanceId>,
        value: Value,
    ) -> Result<Option<Value>, PropertyError> {
        let value = self.validate(value)?;
        if value == self.cached {
            return Ok(None);
        }
        if let Some(instance) = instance {
            self.accessor.write(runtime, instance, &value)?;
        }
        Ok(Some(std::mem::replace(&mut self.cached, value)))
    }

    /// Pull the live value into the cache. Returns the previous value when it changed.
    pub fn synchronize_from(
        &mut self,
        runtime: &dyn Runtime,
        instance: Option<InstanceId>,
    ) -> Result<Option<Value>, InstanceError> {
        let instance = instance.ok_or(InstanceError::Unbound)?;
        let live = self.accessor.read(runtime, instance)?;
        let found = live.kind();
        let live = live.coerce(self.kind).ok_or_else(|| InstanceError::KindMismatch {
            property: self.name.clone(),
            expected: self.kind,
            found,
        })?;
        if self.accessor.equivalent(&self.cached, &live) {
            return Ok(None);
        }
        Ok(Some(std::mem::replace(&mut self.cached, live)))
    }

    /// Push the cache onto the live instance unconditionally
    pub fn synchronize_to(&self, runtime: &mut dyn Runtime, instance: Option<InstanceId>) -> Result<(), InstanceError> {
        let instance = instance.ok_or(InstanceError::Unbound)?;
        self.accessor.write(runtime, instance, &self.cached)
    }

    /// Overwrite the cache without touching any instance
    pub(crate) fn restore(&mut self, value: Value) -> Result<(), PropertyError> {
        self.cached = self.validate(value)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{ComponentShape, ProxySpec};
    use crate::runtime::SceneRuntime;

    fn read_scale(runtime: &dyn Runtime, instance: InstanceId) -> Result<Value, InstanceError> {
        let uniform = runtime.get(instance, "uniform_scale")?.as_float().unwrap_or(1.0);
        Ok(Value::Vector([uniform; 3]))
    }

    fn write_scale(runtime: &mut dyn Runtime, instance: InstanceId, value: &Value) -> Result<(), InstanceError> {
        let [x, _, _] = value.as_vector().unwrap_or([1.0; 3]);
        runtime.set(instance, "uniform_scale", Value::Float(x))
    }

    fn spawned(shape: &ComponentShape) -> (SceneRuntime, InstanceId) {
        let mut runtime = SceneRuntime::new();
        let id = runtime.spawn(shape).unwrap();
        (runtime, id)
    }

    #[test]
    fn test_set_value_pushes_then_commits() {
        let shape = ComponentShape::new("Lamp").with_proxy(ProxySpec::field("intensity", ValueKind::Float, "intensity"));
        let (mut runtime, id) = spawned(&shape);
        let mut proxy = shape.proxies[0].build();

        let old = proxy.set_value(&mut runtime, Some(id), Value::Float(2.5)).unwrap();
        assert_eq!(old, Some(Value::Float(0.0)));
        assert_eq!(proxy.value(), &Value::Float(2.5));
        assert_eq!(runtime.get(id, "intensity").unwrap(), Value::Float(2.5));
    }

    #[test]
    fn test_unchanged_value_reports_nothing() {
        let shape = ComponentShape::new("Lamp").with_proxy(ProxySpec::field("intensity", ValueKind::Float, "intensity"));
        let (mut runtime, id) = spawned(&shape);
        let mut proxy = shape.proxies[0].build();

        assert_eq!(proxy.set_value(&mut runtime, Some(id), Value::Int(0)).unwrap(), None);
    }

    #[test]
    fn test_failed_push_keeps_cache() {
        let shape = ComponentShape::new("Lamp").with_proxy(ProxySpec::field("intensity", ValueKind::Float, "intensity"));
        let (mut runtime, id) = spawned(&shape);
        runtime.lock(id, "intensity");
        let mut proxy = shape.proxies[0].build();

        let err = proxy.set_value(&mut runtime, Some(id), Value::Float(9.0)).unwrap_err();
        assert!(matches!(err, PropertyError::Instance(InstanceError::Locked(_))));
        assert_eq!(proxy.value(), &Value::Float(0.0));
    }

    #[test]
    fn test_unbound_proxy_commits_cache() {
        let mut runtime = SceneRuntime::new();
        let mut proxy = Proxy::new("label", ValueKind::Text, Accessor::Field { field: "label".into() }, Value::Null);

        let old = proxy.set_value(&mut runtime, None, Value::from("Hello")).unwrap();
        assert_eq!(old, Some(Value::Text(String::new())));
        assert_eq!(proxy.value(), &Value::from("Hello"));

        assert_eq!(proxy.synchronize_to(&mut runtime, None), Err(InstanceError::Unbound));
        assert_eq!(proxy.synchronize_from(&runtime, None), Err(InstanceError::Unbound));
    }

    #[test]
    fn test_null_text_coerces_on_set() {
        let mut runtime = SceneRuntime::new();
        let mut proxy = Proxy::new("label", ValueKind::Text, Accessor::Field { field: "label".into() }, Value::from("x"));
        proxy.set_value(&mut runtime, None, Value::Null).unwrap();
        assert_eq!(proxy.value(), &Value::Text(String::new()));
    }

    #[test]
    fn test_wrong_kind_is_invalid_argument() {
        let mut runtime = SceneRuntime::new();
        let mut proxy = Proxy::new("visible", ValueKind::Bool, Accessor::Trait { key: "visible".into() }, Value::Bool(true));
        let err = proxy.set_value(&mut runtime, None, Value::from("yes")).unwrap_err();
        assert!(matches!(err, PropertyError::KindMismatch { .. }));
    }

    #[test]
    fn test_synchronize_from_reports_live_change() {
        let shape = ComponentShape::new("Lamp").with_proxy(ProxySpec::member("color", ValueKind::Vector, "light", "color"));
        let (mut runtime, id) = spawned(&shape);
        let mut proxy = shape.proxies[0].build();

        runtime.set_member(id, "light", "color", Value::Vector([1.0, 0.5, 0.0])).unwrap();
        let old = proxy.synchronize_from(&runtime, Some(id)).unwrap();
        assert_eq!(old, Some(Value::Vector([0.0; 3])));
        assert_eq!(proxy.synchronize_from(&runtime, Some(id)).unwrap(), None);
    }

    #[test]
    fn test_custom_accessor() {
        let custom = CustomAccessor {
            label: "uniform-scale",
            get: read_scale,
            set: write_scale,
        };
        let shape = ComponentShape::new("Prop").with_proxy(ProxySpec::new(
            "scale",
            ValueKind::Vector,
            Accessor::Custom(custom),
            Some(Value::Vector([1.0; 3])),
        ));
        let (mut runtime, id) = spawned(&shape);
        let mut proxy = shape.proxies[0].build();

        proxy.set_value(&mut runtime, Some(id), Value::Vector([2.0, 2.0, 2.0])).unwrap();
        assert_eq!(runtime.get(id, "uniform_scale").unwrap(), Value::Float(2.0));
        assert_eq!(proxy.synchronize_from(&runtime, Some(id)).unwrap(), None);
    }

    #[test]
    fn test_orientation_round_trip() {
        let shape = ComponentShape::new("Camera").with_proxy(ProxySpec::orientation("rotation", "transform"));
        let (mut runtime, id) = spawned(&shape);
        let mut proxy = shape.proxies[0].build();

        proxy.set_value(&mut runtime, Some(id), Value::Vector([30.0, 45.0, 60.0])).unwrap();
        assert!(matches!(runtime.get(id, "transform").unwrap(), Value::Matrix(_)));

        // Pulling back the matrix yields the same angles, so nothing changes
        assert_eq!(proxy.synchronize_from(&runtime, Some(id)).unwrap(), None);
    }

    #[test]
    fn test_orientation_keeps_authored_angles() {
        let shape = ComponentShape::new("Camera").with_proxy(ProxySpec::orientation("rotation", "transform"));
        let (mut runtime, id) = spawned(&shape);

        for angles in [[0.0, 120.0, 0.0], [370.0, -30.0, 720.0], [-45.0, 95.0, 200.0], [0.0, 90.0, 30.0]] {
            let mut proxy = shape.proxies[0].build();
            proxy.set_value(&mut runtime, Some(id), Value::Vector(angles)).unwrap();
            assert_eq!(proxy.synchronize_from(&runtime, Some(id)).unwrap(), None, "{:?}", angles);
            assert_eq!(proxy.value(), &Value::Vector(angles));
        }
    }

    #[test]
    fn test_orientation_detects_real_rotation() {
        let shape = ComponentShape::new("Camera").with_proxy(ProxySpec::orientation("rotation", "transform"));
        let (mut runtime, id) = spawned(&shape);
        let mut proxy = shape.proxies[0].build();
        proxy.set_value(&mut runtime, Some(id), Value::Vector([0.0, 120.0, 0.0])).unwrap();

        runtime
            .set(id, "transform", Value::Matrix(degrees_to_matrix([0.0, 0.0, 45.0])))
            .unwrap();
        let old = proxy.synchronize_from(&runtime, Some(id)).unwrap();
        assert_eq!(old, Some(Value::Vector([0.0, 120.0, 0.0])));
        assert_eq!(proxy.value(), &Value::Vector([0.0, 0.0, 45.0]));
    }

    #[test]
    fn test_live_kind_mismatch_names_live_kind() {
        let shape = ComponentShape::new("Lamp").with_proxy(ProxySpec::field("label", ValueKind::Text, "label"));
        let (runtime, id) = spawned(&shape);
        // Float proxy pointed at a field that holds text on the instance
        let mut proxy = Proxy::new("label", ValueKind::Float, Accessor::Field { field: "label".into() }, Value::Float(0.0));

        let err = proxy.synchronize_from(&runtime, Some(id)).unwrap_err();
        assert_eq!(
            err,
            InstanceError::KindMismatch {
                property: "label".to_string(),
                expected: ValueKind::Float,
                found: ValueKind::Text,
            }
        );
        assert_eq!(proxy.value(), &Value::Float(0.0));
    }

    #[test]
    fn test_matrix_conversion() {
        assert_eq!(matrix_to_degrees(&crate::value::IDENTITY_MATRIX), [0.0, 0.0, 0.0]);

        let m = degrees_to_matrix([0.0, 0.0, 90.0]);
        assert!((m[0]).abs() < 1e-12);
        assert!((m[3] - 1.0).abs() < 1e-12);
        assert_eq!(matrix_to_degrees(&m), [0.0, 0.0, 90.0]);
    }
}
