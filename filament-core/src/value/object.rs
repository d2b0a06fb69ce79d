//! User-defined objects and native functions.
//!
//! An object is a bag of named fields plus a shape. The shape is the static
//! part shared by every instance of the same user type: computed property
//! accessors, methods, and the skip marker that exempts instances from
//! `reactive()`. Property accessors and methods receive the value they were
//! reached through, so an accessor resolved via a reactive proxy reads its
//! fields through that proxy and its dependencies are tracked.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::error::Result;
use crate::value::{ObjId, Value};

/// A computed property accessor. Receives the object (raw or proxied) it was
/// resolved through.
pub type PropertyGetter = Arc<dyn Fn(&Value) -> Result<Value> + Send + Sync>;

/// A method body. Receives the object it was resolved through plus the call
/// arguments.
pub type Method = Arc<dyn Fn(&Value, &[Value]) -> Result<Value> + Send + Sync>;

/// The static description of a user object type.
pub struct ObjectShape {
    name: String,
    skip: bool,
    properties: IndexMap<String, PropertyGetter>,
    methods: IndexMap<String, Method>,
}

impl ObjectShape {
    /// Start building a shape with the given type name.
    pub fn builder(name: impl Into<String>) -> ObjectShapeBuilder {
        ObjectShapeBuilder {
            name: name.into(),
            skip: false,
            properties: IndexMap::new(),
            methods: IndexMap::new(),
        }
    }

    /// A plain shape with no accessors, no methods, and no skip marker.
    pub fn plain(name: impl Into<String>) -> Arc<Self> {
        Self::builder(name).build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether instances of this shape bypass `reactive()` entirely.
    pub fn skips_reactive(&self) -> bool {
        self.skip
    }

    pub fn property(&self, name: &str) -> Option<&PropertyGetter> {
        self.properties.get(name)
    }

    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.get(name)
    }
}

impl fmt::Debug for ObjectShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectShape")
            .field("name", &self.name)
            .field("skip", &self.skip)
            .field("properties", &self.properties.keys().collect::<Vec<_>>())
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Builder for [`ObjectShape`].
pub struct ObjectShapeBuilder {
    name: String,
    skip: bool,
    properties: IndexMap<String, PropertyGetter>,
    methods: IndexMap<String, Method>,
}

impl ObjectShapeBuilder {
    /// Register a computed property accessor.
    pub fn property(
        mut self,
        name: impl Into<String>,
        getter: impl Fn(&Value) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        self.properties.insert(name.into(), Arc::new(getter));
        self
    }

    /// Register a method.
    pub fn method(
        mut self,
        name: impl Into<String>,
        body: impl Fn(&Value, &[Value]) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        self.methods.insert(name.into(), Arc::new(body));
        self
    }

    /// Mark every instance of this shape as exempt from `reactive()`.
    pub fn skip_reactive(mut self) -> Self {
        self.skip = true;
        self
    }

    pub fn build(self) -> Arc<ObjectShape> {
        Arc::new(ObjectShape {
            name: self.name,
            skip: self.skip,
            properties: self.properties,
            methods: self.methods,
        })
    }
}

/// A user object instance: shape plus mutable named fields.
pub struct ObjectValue {
    id: ObjId,
    shape: Arc<ObjectShape>,
    fields: RwLock<IndexMap<String, Value>>,
}

impl ObjectValue {
    pub fn new(shape: Arc<ObjectShape>, fields: IndexMap<String, Value>) -> Self {
        Self {
            id: ObjId::new(),
            shape,
            fields: RwLock::new(fields),
        }
    }

    pub fn id(&self) -> ObjId {
        self.id
    }

    pub fn shape(&self) -> &Arc<ObjectShape> {
        &self.shape
    }

    pub fn field(&self, name: &str) -> Option<Value> {
        self.fields.read().get(name).cloned()
    }

    pub fn set_field(&self, name: &str, value: Value) {
        self.fields.write().insert(name.to_string(), value);
    }

    pub fn remove_field(&self, name: &str) -> Option<Value> {
        self.fields.write().shift_remove(name)
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.read().keys().cloned().collect()
    }
}

impl fmt::Debug for ObjectValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(self.shape.name())
            .field("id", &self.id)
            .field("fields", &self.fields.read().keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A callable native function value.
pub struct NativeFn {
    id: ObjId,
    body: Box<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>,
}

impl NativeFn {
    pub fn new(body: impl Fn(&[Value]) -> Result<Value> + Send + Sync + 'static) -> Self {
        Self {
            id: ObjId::new(),
            body: Box::new(body),
        }
    }

    pub fn id(&self) -> ObjId {
        self.id
    }

    pub fn call(&self, args: &[Value]) -> Result<Value> {
        (self.body)(args)
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFn").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_lookup() {
        let shape = ObjectShape::builder("Point")
            .property("magnitude", |_| Ok(Value::Int(0)))
            .method("reset", |_, _| Ok(Value::Unit))
            .build();

        assert_eq!(shape.name(), "Point");
        assert!(shape.property("magnitude").is_some());
        assert!(shape.method("reset").is_some());
        assert!(shape.property("missing").is_none());
        assert!(!shape.skips_reactive());
    }

    #[test]
    fn fields_are_shared_mutable_state() {
        let obj = ObjectValue::new(ObjectShape::plain("Bag"), IndexMap::new());
        assert!(obj.field("x").is_none());

        obj.set_field("x", Value::Int(3));
        assert_eq!(obj.field("x"), Some(Value::Int(3)));

        obj.remove_field("x");
        assert!(obj.field("x").is_none());
    }

    #[test]
    fn native_fn_invokes_body() {
        let double = NativeFn::new(|args| {
            let n = args.first().and_then(Value::as_int).unwrap_or(0);
            Ok(Value::Int(n * 2))
        });
        assert_eq!(double.call(&[Value::Int(21)]).unwrap(), Value::Int(42));
    }
}
