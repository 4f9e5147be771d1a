//! Values and the object graph arena
//!
//! Leaf values (numbers, text, enum variants) are carried inline. Everything
//! with identity lives in a [`Graph`] and is referred to by [`ObjectId`], so
//! shared and cyclic structures are plain handles rather than pointers. An
//! object read from a stream stays [`ObjectState::UnderConstruction`] until
//! its converter returns; a handle obtained while closing a cycle may point to
//! such a partial object.

use std::fmt;

use ahash::AHashMap;

use crate::error::{ErrorKind, Result};
use crate::types::{TypeKey, TypeKind, TypeRegistry};

/// Handle to an object in a [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u32);

impl ObjectId {
    /// Position in the arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[cfg(test)]
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Variant of an enum type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumValue {
    /// Enum type
    pub ty: TypeKey,
    /// Variant name
    pub variant: String,
}

/// Value stored in a field, list slot or map entry
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absence of a value
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Float
    Float(f64),
    /// Character
    Char(char),
    /// Text
    Str(String),
    /// Enum variant
    Enum(EnumValue),
    /// Object in the graph
    Ref(ObjectId),
}

impl Value {
    /// Runtime type of the value.
    pub fn type_key(&self, graph: &Graph) -> Result<TypeKey> {
        Ok(match self {
            Value::Null => TypeKey::NULL,
            Value::Bool(_) => TypeKey::BOOL,
            Value::Int(_) => TypeKey::INT,
            Value::Float(_) => TypeKey::FLOAT,
            Value::Char(_) => TypeKey::CHAR,
            Value::Str(_) => TypeKey::STRING,
            Value::Enum(value) => value.ty,
            Value::Ref(id) => graph.object(*id)?.ty,
        })
    }

    /// Object handle, if this is a reference.
    pub fn as_ref(&self) -> Option<ObjectId> {
        match self {
            Value::Ref(id) => Some(*id),
            _ => None,
        }
    }

    /// Text, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(text) => Some(text),
            _ => None,
        }
    }

    /// Integer, if this is one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Whether this is [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<char> for Value {
    fn from(value: char) -> Self {
        Value::Char(value)
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

impl From<ObjectId> for Value {
    fn from(id: ObjectId) -> Self {
        Value::Ref(id)
    }
}

/// Payload of an object
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectData {
    /// Field values indexed by the type's layout
    Fields(Vec<Value>),
    /// List items in order
    List(Vec<Value>),
    /// Map entries in insertion order
    Map(Vec<(Value, Value)>),
}

/// Construction state of an object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectState {
    /// Allocated while reading; fields may still be missing
    UnderConstruction,
    /// Fully populated
    Complete,
}

/// Object stored in the arena
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    /// Runtime type
    pub ty: TypeKey,
    /// Payload
    pub data: ObjectData,
    /// Construction state
    pub state: ObjectState,
}

/// Arena of objects addressed by [`ObjectId`].
#[derive(Debug, Clone, Default)]
pub struct Graph {
    objects: Vec<Object>,
}

impl Graph {
    /// Empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the graph holds no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Store an object and return its handle.
    pub fn insert(&mut self, object: Object) -> ObjectId {
        let id = ObjectId(self.objects.len() as u32);
        self.objects.push(object);
        id
    }

    /// Allocate an empty object of type `ty` in the given state.
    ///
    /// Struct fields start out as [`Value::Null`].
    pub fn allocate(&mut self, registry: &TypeRegistry, ty: TypeKey, state: ObjectState) -> Result<ObjectId> {
        let descriptor = registry.get(ty);
        if !descriptor.is_instantiable() {
            return Err(ErrorKind::TypeMismatch {
                expected: "an instantiable struct, list or map type".to_string(),
                found: descriptor.name().to_string(),
            }
            .into());
        }
        let data = match descriptor.kind() {
            TypeKind::List => ObjectData::List(Vec::new()),
            TypeKind::Map => ObjectData::Map(Vec::new()),
            _ => ObjectData::Fields(vec![Value::Null; descriptor.layout().len()]),
        };
        Ok(self.insert(Object { ty, data, state }))
    }

    /// Allocate a complete, empty object of type `ty`.
    pub fn create(&mut self, registry: &TypeRegistry, ty: TypeKey) -> Result<ObjectId> {
        self.allocate(registry, ty, ObjectState::Complete)
    }

    /// Object behind `id`, if it exists.
    pub fn get(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(id.index())
    }

    /// Object behind `id`.
    pub fn object(&self, id: ObjectId) -> Result<&Object> {
        self.get(id).ok_or_else(|| dangling(id))
    }

    /// Mutable object behind `id`.
    pub fn object_mut(&mut self, id: ObjectId) -> Result<&mut Object> {
        self.objects.get_mut(id.index()).ok_or_else(|| dangling(id))
    }

    /// Runtime type of `id`.
    pub fn type_of(&self, id: ObjectId) -> Option<TypeKey> {
        self.get(id).map(|object| object.ty)
    }

    /// Construction state of `id`.
    pub fn state(&self, id: ObjectId) -> Option<ObjectState> {
        self.get(id).map(|object| object.state)
    }

    /// Mark `id` fully constructed.
    pub fn mark_complete(&mut self, id: ObjectId) -> Result<()> {
        self.object_mut(id)?.state = ObjectState::Complete;
        Ok(())
    }

    /// Value of the most derived field called `name`.
    pub fn field(&self, registry: &TypeRegistry, id: ObjectId, name: &str) -> Result<&Value> {
        let object = self.object(id)?;
        let index = field_slot(registry, object.ty, name)?;
        Ok(&fields(object)?[index])
    }

    /// Set the most derived field called `name`.
    pub fn set_field(&mut self, registry: &TypeRegistry, id: ObjectId, name: &str, value: impl Into<Value>) -> Result<()> {
        let ty = self.object(id)?.ty;
        let index = field_slot(registry, ty, name)?;
        self.set_field_at(id, index, value.into())
    }

    /// Field value by layout index.
    pub fn field_at(&self, id: ObjectId, index: usize) -> Result<&Value> {
        let object = self.object(id)?;
        fields(object)?.get(index).ok_or_else(|| no_slot(object.ty, index))
    }

    /// Set a field by layout index.
    pub fn set_field_at(&mut self, id: ObjectId, index: usize, value: Value) -> Result<()> {
        let object = self.object_mut(id)?;
        let ty = object.ty;
        match &mut object.data {
            ObjectData::Fields(values) => {
                let slot = values.get_mut(index).ok_or_else(|| no_slot(ty, index))?;
                *slot = value;
                Ok(())
            }
            _ => Err(shape_mismatch("struct", ty)),
        }
    }

    /// Items of a list object.
    pub fn items(&self, id: ObjectId) -> Result<&[Value]> {
        let object = self.object(id)?;
        match &object.data {
            ObjectData::List(items) => Ok(items),
            _ => Err(shape_mismatch("list", object.ty)),
        }
    }

    /// Append to a list object.
    pub fn push_item(&mut self, id: ObjectId, value: impl Into<Value>) -> Result<()> {
        let object = self.object_mut(id)?;
        let ty = object.ty;
        match &mut object.data {
            ObjectData::List(items) => {
                items.push(value.into());
                Ok(())
            }
            _ => Err(shape_mismatch("list", ty)),
        }
    }

    /// Entries of a map object.
    pub fn entries(&self, id: ObjectId) -> Result<&[(Value, Value)]> {
        let object = self.object(id)?;
        match &object.data {
            ObjectData::Map(entries) => Ok(entries),
            _ => Err(shape_mismatch("map", object.ty)),
        }
    }

    /// Append an entry to a map object.
    pub fn put_entry(&mut self, id: ObjectId, key: impl Into<Value>, value: impl Into<Value>) -> Result<()> {
        let object = self.object_mut(id)?;
        let ty = object.ty;
        match &mut object.data {
            ObjectData::Map(entries) => {
                entries.push((key.into(), value.into()));
                Ok(())
            }
            _ => Err(shape_mismatch("map", ty)),
        }
    }

    /// Structural equivalence of `left` in this graph and `right` in `other`.
    ///
    /// Objects are matched one-to-one: two distinct objects on one side never
    /// correspond to the same object on the other, so sharing and cycles must
    /// be reproduced exactly, not merely unfolded into equal copies.
    pub fn equivalent(&self, left: &Value, other: &Graph, right: &Value) -> bool {
        let mut forward: AHashMap<ObjectId, ObjectId> = AHashMap::new();
        let mut backward: AHashMap<ObjectId, ObjectId> = AHashMap::new();
        let mut pending = vec![(left.clone(), right.clone())];

        while let Some((l, r)) = pending.pop() {
            match (&l, &r) {
                (Value::Ref(a), Value::Ref(b)) => {
                    match (forward.get(a), backward.get(b)) {
                        (Some(mapped), _) if mapped != b => return false,
                        (_, Some(mapped)) if mapped != a => return false,
                        (Some(_), Some(_)) => continue,
                        _ => {}
                    }
                    forward.insert(*a, *b);
                    backward.insert(*b, *a);

                    let (Some(oa), Some(ob)) = (self.get(*a), other.get(*b)) else {
                        return false;
                    };
                    if oa.ty != ob.ty {
                        return false;
                    }
                    match (&oa.data, &ob.data) {
                        (ObjectData::Fields(x), ObjectData::Fields(y))
                        | (ObjectData::List(x), ObjectData::List(y)) => {
                            if x.len() != y.len() {
                                return false;
                            }
                            pending.extend(x.iter().cloned().zip(y.iter().cloned()));
                        }
                        (ObjectData::Map(x), ObjectData::Map(y)) => {
                            if x.len() != y.len() {
                                return false;
                            }
                            for ((xk, xv), (yk, yv)) in x.iter().zip(y.iter()) {
                                pending.push((xk.clone(), yk.clone()));
                                pending.push((xv.clone(), yv.clone()));
                            }
                        }
                        _ => return false,
                    }
                }
                (Value::Float(a), Value::Float(b)) => {
                    if a != b && !(a.is_nan() && b.is_nan()) {
                        return false;
                    }
                }
                _ => {
                    if l != r {
                        return false;
                    }
                }
            }
        }
        true
    }
}

fn fields(object: &Object) -> Result<&[Value]> {
    match &object.data {
        ObjectData::Fields(values) => Ok(values),
        _ => Err(shape_mismatch("struct", object.ty)),
    }
}

fn field_slot(registry: &TypeRegistry, ty: TypeKey, name: &str) -> Result<usize> {
    registry.field_index(ty, name).ok_or_else(|| {
        ErrorKind::UnknownField {
            type_name: registry.name(ty).to_string(),
            field: name.to_string(),
        }
        .into()
    })
}

fn dangling(id: ObjectId) -> crate::error::ConversionError {
    ErrorKind::InvalidValue {
        type_name: "object handle".to_string(),
        value: id.to_string(),
    }
    .into()
}

fn no_slot(ty: TypeKey, index: usize) -> crate::error::ConversionError {
    ErrorKind::TypeMismatch {
        expected: format!("field slot {} of {}", index, ty),
        found: "no such slot".to_string(),
    }
    .into()
}

fn shape_mismatch(expected: &str, ty: TypeKey) -> crate::error::ConversionError {
    ErrorKind::TypeMismatch {
        expected: format!("{} object", expected),
        found: format!("object of type {}", ty),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeDef;

    fn registry() -> TypeRegistry {
        TypeRegistry::builder()
            .register(
                TypeDef::structure("t.Node")
                    .field("label", "trellis.String")
                    .field("next", "t.Node"),
            )
            .build()
            .unwrap()
    }

    fn ring(registry: &TypeRegistry, size: usize) -> (Graph, Value) {
        let node = registry.lookup("t.Node").unwrap();
        let mut graph = Graph::new();
        let ids: Vec<_> = (0..size).map(|_| graph.create(registry, node).unwrap()).collect();
        for (i, id) in ids.iter().enumerate() {
            graph.set_field(registry, *id, "label", format!("n{}", i)).unwrap();
            graph.set_field(registry, *id, "next", ids[(i + 1) % size]).unwrap();
        }
        (graph, Value::Ref(ids[0]))
    }

    #[test]
    fn test_field_access() {
        let registry = registry();
        let (graph, root) = ring(&registry, 2);
        let id = root.as_ref().unwrap();
        assert_eq!(graph.field(&registry, id, "label").unwrap().as_str(), Some("n0"));
        assert!(matches!(
            graph.field(&registry, id, "missing").unwrap_err().kind(),
            ErrorKind::UnknownField { .. }
        ));
        assert!(graph.items(id).is_err());
    }

    #[test]
    fn test_allocate_rejects_primitives() {
        let registry = registry();
        let mut graph = Graph::new();
        assert!(graph.create(&registry, TypeKey::STRING).is_err());
        let list = graph.allocate(&registry, TypeKey::LIST, ObjectState::UnderConstruction).unwrap();
        assert_eq!(graph.state(list), Some(ObjectState::UnderConstruction));
        graph.mark_complete(list).unwrap();
        assert_eq!(graph.state(list), Some(ObjectState::Complete));
    }

    #[test]
    fn test_equivalent_cycles() {
        let registry = registry();
        let (a, ra) = ring(&registry, 3);
        let (b, rb) = ring(&registry, 3);
        assert!(a.equivalent(&ra, &b, &rb));

        let (c, rc) = ring(&registry, 2);
        assert!(!a.equivalent(&ra, &c, &rc));
    }

    #[test]
    fn test_equivalent_distinguishes_sharing_from_copies() {
        let registry = registry();
        let node = registry.lookup("t.Node").unwrap();

        let mut shared = Graph::new();
        let list = shared.create(&registry, TypeKey::LIST).unwrap();
        let item = shared.create(&registry, node).unwrap();
        shared.push_item(list, item).unwrap();
        shared.push_item(list, item).unwrap();

        let mut copied = Graph::new();
        let list2 = copied.create(&registry, TypeKey::LIST).unwrap();
        let first = copied.create(&registry, node).unwrap();
        let second = copied.create(&registry, node).unwrap();
        copied.push_item(list2, first).unwrap();
        copied.push_item(list2, second).unwrap();

        assert!(!shared.equivalent(&Value::Ref(list), &copied, &Value::Ref(list2)));
        assert!(shared.equivalent(&Value::Ref(list), &shared.clone(), &Value::Ref(list)));
    }
}
