//! Converters
//!
//! A converter turns values of the types it accepts into stream content and
//! back. Converters are stateless and registered with a priority in a
//! [`ConverterLookup`]; the lookup picks the highest-priority converter whose
//! [`can_convert`](Converter::can_convert) accepts a type, newest first among
//! equals.
//!
//! A converter always works on the node its caller opened: `marshal` may add
//! attributes, a value or child nodes to it, and `unmarshal` reads the
//! current node and must leave the reader positioned on it.

use std::fmt;
use std::sync::Arc;

use crate::context::{MarshallingContext, UnmarshallingContext};
use crate::error::{ErrorKind, Result};
use crate::types::{TypeKey, TypeRegistry};
use crate::value::Value;

mod basic;
mod collection;
mod lookup;
mod prioritized;
mod reflection;

pub use basic::{BoolConverter, CharConverter, EnumConverter, FloatConverter, IntConverter, NullConverter, StringConverter};
pub use collection::{CollectionConverter, MapConverter};
pub use lookup::ConverterLookup;
pub use prioritized::PrioritizedList;
pub use reflection::ReflectionConverter;

/// Registration priorities.
///
/// Any `i32` is a valid priority; these are the conventional levels.
pub struct Priority;

impl Priority {
    /// Converters that must win over everything, such as the null converter
    pub const VERY_HIGH: i32 = 10000;
    /// Default for user converters
    pub const NORMAL: i32 = 0;
    /// Generic converters for broad type families
    pub const LOW: i32 = -10;
    /// Catch-all converters
    pub const VERY_LOW: i32 = -20;
}

/// Register the converters for null, primitives, enums, lists, maps and
/// structs at their conventional priorities.
pub fn register_builtin_converters(lookup: &mut ConverterLookup) {
    lookup.register(Arc::new(NullConverter), Priority::VERY_HIGH);
    lookup.register(Arc::new(SingleValueConverterWrapper::new(BoolConverter)), Priority::NORMAL);
    lookup.register(Arc::new(SingleValueConverterWrapper::new(IntConverter)), Priority::NORMAL);
    lookup.register(Arc::new(SingleValueConverterWrapper::new(FloatConverter)), Priority::NORMAL);
    lookup.register(Arc::new(SingleValueConverterWrapper::new(CharConverter)), Priority::NORMAL);
    lookup.register(Arc::new(SingleValueConverterWrapper::new(StringConverter)), Priority::NORMAL);
    lookup.register(Arc::new(SingleValueConverterWrapper::new(EnumConverter)), Priority::NORMAL);
    lookup.register(Arc::new(CollectionConverter), Priority::NORMAL);
    lookup.register(Arc::new(MapConverter), Priority::NORMAL);
    lookup.register(Arc::new(ReflectionConverter), Priority::VERY_LOW);
}

/// Strategy converting values of some types to and from stream content.
pub trait Converter: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Whether values of `ty` are handled by this converter.
    fn can_convert(&self, ty: TypeKey, registry: &TypeRegistry) -> bool;

    /// Write `value` into the current node.
    fn marshal(&self, value: &Value, ctx: &mut MarshallingContext<'_>) -> Result<()>;

    /// Read a value of [`UnmarshallingContext::required_type`] from the current node.
    fn unmarshal(&self, ctx: &mut UnmarshallingContext<'_>) -> Result<Value>;

    /// Text form of this converter, if its values fit in a single string.
    fn as_single_value(&self) -> Option<&dyn SingleValueConverter> {
        None
    }
}

/// Converter for values with a plain text representation.
///
/// Only types with a single-value converter can be placed in attributes.
pub trait SingleValueConverter: Send + Sync {
    /// Whether values of `ty` are handled by this converter.
    fn can_convert(&self, ty: TypeKey, registry: &TypeRegistry) -> bool;

    /// Text form of `value`.
    fn to_text(&self, value: &Value) -> Result<String>;

    /// Parse `text` as a value of `ty`.
    fn from_text(&self, text: &str, ty: TypeKey, registry: &TypeRegistry) -> Result<Value>;
}

/// Adapts a [`SingleValueConverter`] to the node-level [`Converter`] contract
/// by reading and writing the node's value.
pub struct SingleValueConverterWrapper<S> {
    inner: S,
}

impl<S: SingleValueConverter> SingleValueConverterWrapper<S> {
    /// Wrap `inner`.
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    /// The wrapped converter.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S> fmt::Debug for SingleValueConverterWrapper<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingleValueConverterWrapper")
            .field("inner", &std::any::type_name::<S>())
            .finish()
    }
}

impl<S: SingleValueConverter> Converter for SingleValueConverterWrapper<S> {
    fn name(&self) -> &str {
        std::any::type_name::<S>()
    }

    fn can_convert(&self, ty: TypeKey, registry: &TypeRegistry) -> bool {
        self.inner.can_convert(ty, registry)
    }

    fn marshal(&self, value: &Value, ctx: &mut MarshallingContext<'_>) -> Result<()> {
        let text = self.inner.to_text(value)?;
        ctx.writer().set_value(&text)?;
        Ok(())
    }

    fn unmarshal(&self, ctx: &mut UnmarshallingContext<'_>) -> Result<Value> {
        let text = ctx.reader().value().into_owned();
        self.inner.from_text(&text, ctx.required_type(), ctx.registry())
    }

    fn as_single_value(&self) -> Option<&dyn SingleValueConverter> {
        Some(&self.inner)
    }
}

pub(crate) fn unexpected_value(expected: &str, value: &Value) -> crate::error::ConversionError {
    ErrorKind::TypeMismatch {
        expected: expected.to_string(),
        found: format!("{:?}", value),
    }
    .into()
}
