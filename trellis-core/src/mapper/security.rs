//! Permission gate between serialized names and types

use std::sync::Arc;

use tracing::debug;

use super::Mapper;
use crate::error::{ErrorKind, Result};
use crate::security::{self, TypePermission, Verdict};
use crate::types::{TypeKey, TypeRegistry};

/// Rejects resolved types the permissions do not allow.
///
/// Sits outside every aliasing and defaulting layer, so the check applies to
/// the final type whichever name led to it.
pub struct SecurityMapper {
    inner: Box<dyn Mapper>,
    permissions: Vec<Arc<dyn TypePermission>>,
}

impl SecurityMapper {
    /// Wrap `inner` with `permissions`, oldest first.
    pub fn new(inner: Box<dyn Mapper>, permissions: Vec<Arc<dyn TypePermission>>) -> Self {
        Self { inner, permissions }
    }

    /// Fail with `ForbiddenType` unless `ty` is allowed.
    pub fn check(&self, ty: TypeKey) -> Result<()> {
        match security::evaluate(&self.permissions, ty, self.registry()) {
            Verdict::Allow => Ok(()),
            _ => {
                let type_name = self.registry().name(ty).to_string();
                debug!(type_name = %type_name, "type rejected by permissions");
                Err(ErrorKind::ForbiddenType { type_name }.into())
            }
        }
    }
}

impl Mapper for SecurityMapper {
    fn wrapped(&self) -> Option<&dyn Mapper> {
        Some(self.inner.as_ref())
    }

    fn registry(&self) -> &TypeRegistry {
        self.inner.registry()
    }

    fn real_class(&self, name: &str) -> Result<TypeKey> {
        let ty = self.inner.real_class(name)?;
        self.check(ty)?;
        Ok(ty)
    }
}
