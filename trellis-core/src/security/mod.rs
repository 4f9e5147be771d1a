//! Type permissions
//!
//! Before a name read from a stream becomes a type, the security layer of the
//! mapper chain asks the configured permissions about it. Permissions are
//! consulted newest first; the first one that allows or denies decides. A type
//! no permission speaks for is forbidden.

use std::fmt;
use std::sync::Arc;

use ahash::AHashSet;

use crate::types::{TypeKey, TypeKind, TypeRegistry};

mod wildcard;

pub use wildcard::WildcardTypePermission;

/// Answer of a permission about one type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The type may be instantiated
    Allow,
    /// The type must not be instantiated
    Deny,
    /// No opinion; ask the next permission
    Abstain,
}

/// Rule deciding which types may be created from stream content.
pub trait TypePermission: Send + Sync + fmt::Debug {
    /// Verdict for `ty`.
    fn verdict(&self, ty: TypeKey, registry: &TypeRegistry) -> Verdict;
}

impl<P: TypePermission + ?Sized> TypePermission for Arc<P> {
    fn verdict(&self, ty: TypeKey, registry: &TypeRegistry) -> Verdict {
        (**self).verdict(ty, registry)
    }
}

/// Evaluate `permissions` newest first.
pub fn evaluate(permissions: &[Arc<dyn TypePermission>], ty: TypeKey, registry: &TypeRegistry) -> Verdict {
    permissions
        .iter()
        .rev()
        .map(|permission| permission.verdict(ty, registry))
        .find(|verdict| *verdict != Verdict::Abstain)
        .unwrap_or(Verdict::Deny)
}

/// Allows every type.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyTypePermission;

impl TypePermission for AnyTypePermission {
    fn verdict(&self, _ty: TypeKey, _registry: &TypeRegistry) -> Verdict {
        Verdict::Allow
    }
}

/// Denies every type. Added last, it overrides everything added before.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTypePermission;

impl TypePermission for NoTypePermission {
    fn verdict(&self, _ty: TypeKey, _registry: &TypeRegistry) -> Verdict {
        Verdict::Deny
    }
}

/// Allows the null type.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPermission;

impl TypePermission for NullPermission {
    fn verdict(&self, ty: TypeKey, _registry: &TypeRegistry) -> Verdict {
        if ty == TypeKey::NULL {
            Verdict::Allow
        } else {
            Verdict::Abstain
        }
    }
}

/// Allows primitive types, strings included.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrimitiveTypePermission;

impl TypePermission for PrimitiveTypePermission {
    fn verdict(&self, ty: TypeKey, registry: &TypeRegistry) -> Verdict {
        match registry.get(ty).kind() {
            TypeKind::Primitive(_) => Verdict::Allow,
            _ => Verdict::Abstain,
        }
    }
}

/// Allows types listed by canonical name.
#[derive(Debug, Clone, Default)]
pub struct ExplicitTypePermission {
    names: AHashSet<String>,
}

impl ExplicitTypePermission {
    /// Permission for the given canonical names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl TypePermission for ExplicitTypePermission {
    fn verdict(&self, ty: TypeKey, registry: &TypeRegistry) -> Verdict {
        if self.names.contains(registry.name(ty)) {
            Verdict::Allow
        } else {
            Verdict::Abstain
        }
    }
}

/// Allows a type and everything assignable to it.
#[derive(Debug, Clone)]
pub struct TypeHierarchyPermission {
    root: String,
}

impl TypeHierarchyPermission {
    /// Permission for `root` (canonical name) and its subtypes.
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }
}

impl TypePermission for TypeHierarchyPermission {
    fn verdict(&self, ty: TypeKey, registry: &TypeRegistry) -> Verdict {
        match registry.lookup(&self.root) {
            Some(root) if registry.is_assignable(ty, root) => Verdict::Allow,
            _ => Verdict::Abstain,
        }
    }
}

/// Turns the allow verdicts of `P` into denials.
#[derive(Debug, Clone)]
pub struct Denied<P>(pub P);

impl<P: TypePermission> TypePermission for Denied<P> {
    fn verdict(&self, ty: TypeKey, registry: &TypeRegistry) -> Verdict {
        match self.0.verdict(ty, registry) {
            Verdict::Allow => Verdict::Deny,
            _ => Verdict::Abstain,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeDef;

    fn registry() -> TypeRegistry {
        TypeRegistry::builder()
            .register(TypeDef::structure("acme.Animal"))
            .register(TypeDef::structure("acme.Dog").extends("acme.Animal"))
            .register(TypeDef::structure("evil.Gadget"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_nothing_configured_denies() {
        let registry = registry();
        assert_eq!(evaluate(&[], TypeKey::STRING, &registry), Verdict::Deny);
    }

    #[test]
    fn test_newest_decides() {
        let registry = registry();
        let dog = registry.lookup("acme.Dog").unwrap();
        let mut permissions: Vec<Arc<dyn TypePermission>> = vec![Arc::new(AnyTypePermission)];
        assert_eq!(evaluate(&permissions, dog, &registry), Verdict::Allow);

        permissions.push(Arc::new(Denied(TypeHierarchyPermission::new("acme.Animal"))));
        assert_eq!(evaluate(&permissions, dog, &registry), Verdict::Deny);
        assert_eq!(evaluate(&permissions, TypeKey::INT, &registry), Verdict::Allow);

        permissions.push(Arc::new(ExplicitTypePermission::new(["acme.Dog"])));
        assert_eq!(evaluate(&permissions, dog, &registry), Verdict::Allow);

        permissions.push(Arc::new(NoTypePermission));
        assert_eq!(evaluate(&permissions, dog, &registry), Verdict::Deny);
    }

    #[test]
    fn test_builtin_permissions() {
        let registry = registry();
        let gadget = registry.lookup("evil.Gadget").unwrap();
        let permissions: Vec<Arc<dyn TypePermission>> = vec![
            Arc::new(NullPermission),
            Arc::new(PrimitiveTypePermission),
            Arc::new(TypeHierarchyPermission::new("acme.Animal")),
        ];
        assert_eq!(evaluate(&permissions, TypeKey::NULL, &registry), Verdict::Allow);
        assert_eq!(evaluate(&permissions, TypeKey::CHAR, &registry), Verdict::Allow);
        assert_eq!(evaluate(&permissions, TypeKey::LIST, &registry), Verdict::Deny);
        assert_eq!(
            evaluate(&permissions, registry.lookup("acme.Dog").unwrap(), &registry),
            Verdict::Allow
        );
        assert_eq!(evaluate(&permissions, gadget, &registry), Verdict::Deny);
    }
}
