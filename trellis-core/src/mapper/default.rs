//! Base layer of every mapper chain

use std::sync::Arc;

use super::Mapper;
use crate::types::TypeRegistry;

/// Innermost mapper: canonical names, no aliases, no attributes.
#[derive(Debug, Clone)]
pub struct DefaultMapper {
    registry: Arc<TypeRegistry>,
}

impl DefaultMapper {
    /// Base mapper answering from `registry`.
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self { registry }
    }
}

impl Mapper for DefaultMapper {
    fn wrapped(&self) -> Option<&dyn Mapper> {
        None
    }

    fn registry(&self) -> &TypeRegistry {
        &self.registry
    }
}
