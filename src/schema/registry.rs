//! # Schema Registry
//!
//! Process-wide cache of [`EntitySchema`] descriptors keyed by entity type. Descriptors are
//! built lazily on first use and never mutated afterwards; concurrent first use of the same
//! type still builds the descriptor exactly once.

use dashmap::DashMap;
use std::any::TypeId;
use std::sync::Arc;
use tracing::debug;

use super::{Entity, EntitySchema};

/// Lazily populated, read-only-after-build schema cache
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: DashMap<TypeId, Arc<EntitySchema>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Descriptor for `E`, building it on first use
    pub fn schema_for<E: Entity>(&self) -> Arc<EntitySchema> {
        let key = TypeId::of::<E>();
        if let Some(schema) = self.schemas.get(&key) {
            return Arc::clone(schema.value());
        }

        // The entry guard holds the shard lock, so a racing caller waits for this build
        let entry = self.schemas.entry(key).or_insert_with(|| {
            let schema = E::describe();
            debug!(
                entity = E::NAME,
                table = schema.table(),
                fields = schema.fields().len(),
                "Built entity schema"
            );
            Arc::new(schema)
        });
        Arc::clone(entry.value())
    }

    /// Eagerly build the descriptor for `E` (e.g. at startup)
    pub fn register<E: Entity>(&self) -> Arc<EntitySchema> {
        self.schema_for::<E>()
    }

    /// Look up an already-built descriptor by entity name
    pub fn by_name(&self, entity: &str) -> Option<Arc<EntitySchema>> {
        self.schemas
            .iter()
            .find(|schema| schema.entity() == entity)
            .map(|schema| Arc::clone(schema.value()))
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
