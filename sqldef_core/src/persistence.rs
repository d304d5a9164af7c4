//! Metadata lookups over `EntityType`.

use crate::{DefResult, DefinitionError, EntityType, FieldMeta, GenerationType};

/// The entity's primary-key field.
pub fn id_field(entity: &EntityType) -> DefResult<&'static FieldMeta> {
    entity
        .fields()
        .iter()
        .find(|f| f.id)
        .ok_or(DefinitionError::MissingPrimaryKey {
            entity: entity.name(),
        })
}

pub fn column_name(field: &FieldMeta) -> &'static str {
    field.column
}

/// Fields that take part in an INSERT. The key is left out only when the database assigns it.
pub fn insert_fields(entity: &EntityType) -> impl Iterator<Item = &'static FieldMeta> {
    entity.fields().iter().filter(|f| !is_database_generated(f))
}

/// Fields written by an UPDATE's SET clause; the key is never rewritten.
pub fn update_fields(entity: &EntityType) -> impl Iterator<Item = &'static FieldMeta> {
    entity.fields().iter().filter(|f| !f.id)
}

fn is_database_generated(field: &FieldMeta) -> bool {
    field.id
        && field
            .generated
            .is_some_and(|g| g.strategy == GenerationType::Auto)
}
