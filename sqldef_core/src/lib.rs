#![forbid(unsafe_code)]
//! Core types for the sqldef statement synthesis library.
//! This crate holds the data model shared by the macros, the templates and the facade. It knows
//! nothing about how SQL is rendered or where statements end up.

use std::collections::{BTreeMap, HashMap};

pub mod declaration;
pub mod marker;
pub mod persistence;
pub mod statement;

pub use declaration::{GenericBinding, InterfaceDecl, MapperDefinition, MethodDecl, ParamType};
pub use marker::{
    CreateDefinition, DeleteDefinition, Marker, MarkerType, ReadDefinition, UpdateDefinition,
    DEFAULT_FILTER,
};
pub use statement::{
    BoundSql, GeneratedKeys, KeyBinding, KeyGenerator, KeyPhase, LanguageDriver, MappedStatement,
    OperationKind, SelectKeyGenerator, SqlSource, StatementCatalog, DEFAULT_KEY_GENERATOR,
};

/// Compile-time persistence metadata for an entity type.
/// Implemented via `#[derive(Entity)]` in `sqldef_macros`.
pub trait Entity {
    const TABLE: &'static str;
    /// Persisted fields in declaration order. Skipped fields are not listed.
    const FIELDS: &'static [FieldMeta];
}

/// Primary-key generation strategy declared on a key field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationType {
    /// The database assigns the key (auto-increment); read back after insert.
    Auto,
    /// A named key generator registered in the statement catalog supplies the key.
    Identity,
}

/// `#[generated_value(...)]` as declared on a key field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeneratedValue {
    pub strategy: GenerationType,
    /// Generator name; empty means the catalog default.
    pub generator: &'static str,
}

/// One persisted field of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldMeta {
    /// Rust field name, used as the binding name in `#{...}`.
    pub property: &'static str,
    pub column: &'static str,
    pub id: bool,
    pub generated: Option<GeneratedValue>,
}

impl FieldMeta {
    /// A plain, non-key field whose column matches its property name.
    pub const fn new(property: &'static str) -> Self {
        Self {
            property,
            column: property,
            id: false,
            generated: None,
        }
    }

    pub const fn column(mut self, column: &'static str) -> Self {
        self.column = column;
        self
    }

    pub const fn id(mut self) -> Self {
        self.id = true;
        self
    }

    pub const fn generated(mut self, strategy: GenerationType, generator: &'static str) -> Self {
        self.generated = Some(GeneratedValue {
            strategy,
            generator,
        });
        self
    }
}

/// Runtime handle on an entity's metadata, detached from the Rust type itself.
///
/// Two handles are equal when they describe the same Rust type.
#[derive(Debug, Clone, Copy)]
pub struct EntityType {
    name: &'static str,
    table: &'static str,
    fields: &'static [FieldMeta],
}

impl EntityType {
    pub fn of<E: Entity + ?Sized>() -> Self {
        Self {
            name: std::any::type_name::<E>(),
            table: E::TABLE,
            fields: E::FIELDS,
        }
    }

    /// Fully qualified Rust type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    pub fn fields(&self) -> &'static [FieldMeta] {
        self.fields
    }
}

impl PartialEq for EntityType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for EntityType {}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

/// A backend-agnostic representation of a bound parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    String(String),
    I32(i32),
    I64(i64),
    F64(f64),
    Bool(bool),
    Null,
}

impl ParamValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ParamValue::Null)
    }
}

/// Read access to named property values, used when a statement is bound.
/// Implemented via `#[derive(Entity)]` for entities.
pub trait PropertySource {
    /// `None` when the property does not exist; `Some(ParamValue::Null)` when it is unset.
    fn property(&self, name: &str) -> Option<ParamValue>;
}

impl PropertySource for HashMap<String, ParamValue> {
    fn property(&self, name: &str) -> Option<ParamValue> {
        self.get(name).cloned()
    }
}

impl PropertySource for BTreeMap<String, ParamValue> {
    fn property(&self, name: &str) -> Option<ParamValue> {
        self.get(name).cloned()
    }
}

impl PropertySource for [(&str, ParamValue)] {
    fn property(&self, name: &str) -> Option<ParamValue> {
        self.iter().find(|(k, _)| *k == name).map(|(_, v)| v.clone())
    }
}

impl<const N: usize> PropertySource for [(&str, ParamValue); N] {
    fn property(&self, name: &str) -> Option<ParamValue> {
        self.as_slice().property(name)
    }
}

/// Errors raised while synthesizing, registering or binding statements.
#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    #[error("no definition marker recognized on {statement}")]
    NoDefinitionMarker { statement: String },
    #[error("no adaptor registered for marker {marker}")]
    AdaptorNotFound { marker: &'static str },
    #[error("adaptor for {adaptor} cannot handle marker {marker}")]
    MarkerMismatch {
        marker: &'static str,
        adaptor: &'static str,
    },
    #[error("{statement} has no parameter to infer the entity type from")]
    MissingEntityParameter { statement: String },
    #[error("type variable {variable} is not bound by any generic interface of {interface}")]
    UnresolvedTypeVariable { interface: String, variable: String },
    #[error("entity {entity} declares no primary key field")]
    MissingPrimaryKey { entity: &'static str },
    #[error("no {kind:?} template registered (selective: {selective})")]
    TemplateNotFound {
        kind: OperationKind,
        selective: bool,
    },
    #[error("can not find {name} in configuration")]
    MissingKeyGenerator { name: String },
    #[error("statement {id} is already registered")]
    DuplicateStatement { id: String },
    #[error("unknown property {name}")]
    UnknownProperty { name: String },
    #[error("script error: {message}")]
    Script { message: String },
}

impl DefinitionError {
    /// Build a scripting error from anything displayable.
    pub fn script(message: impl std::fmt::Display) -> Self {
        DefinitionError::Script {
            message: message.to_string(),
        }
    }

    /// True for errors that point at a deployment or configuration mistake rather than a
    /// malformed declaration.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            DefinitionError::MissingKeyGenerator { .. }
                | DefinitionError::NoDefinitionMarker { .. }
                | DefinitionError::AdaptorNotFound { .. }
                | DefinitionError::TemplateNotFound { .. }
        )
    }
}

/// Convenience alias for results returned across the workspace.
pub type DefResult<T> = Result<T, DefinitionError>;
