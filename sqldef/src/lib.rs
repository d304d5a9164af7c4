#![forbid(unsafe_code)]
//! Facade crate for the `sqldef` statement synthesis library.
//!
//! Mapper traits declare *what* each method does with markers; `sqldef` derives the SQL from the
//! entity's metadata and registers one statement per marked method in a catalog. This crate
//! re-exports the core types, the macros and the templates so an application only needs this
//! dependency (plus `sqldef_core`, which macro expansions refer to).
//!
//! # Example
//!
//! ```ignore
//! use sqldef::{mapper, Configuration, DefinitionStatementFactory, Entity, MapperRegistry};
//!
//! #[derive(Entity)]
//! pub struct User {
//!     #[persist(id)]
//!     #[generated_value(strategy = "auto")]
//!     pub id: Option<i64>,
//!     #[persist(column = "email_address")]
//!     pub email: String,
//! }
//!
//! #[mapper]
//! pub trait BaseMapper<T> {
//!     #[create]
//!     fn save(&self, entity: &T);
//!     #[update]
//!     fn update(&self, entity: &T);
//! }
//!
//! #[mapper]
//! pub trait UserMapper: BaseMapper<User> {
//!     #[delete(filter = "email_address = #{email}")]
//!     fn delete_by_email(&self, user: &User);
//! }
//!
//! let mut registry = MapperRegistry::new(DefinitionStatementFactory::new(Configuration::default()));
//! registry.add_mapper::<UserMapperDefinition>()?;
//! let config = registry.into_catalog();
//! // `<module>::UserMapper.save`, `.update` and `.delete_by_email` are now registered.
//! ```

pub mod bindings;
pub mod bootstrap;
pub mod configuration;
pub mod definition;
pub mod engine;

// Re-export the core data model.
pub use sqldef_core::{
    persistence, BoundSql, CreateDefinition, DefResult, DefinitionError, DeleteDefinition, Entity,
    EntityType, FieldMeta, GeneratedKeys, GeneratedValue, GenerationType, GenericBinding,
    InterfaceDecl, KeyBinding, KeyGenerator, KeyPhase, LanguageDriver, MappedStatement,
    MapperDefinition, Marker, MarkerType, MethodDecl, OperationKind, ParamType, ParamValue,
    PropertySource, ReadDefinition, SelectKeyGenerator, SqlSource, StatementCatalog,
    UpdateDefinition, DEFAULT_FILTER, DEFAULT_KEY_GENERATOR,
};

// Re-export the procedural macros. The `Entity` derive lives in the macro namespace, next to
// the trait of the same name.
pub use sqldef_macros::{mapper, Entity};

pub use sqldef_templates::{
    builtin, DeleteTemplate, InsertSelectiveTemplate, InsertTemplate, Placeholder, SelectTemplate,
    SqlTemplate, TemplateCatalog, UpdateSelectiveTemplate, UpdateTemplate, XmlLanguageDriver,
};

pub use bindings::TypeBindings;
pub use bootstrap::MapperRegistry;
pub use configuration::{Configuration, Settings};
pub use definition::{
    AdaptorRegistry, AnnotationAdaptor, AnnotationProperty, CreateDefinitionAdaptor,
    DeleteDefinitionAdaptor, ReadDefinitionAdaptor, UpdateDefinitionAdaptor,
};
pub use engine::{DefinitionStatementFactory, StatementFactory};
