//! Synthesized statements and the seams they are registered through.

use std::fmt;
use std::sync::Arc;

use crate::{DefResult, ParamValue, PropertySource};

/// The kind of SQL a statement runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperationKind {
    Create,
    Read,
    Update,
    Delete,
}

impl OperationKind {
    /// The SQL verb, as used in logs.
    pub fn verb(self) -> &'static str {
        match self {
            OperationKind::Create => "INSERT",
            OperationKind::Read => "SELECT",
            OperationKind::Update => "UPDATE",
            OperationKind::Delete => "DELETE",
        }
    }

    /// Only these kinds take a ` where <filter>` suffix.
    pub fn accepts_filter(self) -> bool {
        matches!(self, OperationKind::Update | OperationKind::Delete)
    }
}

/// When a key generator produces the key relative to the INSERT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPhase {
    BeforeInsert,
    AfterInsert,
}

/// Strategy object that populates a new row's primary key.
pub trait KeyGenerator: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;
    fn phase(&self) -> KeyPhase;
}

/// Keys assigned by the database (auto-increment), read back from the driver after insert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeneratedKeys;

impl GeneratedKeys {
    pub const NAME: &'static str = "generatedKeys";
}

impl KeyGenerator for GeneratedKeys {
    fn name(&self) -> &str {
        Self::NAME
    }
    fn phase(&self) -> KeyPhase {
        KeyPhase::AfterInsert
    }
}

/// A named generator that runs a key query, e.g. `select nextval('user_seq')`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectKeyGenerator {
    name: String,
    sql: String,
    phase: KeyPhase,
}

impl SelectKeyGenerator {
    /// A generator whose query runs before the INSERT.
    pub fn new(name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
            phase: KeyPhase::BeforeInsert,
        }
    }

    pub fn after_insert(mut self) -> Self {
        self.phase = KeyPhase::AfterInsert;
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }
}

impl KeyGenerator for SelectKeyGenerator {
    fn name(&self) -> &str {
        &self.name
    }
    fn phase(&self) -> KeyPhase {
        self.phase
    }
}

/// Key generator attached to a create statement, with the key it fills.
#[derive(Debug, Clone)]
pub struct KeyBinding {
    pub generator: Arc<dyn KeyGenerator>,
    pub key_property: String,
    pub key_column: String,
}

impl PartialEq for KeyBinding {
    fn eq(&self, other: &Self) -> bool {
        self.generator.name() == other.generator.name()
            && self.generator.phase() == other.generator.phase()
            && self.key_property == other.key_property
            && self.key_column == other.key_column
    }
}

/// SQL with driver placeholders and the values to bind, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundSql {
    pub sql: String,
    pub parameters: Vec<(String, ParamValue)>,
}

impl BoundSql {
    pub fn values(&self) -> Vec<ParamValue> {
        self.parameters.iter().map(|(_, v)| v.clone()).collect()
    }
}

/// Executable form of a statement's script.
pub trait SqlSource: fmt::Debug + Send + Sync {
    fn bound_sql(&self, params: &dyn PropertySource) -> DefResult<BoundSql>;
}

/// Turns an enveloped script into an executable `SqlSource`.
pub trait LanguageDriver: fmt::Debug + Send + Sync {
    fn create_sql_source(&self, script: &str) -> DefResult<Arc<dyn SqlSource>>;
}

/// A synthesized statement, ready to be registered.
#[derive(Debug, Clone)]
pub struct MappedStatement {
    pub id: String,
    pub kind: OperationKind,
    /// The enveloped script handed to the language driver.
    pub script: String,
    pub sql_source: Arc<dyn SqlSource>,
    pub resource: String,
    pub key: Option<KeyBinding>,
}

impl MappedStatement {
    pub fn bound_sql(&self, params: &dyn PropertySource) -> DefResult<BoundSql> {
        self.sql_source.bound_sql(params)
    }
}

impl PartialEq for MappedStatement {
    // The executable source is derived from `script`, so it is not compared.
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.kind == other.kind
            && self.script == other.script
            && self.resource == other.resource
            && self.key == other.key
    }
}

/// Name of the generator used by IDENTITY keys that do not name one.
pub const DEFAULT_KEY_GENERATOR: &str = "defaultKeyGenerator";

/// Store that receives synthesized statements and owns named key generators.
pub trait StatementCatalog {
    fn is_resource_loaded(&self, resource: &str) -> bool;
    fn add_loaded_resource(&mut self, resource: &str);
    /// Rejects a statement whose id is already registered.
    fn add_statement(&mut self, statement: MappedStatement) -> DefResult<()>;
    fn key_generator(&self, name: &str) -> Option<Arc<dyn KeyGenerator>>;
    fn language_driver(&self) -> Arc<dyn LanguageDriver>;

    fn default_key_generator(&self) -> &str {
        DEFAULT_KEY_GENERATOR
    }
}

impl<C: StatementCatalog + ?Sized> StatementCatalog for &mut C {
    fn is_resource_loaded(&self, resource: &str) -> bool {
        (**self).is_resource_loaded(resource)
    }
    fn add_loaded_resource(&mut self, resource: &str) {
        (**self).add_loaded_resource(resource)
    }
    fn add_statement(&mut self, statement: MappedStatement) -> DefResult<()> {
        (**self).add_statement(statement)
    }
    fn key_generator(&self, name: &str) -> Option<Arc<dyn KeyGenerator>> {
        (**self).key_generator(name)
    }
    fn language_driver(&self) -> Arc<dyn LanguageDriver> {
        (**self).language_driver()
    }
    fn default_key_generator(&self) -> &str {
        (**self).default_key_generator()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Fixed(&'static str);
    impl SqlSource for Fixed {
        fn bound_sql(&self, _params: &dyn PropertySource) -> DefResult<BoundSql> {
            Ok(BoundSql {
                sql: self.0.to_string(),
                parameters: Vec::new(),
            })
        }
    }

    fn statement(key: Option<KeyBinding>) -> MappedStatement {
        MappedStatement {
            id: "app::UserMapper.save".to_string(),
            kind: OperationKind::Create,
            script: "<script> insert into users (name) values (#{name})</script>".to_string(),
            sql_source: Arc::new(Fixed("insert into users (name) values (?)")),
            resource: "app/UserMapper.rs (best guess)".to_string(),
            key,
        }
    }

    #[test]
    fn only_update_and_delete_accept_filters() {
        assert!(OperationKind::Update.accepts_filter());
        assert!(OperationKind::Delete.accepts_filter());
        assert!(!OperationKind::Create.accepts_filter());
        assert!(!OperationKind::Read.accepts_filter());
        assert_eq!(OperationKind::Read.verb(), "SELECT");
    }

    #[test]
    fn key_generators_report_phase() {
        assert_eq!(GeneratedKeys.name(), "generatedKeys");
        assert_eq!(GeneratedKeys.phase(), KeyPhase::AfterInsert);
        let seq = SelectKeyGenerator::new("userSeq", "select nextval('user_seq')");
        assert_eq!(seq.phase(), KeyPhase::BeforeInsert);
        assert_eq!(seq.clone().after_insert().phase(), KeyPhase::AfterInsert);
        assert_eq!(seq.sql(), "select nextval('user_seq')");
    }

    #[test]
    fn statements_compare_on_their_description() {
        let binding = |g: Arc<dyn KeyGenerator>| KeyBinding {
            generator: g,
            key_property: "id".to_string(),
            key_column: "id".to_string(),
        };
        let a = statement(Some(binding(Arc::new(GeneratedKeys))));
        let b = statement(Some(binding(Arc::new(GeneratedKeys))));
        assert_eq!(a, b);
        let c = statement(Some(binding(Arc::new(SelectKeyGenerator::new("s", "x")))));
        assert_ne!(a, c);
        assert_ne!(a, statement(None));
        let bound = a.bound_sql(&[("name", ParamValue::Null)]).unwrap();
        assert_eq!(bound.sql, "insert into users (name) values (?)");
        assert!(bound.values().is_empty());
    }
}
