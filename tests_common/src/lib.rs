//! Shared fixtures for integration tests: entities covering every key strategy, mapper traits
//! declared through `#[mapper]`, and catalogs to register them into.

use std::sync::Arc;

use sqldef::{
    mapper, Configuration, DefResult, Entity, KeyGenerator, LanguageDriver, MappedStatement,
    SelectKeyGenerator, StatementCatalog,
};

/// Database-assigned key.
#[derive(Entity, Clone, Debug, PartialEq)]
#[entity(table = "users")]
pub struct User {
    #[persist(id)]
    #[generated_value(strategy = "auto")]
    pub id: Option<i64>,
    #[persist(column = "email_address")]
    pub email: String,
    #[persist(column = "full_name")]
    pub name: Option<String>,
    pub active: bool,
}

/// Key from a named sequence.
#[derive(Entity, Clone, Debug, PartialEq)]
pub struct Account {
    #[persist(id)]
    #[generated_value(strategy = "identity", generator = "accountSeq")]
    pub id: Option<i64>,
    pub owner: String,
    pub balance: f64,
}

/// Key from the catalog's default generator.
#[derive(Entity, Clone, Debug, PartialEq)]
pub struct Tag {
    #[persist(id)]
    #[generated_value(strategy = "identity")]
    pub id: Option<i64>,
    pub label: String,
}

/// Key assigned by the application.
#[derive(Entity, Clone, Debug, PartialEq)]
pub struct Note {
    #[persist(id, column = "note_id")]
    pub id: i64,
    pub body: String,
    #[persist(skip)]
    pub cached: Vec<u8>,
}

impl User {
    pub fn new(email: &str) -> Self {
        Self {
            id: None,
            email: email.to_string(),
            name: None,
            active: true,
        }
    }
}

#[mapper]
pub trait BaseMapper<T> {
    #[create]
    fn save(&self, entity: &T);
    #[create(selective)]
    fn save_selective(&self, entity: &T);
    #[read]
    fn find_all(&self, probe: &T) -> Vec<T>;
    #[update]
    fn update(&self, entity: &T);
    #[update(selective)]
    fn update_selective(&self, entity: &T);
    #[delete]
    fn delete(&self, entity: &T);
}

#[mapper]
pub trait UserMapper: BaseMapper<User> + Send + Sync {
    #[update(filter = "email_address = #{email}")]
    fn update_by_email(&self, user: &User);
    #[delete(filter = "")]
    fn delete_all(&self, user: &User);
    #[create]
    fn save_batch(&self, users: Vec<User>);
    fn count(&self) -> i64;
}

#[mapper]
pub trait AccountMapper: BaseMapper<Account> {}

#[mapper]
pub trait TagMapper: BaseMapper<Tag> {}

#[mapper]
pub trait NoteMapper: BaseMapper<Note> {
    #[read]
    fn find_by_note(&self, note: &Note) -> Option<Note>;
}

/// Generic mapper forwarding its parameter to `BaseMapper`.
#[mapper]
pub trait CrudMapper<E>: BaseMapper<E> {
    #[delete(filter = "owner = #{owner}")]
    fn delete_by_owner(&self, entity: &E);
}

#[mapper]
pub trait LedgerMapper: CrudMapper<Account> {}

/// Leaves `BaseMapper`'s parameter unbound.
#[mapper]
pub trait OpenMapper<X>: BaseMapper<X> {}

/// Generator names the fixtures rely on.
pub const ACCOUNT_SEQ: &str = "accountSeq";

/// A configuration with generators for `Account` and `Tag` registered.
pub fn sequenced_configuration() -> Configuration {
    let mut config = Configuration::default();
    config.add_key_generator(SelectKeyGenerator::new(
        ACCOUNT_SEQ,
        "select nextval('account_seq')",
    ));
    config.add_key_generator(SelectKeyGenerator::new(
        sqldef::DEFAULT_KEY_GENERATOR,
        "select nextval('global_seq')",
    ));
    config
}

/// Configuration wrapper counting catalog calls.
#[derive(Debug, Default)]
pub struct RecordingCatalog {
    pub inner: Configuration,
    pub resource_marks: Vec<String>,
    pub statement_ids: Vec<String>,
}

impl RecordingCatalog {
    pub fn new(inner: Configuration) -> Self {
        Self {
            inner,
            resource_marks: Vec::new(),
            statement_ids: Vec::new(),
        }
    }
}

impl StatementCatalog for RecordingCatalog {
    fn is_resource_loaded(&self, resource: &str) -> bool {
        self.inner.is_resource_loaded(resource)
    }

    fn add_loaded_resource(&mut self, resource: &str) {
        self.resource_marks.push(resource.to_string());
        self.inner.add_loaded_resource(resource);
    }

    fn add_statement(&mut self, statement: MappedStatement) -> DefResult<()> {
        let id = statement.id.clone();
        self.inner.add_statement(statement)?;
        self.statement_ids.push(id);
        Ok(())
    }

    fn key_generator(&self, name: &str) -> Option<Arc<dyn KeyGenerator>> {
        self.inner.key_generator(name)
    }

    fn language_driver(&self) -> Arc<dyn LanguageDriver> {
        self.inner.language_driver()
    }

    fn default_key_generator(&self) -> &str {
        self.inner.default_key_generator()
    }
}
