//! In-memory statement catalog.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use sqldef_core::{
    DefResult, DefinitionError, KeyGenerator, LanguageDriver, MappedStatement, StatementCatalog,
    DEFAULT_KEY_GENERATOR,
};
use sqldef_templates::{Placeholder, XmlLanguageDriver};

/// Runtime settings of a `Configuration`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Placeholder style of the default language driver.
    pub placeholder: Placeholder,
    /// Generator used by IDENTITY keys that do not name one.
    pub default_key_generator: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            placeholder: Placeholder::from_features(),
            default_key_generator: DEFAULT_KEY_GENERATOR.to_string(),
        }
    }
}

/// Holds registered statements, loaded resources and named key generators.
#[derive(Debug)]
pub struct Configuration {
    settings: Settings,
    language_driver: Arc<dyn LanguageDriver>,
    loaded_resources: HashSet<String>,
    statements: BTreeMap<String, MappedStatement>,
    key_generators: HashMap<String, Arc<dyn KeyGenerator>>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl Configuration {
    pub fn new(settings: Settings) -> Self {
        Self {
            language_driver: Arc::new(XmlLanguageDriver::new(settings.placeholder)),
            settings,
            loaded_resources: HashSet::new(),
            statements: BTreeMap::new(),
            key_generators: HashMap::new(),
        }
    }

    /// Replace the language driver used for new statements.
    pub fn with_language_driver(mut self, driver: Arc<dyn LanguageDriver>) -> Self {
        self.language_driver = driver;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Register a key generator under its own name, replacing any previous one.
    pub fn add_key_generator(&mut self, generator: impl KeyGenerator + 'static) {
        let generator: Arc<dyn KeyGenerator> = Arc::new(generator);
        self.key_generators
            .insert(generator.name().to_string(), generator);
    }

    pub fn statement(&self, id: &str) -> Option<&MappedStatement> {
        self.statements.get(id)
    }

    pub fn has_statement(&self, id: &str) -> bool {
        self.statements.contains_key(id)
    }

    /// Registered statements, ordered by id.
    pub fn statements(&self) -> impl Iterator<Item = &MappedStatement> {
        self.statements.values()
    }

    pub fn loaded_resources(&self) -> impl Iterator<Item = &str> {
        self.loaded_resources.iter().map(String::as_str)
    }
}

impl StatementCatalog for Configuration {
    fn is_resource_loaded(&self, resource: &str) -> bool {
        self.loaded_resources.contains(resource)
    }

    fn add_loaded_resource(&mut self, resource: &str) {
        self.loaded_resources.insert(resource.to_string());
    }

    fn add_statement(&mut self, statement: MappedStatement) -> DefResult<()> {
        if self.statements.contains_key(&statement.id) {
            return Err(DefinitionError::DuplicateStatement { id: statement.id });
        }
        self.statements.insert(statement.id.clone(), statement);
        Ok(())
    }

    fn key_generator(&self, name: &str) -> Option<Arc<dyn KeyGenerator>> {
        self.key_generators.get(name).cloned()
    }

    fn language_driver(&self) -> Arc<dyn LanguageDriver> {
        Arc::clone(&self.language_driver)
    }

    fn default_key_generator(&self) -> &str {
        &self.settings.default_key_generator
    }
}
