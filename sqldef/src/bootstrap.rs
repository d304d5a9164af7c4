//! Registers whole mapper traits with a statement factory.

use std::collections::HashSet;

use sqldef_core::{DefResult, InterfaceDecl, MapperDefinition, StatementCatalog};

#[cfg(feature = "tracing")]
use tracing::info;

use crate::engine::{DefinitionStatementFactory, StatementFactory};

/// Walks mapper declarations and synthesizes a statement for every marked method.
///
/// ```ignore
/// let mut registry = MapperRegistry::new(DefinitionStatementFactory::new(Configuration::default()));
/// registry.add_mapper::<UserMapperDefinition>()?;
/// let config = registry.into_catalog();
/// ```
#[derive(Debug)]
pub struct MapperRegistry<C> {
    factory: DefinitionStatementFactory<C>,
    known: HashSet<String>,
}

impl<C: StatementCatalog> MapperRegistry<C> {
    pub fn new(factory: DefinitionStatementFactory<C>) -> Self {
        Self {
            factory,
            known: HashSet::new(),
        }
    }

    /// Register the mapper `D` describes. Returns the number of statements added.
    pub fn add_mapper<D: MapperDefinition>(&mut self) -> DefResult<usize> {
        self.add_interface(&D::interface())
    }

    /// Synthesize declared and inherited marked methods of `mapper`. Methods without a
    /// recognized marker are skipped; an interface already registered adds nothing. A mapper
    /// only counts as registered once all of its statements were added.
    pub fn add_interface(&mut self, mapper: &InterfaceDecl) -> DefResult<usize> {
        if self.known.contains(mapper.name()) {
            return Ok(0);
        }
        let mut added = 0;
        for method in mapper.all_methods() {
            if self.factory.registry().recognize(method).is_none() {
                continue;
            }
            self.factory.parse_statement(method, mapper)?;
            added += 1;
        }
        self.known.insert(mapper.name().to_string());
        #[cfg(feature = "tracing")]
        info!(mapper = mapper.name(), statements = added, "mapper registered");
        Ok(added)
    }

    pub fn has_mapper(&self, name: &str) -> bool {
        self.known.contains(name)
    }

    pub fn factory(&self) -> &DefinitionStatementFactory<C> {
        &self.factory
    }

    pub fn catalog(&self) -> &C {
        self.factory.catalog()
    }

    pub fn into_catalog(self) -> C {
        self.factory.into_catalog()
    }
}
