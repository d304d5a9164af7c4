//! Statement synthesis: one marked mapper method in, one registered statement out.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use sqldef_core::persistence::{column_name, id_field};
use sqldef_core::{
    DefResult, DefinitionError, EntityType, GeneratedKeys, GenerationType, InterfaceDecl,
    KeyBinding, KeyGenerator, MappedStatement, MethodDecl, OperationKind, StatementCatalog,
};
use sqldef_templates::{SCRIPT_CLOSE, SCRIPT_OPEN};

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

use crate::bindings::TypeBindings;
use crate::definition::AdaptorRegistry;

/// Builds and registers the statement of a mapper method.
pub trait StatementFactory {
    /// `target` is the mapper the method is registered for; the method itself may be declared
    /// on one of its bases.
    fn parse_statement(&mut self, method: &MethodDecl, target: &InterfaceDecl) -> DefResult<()>;
}

/// Tag recorded in the catalog for an interface whose statements are being loaded.
pub fn resource_tag(target: &InterfaceDecl) -> String {
    format!("interface {}", target.name())
}

/// Source location reported on statements; derived from the module path, so only a guess.
pub fn resource_name(target: &InterfaceDecl) -> String {
    format!("{}.rs (best guess)", target.name().replace("::", "/"))
}

pub fn statement_id(target: &InterfaceDecl, method: &MethodDecl) -> String {
    format!("{}.{}", target.name(), method.name())
}

/// `StatementFactory` driven by definition markers and the adaptors registered for them.
#[derive(Debug)]
pub struct DefinitionStatementFactory<C> {
    catalog: C,
    registry: Arc<AdaptorRegistry>,
    bindings: HashMap<String, TypeBindings>,
}

impl<C: StatementCatalog> DefinitionStatementFactory<C> {
    /// A factory over the standard create/read/update/delete adaptors.
    pub fn new(catalog: C) -> Self {
        Self::with_registry(catalog, Arc::new(AdaptorRegistry::standard()))
    }

    pub fn with_registry(catalog: C, registry: Arc<AdaptorRegistry>) -> Self {
        Self {
            catalog,
            registry,
            bindings: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &AdaptorRegistry {
        &self.registry
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut C {
        &mut self.catalog
    }

    pub fn into_catalog(self) -> C {
        self.catalog
    }

    fn mark_loaded(&mut self, target: &InterfaceDecl) {
        let resource = resource_tag(target);
        if !self.catalog.is_resource_loaded(&resource) {
            self.catalog.add_loaded_resource(&resource);
            #[cfg(feature = "tracing")]
            debug!(resource = %resource, "resource loaded");
        }
    }

    fn entity_type(&mut self, method: &MethodDecl, target: &InterfaceDecl) -> DefResult<EntityType> {
        let param = method
            .first_param()
            .ok_or_else(|| DefinitionError::MissingEntityParameter {
                statement: statement_id(target, method),
            })?;
        let bindings = match self.bindings.entry(target.name().to_string()) {
            Entry::Occupied(entry) => {
                let bindings = entry.into_mut();
                if !bindings.is_for(target) {
                    *bindings = TypeBindings::of(target);
                }
                bindings
            }
            Entry::Vacant(entry) => entry.insert(TypeBindings::of(target)),
        };
        bindings.resolve(param, method.declared_in())
    }

    fn build_statement(
        &mut self,
        method: &MethodDecl,
        target: &InterfaceDecl,
    ) -> DefResult<MappedStatement> {
        let id = statement_id(target, method);
        let registry = Arc::clone(&self.registry);
        let marker = registry
            .recognize(method)
            .ok_or_else(|| DefinitionError::NoDefinitionMarker {
                statement: id.clone(),
            })?;
        let marker_type = marker.marker_type();
        let adaptor =
            registry
                .resolve_adaptor(marker_type)
                .ok_or(DefinitionError::AdaptorNotFound {
                    marker: marker_type.name(),
                })?;

        let entity = self.entity_type(method, target)?;

        let mismatch = || DefinitionError::MarkerMismatch {
            marker: marker.type_name(),
            adaptor: marker_type.short_name(),
        };
        let property = adaptor.context(marker).ok_or_else(mismatch)?;
        let template = adaptor.sql_template(marker).ok_or_else(mismatch)?;
        let kind = adaptor.sql_command_type();

        let mut sql = template.parse_sql(&entity);
        if kind.accepts_filter() && !property.filter.is_empty() {
            sql.push_str(" where ");
            sql.push_str(&property.filter);
        }
        let script = format!("{SCRIPT_OPEN} {sql}{SCRIPT_CLOSE}");
        let sql_source = self.catalog.language_driver().create_sql_source(&script)?;

        let key = match kind {
            OperationKind::Create => self.key_binding(&entity)?,
            _ => None,
        };

        #[cfg(feature = "tracing")]
        debug!(statement = %id, kind = kind.verb(), entity = %entity, "statement synthesized");

        Ok(MappedStatement {
            id,
            kind,
            script,
            sql_source,
            resource: resource_name(target),
            key,
        })
    }

    fn key_binding(&self, entity: &EntityType) -> DefResult<Option<KeyBinding>> {
        let key = id_field(entity)?;
        let Some(generated) = key.generated else {
            return Ok(None);
        };
        let generator: Arc<dyn KeyGenerator> = match generated.strategy {
            GenerationType::Auto => Arc::new(GeneratedKeys),
            GenerationType::Identity => {
                let name = if generated.generator.is_empty() {
                    self.catalog.default_key_generator()
                } else {
                    generated.generator
                };
                self.catalog
                    .key_generator(name)
                    .ok_or_else(|| DefinitionError::MissingKeyGenerator {
                        name: name.to_string(),
                    })?
            }
        };
        #[cfg(feature = "tracing")]
        trace!(entity = %entity, generator = generator.name(), "key generator bound");
        Ok(Some(KeyBinding {
            generator,
            key_property: key.property.to_string(),
            key_column: column_name(key).to_string(),
        }))
    }
}

impl<C: StatementCatalog> StatementFactory for DefinitionStatementFactory<C> {
    fn parse_statement(&mut self, method: &MethodDecl, target: &InterfaceDecl) -> DefResult<()> {
        self.mark_loaded(target);
        let statement = self.build_statement(method, target)?;
        self.catalog.add_statement(statement)
    }
}
