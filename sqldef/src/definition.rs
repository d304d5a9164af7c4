//! Adaptors that translate definition markers into statement shapes, and the ordered registry
//! that recognizes them on methods.

use std::fmt;
use std::sync::Arc;

use sqldef_core::{
    CreateDefinition, DefResult, DefinitionError, DeleteDefinition, Marker, MarkerType, MethodDecl,
    OperationKind, ReadDefinition, UpdateDefinition,
};
use sqldef_templates::{builtin, SqlTemplate, TemplateCatalog};

/// Settings a marker carries into synthesis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationProperty {
    pub selective: bool,
    /// Extra filter expression; empty means none.
    pub filter: String,
}

impl AnnotationProperty {
    pub fn new(selective: bool, filter: impl Into<String>) -> Self {
        Self {
            selective,
            filter: filter.into(),
        }
    }
}

/// Strategy for one marker type.
///
/// `context` and `sql_template` return `None` when handed a marker of a type the adaptor was not
/// registered for.
pub trait AnnotationAdaptor: fmt::Debug + Send + Sync {
    fn context(&self, marker: &dyn Marker) -> Option<AnnotationProperty>;
    fn sql_template(&self, marker: &dyn Marker) -> Option<Arc<dyn SqlTemplate>>;
    fn sql_command_type(&self) -> OperationKind;
}

fn lookup(
    templates: &TemplateCatalog,
    kind: OperationKind,
    selective: bool,
) -> DefResult<Arc<dyn SqlTemplate>> {
    templates
        .template(kind, selective)
        .ok_or(DefinitionError::TemplateNotFound { kind, selective })
}

#[derive(Debug, Clone)]
pub struct CreateDefinitionAdaptor {
    full: Arc<dyn SqlTemplate>,
    selective: Arc<dyn SqlTemplate>,
}

impl CreateDefinitionAdaptor {
    pub fn new(full: Arc<dyn SqlTemplate>, selective: Arc<dyn SqlTemplate>) -> Self {
        Self { full, selective }
    }

    pub fn from_catalog(templates: &TemplateCatalog) -> DefResult<Self> {
        Ok(Self::new(
            lookup(templates, OperationKind::Create, false)?,
            lookup(templates, OperationKind::Create, true)?,
        ))
    }
}

impl Default for CreateDefinitionAdaptor {
    fn default() -> Self {
        Self::new(
            builtin(OperationKind::Create, false),
            builtin(OperationKind::Create, true),
        )
    }
}

impl AnnotationAdaptor for CreateDefinitionAdaptor {
    fn context(&self, marker: &dyn Marker) -> Option<AnnotationProperty> {
        let create = marker.downcast_ref::<CreateDefinition>()?;
        Some(AnnotationProperty::new(create.selective, ""))
    }

    fn sql_template(&self, marker: &dyn Marker) -> Option<Arc<dyn SqlTemplate>> {
        let create = marker.downcast_ref::<CreateDefinition>()?;
        Some(if create.selective {
            self.selective.clone()
        } else {
            self.full.clone()
        })
    }

    fn sql_command_type(&self) -> OperationKind {
        OperationKind::Create
    }
}

#[derive(Debug, Clone)]
pub struct ReadDefinitionAdaptor {
    template: Arc<dyn SqlTemplate>,
}

impl ReadDefinitionAdaptor {
    pub fn new(template: Arc<dyn SqlTemplate>) -> Self {
        Self { template }
    }

    pub fn from_catalog(templates: &TemplateCatalog) -> DefResult<Self> {
        Ok(Self::new(lookup(templates, OperationKind::Read, false)?))
    }
}

impl Default for ReadDefinitionAdaptor {
    fn default() -> Self {
        Self::new(builtin(OperationKind::Read, false))
    }
}

impl AnnotationAdaptor for ReadDefinitionAdaptor {
    fn context(&self, marker: &dyn Marker) -> Option<AnnotationProperty> {
        marker.downcast_ref::<ReadDefinition>()?;
        Some(AnnotationProperty::default())
    }

    fn sql_template(&self, marker: &dyn Marker) -> Option<Arc<dyn SqlTemplate>> {
        marker.downcast_ref::<ReadDefinition>()?;
        Some(self.template.clone())
    }

    fn sql_command_type(&self) -> OperationKind {
        OperationKind::Read
    }
}

#[derive(Debug, Clone)]
pub struct UpdateDefinitionAdaptor {
    full: Arc<dyn SqlTemplate>,
    selective: Arc<dyn SqlTemplate>,
}

impl UpdateDefinitionAdaptor {
    pub fn new(full: Arc<dyn SqlTemplate>, selective: Arc<dyn SqlTemplate>) -> Self {
        Self { full, selective }
    }

    pub fn from_catalog(templates: &TemplateCatalog) -> DefResult<Self> {
        Ok(Self::new(
            lookup(templates, OperationKind::Update, false)?,
            lookup(templates, OperationKind::Update, true)?,
        ))
    }
}

impl Default for UpdateDefinitionAdaptor {
    fn default() -> Self {
        Self::new(
            builtin(OperationKind::Update, false),
            builtin(OperationKind::Update, true),
        )
    }
}

impl AnnotationAdaptor for UpdateDefinitionAdaptor {
    fn context(&self, marker: &dyn Marker) -> Option<AnnotationProperty> {
        let update = marker.downcast_ref::<UpdateDefinition>()?;
        Some(AnnotationProperty::new(update.selective, update.filter.clone()))
    }

    fn sql_template(&self, marker: &dyn Marker) -> Option<Arc<dyn SqlTemplate>> {
        let update = marker.downcast_ref::<UpdateDefinition>()?;
        Some(if update.selective {
            self.selective.clone()
        } else {
            self.full.clone()
        })
    }

    fn sql_command_type(&self) -> OperationKind {
        OperationKind::Update
    }
}

#[derive(Debug, Clone)]
pub struct DeleteDefinitionAdaptor {
    template: Arc<dyn SqlTemplate>,
}

impl DeleteDefinitionAdaptor {
    pub fn new(template: Arc<dyn SqlTemplate>) -> Self {
        Self { template }
    }

    pub fn from_catalog(templates: &TemplateCatalog) -> DefResult<Self> {
        Ok(Self::new(lookup(templates, OperationKind::Delete, false)?))
    }
}

impl Default for DeleteDefinitionAdaptor {
    fn default() -> Self {
        Self::new(builtin(OperationKind::Delete, false))
    }
}

impl AnnotationAdaptor for DeleteDefinitionAdaptor {
    fn context(&self, marker: &dyn Marker) -> Option<AnnotationProperty> {
        let delete = marker.downcast_ref::<DeleteDefinition>()?;
        Some(AnnotationProperty::new(false, delete.filter.clone()))
    }

    fn sql_template(&self, marker: &dyn Marker) -> Option<Arc<dyn SqlTemplate>> {
        marker.downcast_ref::<DeleteDefinition>()?;
        Some(self.template.clone())
    }

    fn sql_command_type(&self) -> OperationKind {
        OperationKind::Delete
    }
}

/// Marker types in recognition order, each with the adaptor that handles it.
///
/// Built once at composition time and only read afterwards.
#[derive(Debug, Default)]
pub struct AdaptorRegistry {
    adaptors: Vec<(MarkerType, Box<dyn AnnotationAdaptor>)>,
}

impl AdaptorRegistry {
    /// An empty registry; nothing is recognized until adaptors are registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// create, read, update, delete, in that order, over the built-in templates.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register::<CreateDefinition>(CreateDefinitionAdaptor::default());
        registry.register::<ReadDefinition>(ReadDefinitionAdaptor::default());
        registry.register::<UpdateDefinition>(UpdateDefinitionAdaptor::default());
        registry.register::<DeleteDefinition>(DeleteDefinitionAdaptor::default());
        registry
    }

    /// Same as `standard`, with templates taken from `templates`.
    pub fn from_templates(templates: &TemplateCatalog) -> DefResult<Self> {
        let mut registry = Self::new();
        registry.register::<CreateDefinition>(CreateDefinitionAdaptor::from_catalog(templates)?);
        registry.register::<ReadDefinition>(ReadDefinitionAdaptor::from_catalog(templates)?);
        registry.register::<UpdateDefinition>(UpdateDefinitionAdaptor::from_catalog(templates)?);
        registry.register::<DeleteDefinition>(DeleteDefinitionAdaptor::from_catalog(templates)?);
        Ok(registry)
    }

    /// Register the adaptor for `M`. A type already present keeps its place in the order and
    /// gets the new adaptor.
    pub fn register<M: Marker>(&mut self, adaptor: impl AnnotationAdaptor + 'static) {
        let ty = MarkerType::of::<M>();
        let adaptor: Box<dyn AnnotationAdaptor> = Box::new(adaptor);
        match self.adaptors.iter_mut().find(|(t, _)| *t == ty) {
            Some(slot) => slot.1 = adaptor,
            None => self.adaptors.push((ty, adaptor)),
        }
    }

    pub fn resolve_adaptor(&self, marker: MarkerType) -> Option<&dyn AnnotationAdaptor> {
        self.adaptors
            .iter()
            .find(|(t, _)| *t == marker)
            .map(|(_, a)| a.as_ref())
    }

    pub fn marker_types(&self) -> impl Iterator<Item = MarkerType> + '_ {
        self.adaptors.iter().map(|(t, _)| *t)
    }

    /// The first marker on `method`, in registry order, that has an adaptor.
    pub fn recognize<'m>(&self, method: &'m MethodDecl) -> Option<&'m dyn Marker> {
        self.marker_types().find_map(|t| method.annotation(t))
    }
}
