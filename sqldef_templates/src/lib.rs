#![forbid(unsafe_code)]
#![allow(unexpected_cfgs)]
//! SQL templates that render statement skeletons from `#[derive(Entity)]` metadata, plus the
//! default scripting language driver that turns the rendered scripts into executable sources.
//!
//! Templates emit `#{property}` bindings; the driver replaces them with placeholders.
//! The `tokio_postgres` feature switches the default placeholder style from `?` to `$1, $2, ...`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use sqldef_core::persistence::{insert_fields, update_fields};
use sqldef_core::{EntityType, FieldMeta, OperationKind};

pub mod script;

pub use script::{XmlLanguageDriver, SCRIPT_CLOSE, SCRIPT_OPEN};

/// Placeholder representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    Dollar,   // $1, $2, ...
    Question, // ?
}

impl Placeholder {
    /// The style selected by cargo features.
    pub fn from_features() -> Self {
        #[cfg(feature = "tokio_postgres")]
        return Placeholder::Dollar;

        #[cfg(not(feature = "tokio_postgres"))]
        return Placeholder::Question;
    }

    /// The `n`-th placeholder, 1-based.
    pub fn nth(self, n: usize) -> String {
        match self {
            Placeholder::Dollar => format!("${}", n),
            Placeholder::Question => "?".to_string(),
        }
    }
}

impl Default for Placeholder {
    fn default() -> Self {
        Self::from_features()
    }
}

/// Renders the SQL skeleton of one operation shape for an entity.
///
/// Templates are pure: the same entity always renders the same text, and the per-method filter
/// clause is never part of the skeleton.
pub trait SqlTemplate: fmt::Debug + Send + Sync {
    fn parse_sql(&self, entity: &EntityType) -> String;
}

fn binding(field: &FieldMeta) -> String {
    format!("#{{{}}}", field.property)
}

fn not_null_test(field: &FieldMeta) -> String {
    format!("<if test=\"{} != null\">", field.property)
}

/// `insert into <table> (<cols>) values (#{..}, ...)`
#[derive(Debug, Clone, Copy, Default)]
pub struct InsertTemplate;

impl SqlTemplate for InsertTemplate {
    fn parse_sql(&self, entity: &EntityType) -> String {
        let fields: Vec<_> = insert_fields(entity).collect();
        let cols = fields.iter().map(|f| f.column).collect::<Vec<_>>().join(", ");
        let vals = fields
            .iter()
            .map(|f| binding(f))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "insert into {table} ({cols}) values ({vals})",
            table = entity.table(),
            cols = cols,
            vals = vals
        )
    }
}

/// Like `InsertTemplate`, but each column is only inserted when its value is not null.
#[derive(Debug, Clone, Copy, Default)]
pub struct InsertSelectiveTemplate;

impl SqlTemplate for InsertSelectiveTemplate {
    fn parse_sql(&self, entity: &EntityType) -> String {
        let mut cols = String::new();
        let mut vals = String::new();
        for f in insert_fields(entity) {
            cols.push_str(&format!("{}{},</if>", not_null_test(f), f.column));
            vals.push_str(&format!("{}{},</if>", not_null_test(f), binding(f)));
        }
        format!(
            "insert into {table} {open}{cols}</trim> values {open}{vals}</trim>",
            table = entity.table(),
            open = r#"<trim prefix="(" suffix=")" suffixOverrides=",">"#,
            cols = cols,
            vals = vals
        )
    }
}

/// `update <table> set <col> = #{..}, ...`; the key column is never set.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateTemplate;

impl SqlTemplate for UpdateTemplate {
    fn parse_sql(&self, entity: &EntityType) -> String {
        let assigns = update_fields(entity)
            .map(|f| format!("{} = {}", f.column, binding(f)))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "update {table} set {assigns}",
            table = entity.table(),
            assigns = assigns
        )
    }
}

/// Like `UpdateTemplate`, but each column is only set when its value is not null.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateSelectiveTemplate;

impl SqlTemplate for UpdateSelectiveTemplate {
    fn parse_sql(&self, entity: &EntityType) -> String {
        let assigns: String = update_fields(entity)
            .map(|f| format!("{}{} = {},</if>", not_null_test(f), f.column, binding(f)))
            .collect();
        format!(
            "update {table} <set>{assigns}</set>",
            table = entity.table(),
            assigns = assigns
        )
    }
}

/// `delete from <table>`
#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteTemplate;

impl SqlTemplate for DeleteTemplate {
    fn parse_sql(&self, entity: &EntityType) -> String {
        format!("delete from {table}", table = entity.table())
    }
}

/// `select <cols> from <table>`
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectTemplate;

impl SqlTemplate for SelectTemplate {
    fn parse_sql(&self, entity: &EntityType) -> String {
        let cols = entity
            .fields()
            .iter()
            .map(|f| f.column)
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "select {cols} from {table}",
            cols = cols,
            table = entity.table()
        )
    }
}

const STANDARD_SHAPES: [(OperationKind, bool); 6] = [
    (OperationKind::Create, false),
    (OperationKind::Create, true),
    (OperationKind::Update, false),
    (OperationKind::Update, true),
    (OperationKind::Delete, false),
    (OperationKind::Read, false),
];

/// The built-in template for a shape. Delete and read have no selective variant.
pub fn builtin(kind: OperationKind, selective: bool) -> Arc<dyn SqlTemplate> {
    match (kind, selective) {
        (OperationKind::Create, false) => Arc::new(InsertTemplate),
        (OperationKind::Create, true) => Arc::new(InsertSelectiveTemplate),
        (OperationKind::Update, false) => Arc::new(UpdateTemplate),
        (OperationKind::Update, true) => Arc::new(UpdateSelectiveTemplate),
        (OperationKind::Delete, _) => Arc::new(DeleteTemplate),
        (OperationKind::Read, _) => Arc::new(SelectTemplate),
    }
}

/// Templates keyed by operation kind and selectivity.
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    templates: HashMap<(OperationKind, bool), Arc<dyn SqlTemplate>>,
}

impl TemplateCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The six built-in templates.
    pub fn standard() -> Self {
        let mut catalog = Self::new();
        for (kind, selective) in STANDARD_SHAPES {
            catalog.insert(kind, selective, builtin(kind, selective));
        }
        catalog
    }

    /// Register (or replace) the template for a shape.
    pub fn insert(&mut self, kind: OperationKind, selective: bool, template: Arc<dyn SqlTemplate>) {
        self.templates.insert((kind, selective), template);
    }

    /// The template for a shape. A kind without a selective variant falls back to its full one.
    pub fn template(&self, kind: OperationKind, selective: bool) -> Option<Arc<dyn SqlTemplate>> {
        self.templates
            .get(&(kind, selective))
            .or_else(|| self.templates.get(&(kind, false)))
            .cloned()
    }
}
