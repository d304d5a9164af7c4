//! Method-level definition markers.
//!
//! A marker selects the operation a mapper method performs. `#[mapper]` turns attributes such as
//! `#[update(selective, filter = "email = #{email}")]` into the values defined here; adaptors in
//! the facade read them back through `Any` downcasting.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Filter clause used when a marker does not set one.
pub const DEFAULT_FILTER: &str = "id = #{id}";

/// A declarative operation marker attached to a method.
pub trait Marker: Any + fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;

    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl<'a> dyn Marker + 'a {
    pub fn marker_type(&self) -> MarkerType {
        MarkerType {
            id: self.as_any().type_id(),
            name: self.type_name(),
        }
    }

    pub fn is<M: Marker>(&self) -> bool {
        self.as_any().is::<M>()
    }

    pub fn downcast_ref<M: Marker>(&self) -> Option<&M> {
        self.as_any().downcast_ref::<M>()
    }
}

/// Identity of a marker type, used as the adaptor registry key.
#[derive(Debug, Clone, Copy)]
pub struct MarkerType {
    id: TypeId,
    name: &'static str,
}

impl MarkerType {
    pub fn of<M: Marker>() -> Self {
        Self {
            id: TypeId::of::<M>(),
            name: std::any::type_name::<M>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Short name without the module path, e.g. `UpdateDefinition`.
    pub fn short_name(&self) -> &'static str {
        self.name.rsplit("::").next().unwrap_or(self.name)
    }
}

impl PartialEq for MarkerType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MarkerType {}

impl Hash for MarkerType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// `#[create]`: insert the entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateDefinition {
    /// Only insert columns whose value is not null.
    pub selective: bool,
}

/// `#[read]`: select every persisted column of the entity's table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadDefinition;

/// `#[update]`: update the entity's columns, restricted by `filter`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateDefinition {
    /// Only set columns whose value is not null.
    pub selective: bool,
    /// Appended as ` where <filter>`; empty means no restriction.
    pub filter: String,
}

impl Default for UpdateDefinition {
    fn default() -> Self {
        Self {
            selective: false,
            filter: DEFAULT_FILTER.to_string(),
        }
    }
}

/// `#[delete]`: delete rows of the entity's table, restricted by `filter`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteDefinition {
    pub filter: String,
}

impl Default for DeleteDefinition {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
        }
    }
}

macro_rules! impl_marker {
    ($($ty:ty),*) => {
        $(
            impl Marker for $ty {
                fn as_any(&self) -> &dyn Any {
                    self
                }
            }
        )*
    };
}

impl_marker!(CreateDefinition, ReadDefinition, UpdateDefinition, DeleteDefinition);
