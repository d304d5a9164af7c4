//! Runtime description of mapper traits.
//!
//! Rust has no reflection over trait methods, so `#[mapper]` records what synthesis needs up
//! front: the trait's qualified name, its type parameters, the generic traits it extends and, per
//! method, the markers and the declared type of the first parameter. The builders here are also
//! usable by hand when a mapper is not declared through the macro.

use std::fmt;

use crate::marker::{Marker, MarkerType};
use crate::EntityType;

/// Declared type of a method parameter, as written in the trait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    /// A type parameter of the declaring trait, e.g. `T` in `fn save(&self, entity: &T)`.
    Variable(&'static str),
    /// A generic container such as `Vec<User>` or `&[T]`.
    Parameterized {
        raw: &'static str,
        args: Vec<ParamType>,
    },
    Concrete(EntityType),
}

impl ParamType {
    pub fn of<E: crate::Entity>() -> Self {
        ParamType::Concrete(EntityType::of::<E>())
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Variable(name) => f.write_str(name),
            ParamType::Parameterized { raw, args } => {
                write!(f, "{raw}<")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(">")
            }
            ParamType::Concrete(entity) => write!(f, "{entity}"),
        }
    }
}

/// One method of a mapper trait.
#[derive(Debug)]
pub struct MethodDecl {
    name: String,
    declared_in: String,
    markers: Vec<Box<dyn Marker>>,
    first_param: Option<ParamType>,
}

impl MethodDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_in: String::new(),
            markers: Vec::new(),
            first_param: None,
        }
    }

    pub fn marker<M: Marker>(mut self, marker: M) -> Self {
        self.markers.push(Box::new(marker));
        self
    }

    /// Declared type of the first parameter after the receiver.
    pub fn param(mut self, ty: ParamType) -> Self {
        self.first_param = Some(ty);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Qualified name of the trait that declares this method.
    pub fn declared_in(&self) -> &str {
        &self.declared_in
    }

    pub fn first_param(&self) -> Option<&ParamType> {
        self.first_param.as_ref()
    }

    pub fn markers(&self) -> impl Iterator<Item = &dyn Marker> {
        self.markers.iter().map(|m| m.as_ref())
    }

    /// The marker of the given type, if the method carries one.
    pub fn annotation(&self, ty: MarkerType) -> Option<&dyn Marker> {
        self.markers().find(|m| m.marker_type() == ty)
    }

    pub fn is_annotation_present(&self, ty: MarkerType) -> bool {
        self.annotation(ty).is_some()
    }
}

/// A generic trait extended by a mapper, with the arguments it is instantiated with.
/// `trait UserMapper: BaseMapper<User>` yields `GenericBinding { base: BaseMapper, args: [User] }`.
#[derive(Debug)]
pub struct GenericBinding {
    pub base: InterfaceDecl,
    pub args: Vec<ParamType>,
}

impl GenericBinding {
    pub fn new(base: InterfaceDecl, args: Vec<ParamType>) -> Self {
        Self { base, args }
    }
}

/// A mapper trait.
#[derive(Debug)]
pub struct InterfaceDecl {
    name: String,
    type_params: Vec<&'static str>,
    extends: Vec<GenericBinding>,
    methods: Vec<MethodDecl>,
}

impl InterfaceDecl {
    /// `name` is the qualified trait name; statement ids are derived from it.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_params: Vec::new(),
            extends: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn type_params(mut self, params: &[&'static str]) -> Self {
        self.type_params = params.to_vec();
        self
    }

    pub fn extends(mut self, binding: GenericBinding) -> Self {
        self.extends.push(binding);
        self
    }

    pub fn method(mut self, mut method: MethodDecl) -> Self {
        method.declared_in = self.name.clone();
        self.methods.push(method);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name without the module path.
    pub fn simple_name(&self) -> &str {
        self.name.rsplit("::").next().unwrap_or(&self.name)
    }

    pub fn generic_params(&self) -> &[&'static str] {
        &self.type_params
    }

    pub fn generic_interfaces(&self) -> &[GenericBinding] {
        &self.extends
    }

    /// Methods declared directly on this trait.
    pub fn declared_methods(&self) -> &[MethodDecl] {
        &self.methods
    }

    /// Declared and inherited methods. A declared method shadows inherited ones with the same
    /// name; among bases the first declaration wins.
    pub fn all_methods(&self) -> Vec<&MethodDecl> {
        let mut out: Vec<&MethodDecl> = Vec::new();
        self.collect_methods(&mut out);
        out
    }

    fn collect_methods<'a>(&'a self, out: &mut Vec<&'a MethodDecl>) {
        for m in &self.methods {
            if !out.iter().any(|o| o.name == m.name) {
                out.push(m);
            }
        }
        for binding in &self.extends {
            binding.base.collect_methods(out);
        }
    }
}

/// Implemented by the `<Trait>Definition` struct `#[mapper]` generates.
pub trait MapperDefinition {
    fn interface() -> InterfaceDecl;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::{CreateDefinition, DeleteDefinition, UpdateDefinition};
    use crate::{Entity, FieldMeta};

    struct User;
    impl Entity for User {
        const TABLE: &'static str = "users";
        const FIELDS: &'static [FieldMeta] = &[FieldMeta::new("id").id()];
    }

    fn base() -> InterfaceDecl {
        InterfaceDecl::new("app::BaseMapper")
            .type_params(&["T"])
            .method(
                MethodDecl::new("save")
                    .marker(CreateDefinition::default())
                    .param(ParamType::Variable("T")),
            )
            .method(
                MethodDecl::new("update")
                    .marker(UpdateDefinition::default())
                    .param(ParamType::Variable("T")),
            )
    }

    fn user_mapper() -> InterfaceDecl {
        InterfaceDecl::new("app::UserMapper")
            .extends(GenericBinding::new(base(), vec![ParamType::of::<User>()]))
            .method(
                MethodDecl::new("update")
                    .marker(UpdateDefinition {
                        selective: true,
                        filter: String::new(),
                    })
                    .param(ParamType::of::<User>()),
            )
    }

    #[test]
    fn methods_record_their_declaring_trait() {
        let iface = user_mapper();
        let all = iface.all_methods();
        let names: Vec<_> = all.iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["update", "save"]);
        assert_eq!(all[0].declared_in(), "app::UserMapper");
        assert_eq!(all[1].declared_in(), "app::BaseMapper");
        assert_eq!(iface.simple_name(), "UserMapper");
    }

    #[test]
    fn annotation_lookup_by_marker_type() {
        let m = MethodDecl::new("remove").marker(DeleteDefinition::default());
        assert!(m.is_annotation_present(MarkerType::of::<DeleteDefinition>()));
        assert!(!m.is_annotation_present(MarkerType::of::<UpdateDefinition>()));
        let marker = m.annotation(MarkerType::of::<DeleteDefinition>()).unwrap();
        assert_eq!(
            marker.downcast_ref::<DeleteDefinition>().unwrap().filter,
            "id = #{id}"
        );
    }

    #[test]
    fn param_type_display() {
        let ty = ParamType::Parameterized {
            raw: "Vec",
            args: vec![ParamType::Variable("T")],
        };
        assert_eq!(ty.to_string(), "Vec<T>");
    }
}
