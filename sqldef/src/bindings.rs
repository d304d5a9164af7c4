//! Resolution of type variables declared by generic base mappers.
//!
//! For `trait UserMapper: BaseMapper<User>` a method declared in `BaseMapper<T>` that takes `&T`
//! operates on `User`. Bindings are computed once per target interface, walking every base
//! transitively so that `T` stays resolvable through intermediate generic traits.

use std::collections::HashMap;

use sqldef_core::{DefResult, DefinitionError, EntityType, InterfaceDecl, ParamType};

#[derive(Debug, Clone)]
struct BaseBinding {
    params: Vec<&'static str>,
    /// Arguments, expressed in terms of the target interface.
    args: Vec<ParamType>,
}

/// Type arguments every base of one target interface is instantiated with.
#[derive(Debug, Clone)]
pub struct TypeBindings {
    target: String,
    direct: Vec<(String, Vec<ParamType>)>,
    bases: HashMap<String, BaseBinding>,
}

impl TypeBindings {
    pub fn of(target: &InterfaceDecl) -> Self {
        let mut bindings = Self {
            target: target.name().to_string(),
            direct: direct_bases(target),
            bases: HashMap::new(),
        };
        bindings.walk(target, &HashMap::new());
        bindings
    }

    /// Whether these bindings were computed for `target`: same name, same direct bases with the
    /// same arguments. Intermediate bases are not compared.
    pub fn is_for(&self, target: &InterfaceDecl) -> bool {
        self.target == target.name() && self.direct == direct_bases(target)
    }

    fn walk(&mut self, iface: &InterfaceDecl, env: &HashMap<&'static str, ParamType>) {
        for binding in iface.generic_interfaces() {
            let base = &binding.base;
            let args: Vec<ParamType> = binding.args.iter().map(|a| substitute(a, env)).collect();
            // First path to a base wins, like method collection.
            if self.bases.contains_key(base.name()) {
                continue;
            }
            self.bases.insert(
                base.name().to_string(),
                BaseBinding {
                    params: base.generic_params().to_vec(),
                    args: args.clone(),
                },
            );
            let child: HashMap<_, _> = base
                .generic_params()
                .iter()
                .copied()
                .zip(args)
                .collect();
            self.walk(base, &child);
        }
    }

    /// The type bound to `variable` as declared by the trait named `declared_in`.
    pub fn lookup(&self, declared_in: &str, variable: &str) -> DefResult<&ParamType> {
        self.bases
            .get(declared_in)
            .and_then(|b| {
                let idx = b.params.iter().position(|p| *p == variable)?;
                b.args.get(idx)
            })
            .filter(|ty| !matches!(ty, ParamType::Variable(_)))
            .ok_or_else(|| self.unresolved(variable))
    }

    /// The entity a declared parameter type stands for. A parameterized type stands for its
    /// first type argument.
    pub fn resolve(&self, ty: &ParamType, declared_in: &str) -> DefResult<EntityType> {
        match ty {
            ParamType::Concrete(entity) => Ok(*entity),
            ParamType::Variable(v) => {
                let bound = self.lookup(declared_in, v)?;
                // Bound types are already expressed against the target.
                self.resolve(bound, &self.target)
            }
            ParamType::Parameterized { args, raw } => match args.first() {
                Some(first) => self.resolve(first, declared_in),
                None => Err(self.unresolved(raw)),
            },
        }
    }

    fn unresolved(&self, variable: &str) -> DefinitionError {
        DefinitionError::UnresolvedTypeVariable {
            interface: self.target.clone(),
            variable: variable.to_string(),
        }
    }
}

fn direct_bases(target: &InterfaceDecl) -> Vec<(String, Vec<ParamType>)> {
    target
        .generic_interfaces()
        .iter()
        .map(|b| (b.base.name().to_string(), b.args.clone()))
        .collect()
}

fn substitute(ty: &ParamType, env: &HashMap<&'static str, ParamType>) -> ParamType {
    match ty {
        ParamType::Variable(v) => env.get(v).cloned().unwrap_or(ParamType::Variable(*v)),
        ParamType::Parameterized { raw, args } => ParamType::Parameterized {
            raw: *raw,
            args: args.iter().map(|a| substitute(a, env)).collect(),
        },
        ParamType::Concrete(_) => ty.clone(),
    }
}
