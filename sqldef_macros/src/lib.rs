//! Procedural macros for the `sqldef` statement synthesis library.
//!
//! This crate provides two macros:
//! - `#[derive(Entity)]`: inspects a struct and generates its persistence metadata
//!   (`sqldef_core::Entity`) and property access for binding (`sqldef_core::PropertySource`).
//! - `#[mapper]`: records a mapper trait's methods, markers and generic supertraits in a
//!   companion `<Trait>Definition` struct so statements can be synthesized at bootstrap.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{quote, ToTokens};
use syn::{
    parse_macro_input, spanned::Spanned, Attribute, Data, DeriveInput, Fields, FnArg, Ident,
    ItemTrait, LitStr, TraitItem, Type, TypeParamBound,
};

use inflections::Inflect;

// --- Helper Functions for Parsing ---

/// Helper to check if a type is an `Option<T>`.
fn is_option(ty: &Type) -> bool {
    if let Type::Path(type_path) = ty {
        if type_path.qself.is_none() && type_path.path.leading_colon.is_none() {
            if let Some(segment) = type_path.path.segments.last() {
                return segment.ident == "Option";
            }
        }
    }
    false
}

/// Table and column names end up verbatim in generated SQL.
fn is_valid_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|ch| ch == '_' || ch.is_ascii_alphanumeric())
}

/// Holds parsed metadata about a single struct field.
struct FieldMetadata {
    ident: Ident,
    ty: Type,
    ty_str: String,
    column_name: String,
    is_id: bool,
    is_skipped: bool,
    generated: Option<(Ident, String)>,
}

fn parse_generated_value(attr: &Attribute) -> syn::Result<(Ident, String)> {
    let mut strategy = None;
    let mut generator = String::new();
    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("strategy") {
            let s: LitStr = meta.value()?.parse()?;
            strategy = Some(match s.value().as_str() {
                "auto" => Ident::new("Auto", s.span()),
                "identity" => Ident::new("Identity", s.span()),
                other => {
                    return Err(meta.error(format!(
                        "unknown generation strategy `{other}`; expected \"auto\" or \"identity\""
                    )))
                }
            });
            Ok(())
        } else if meta.path.is_ident("generator") {
            let s: LitStr = meta.value()?.parse()?;
            generator = s.value();
            Ok(())
        } else {
            Err(meta.error("unsupported #[generated_value(...)] key"))
        }
    })?;
    let strategy = strategy.unwrap_or_else(|| Ident::new("Auto", attr.span()));
    Ok((strategy, generator))
}

/// Parses all named fields from a `DeriveInput` struct.
fn parse_field_metadata(input: &DeriveInput) -> syn::Result<Vec<FieldMetadata>> {
    let fields = match &input.data {
        Data::Struct(s) => match &s.fields {
            Fields::Named(named) => named,
            _ => {
                return Err(syn::Error::new(
                    input.ident.span(),
                    "#[derive(Entity)] only supports structs with named fields.",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new(
                input.ident.span(),
                "#[derive(Entity)] can only be used on structs.",
            ))
        }
    };

    let mut out = Vec::new();
    for field in &fields.named {
        let Some(ident) = field.ident.clone() else {
            continue;
        };
        let ty = field.ty.clone();
        let ty_str = ty.to_token_stream().to_string().replace(' ', "");
        let mut column_name = ident.to_string();
        let mut is_id = false;
        let mut is_skipped = false;
        let mut generated = None;

        for attr in &field.attrs {
            if attr.path().is_ident("persist") {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("column") {
                        let s: LitStr = meta.value()?.parse()?;
                        column_name = s.value();
                    } else if meta.path.is_ident("id") {
                        is_id = true;
                    } else if meta.path.is_ident("skip") {
                        is_skipped = true;
                    } else {
                        return Err(meta.error("unsupported #[persist(...)] key"));
                    }
                    Ok(())
                })?;
            } else if attr.path().is_ident("generated_value") {
                generated = Some(parse_generated_value(attr)?);
            }
        }
        if generated.is_some() && !is_id {
            return Err(syn::Error::new(
                ident.span(),
                "#[generated_value] is only allowed on the #[persist(id)] field",
            ));
        }
        out.push(FieldMetadata {
            ident,
            ty,
            ty_str,
            column_name,
            is_id,
            is_skipped,
            generated,
        });
    }
    Ok(out)
}

/// Expression converting a field into a `ParamValue`.
fn to_param_value(field: &FieldMetadata) -> syn::Result<TokenStream2> {
    let ident = &field.ident;
    let ty_str = field.ty_str.as_str();

    if is_option(&field.ty) {
        return match ty_str {
            s if s.contains("String") => Ok(
                quote! { self.#ident.as_ref().cloned().map(::sqldef_core::ParamValue::String).unwrap_or(::sqldef_core::ParamValue::Null) },
            ),
            s if s.contains("i32") => Ok(
                quote! { self.#ident.map_or(::sqldef_core::ParamValue::Null, ::sqldef_core::ParamValue::I32) },
            ),
            s if s.contains("i64") => Ok(
                quote! { self.#ident.map_or(::sqldef_core::ParamValue::Null, ::sqldef_core::ParamValue::I64) },
            ),
            s if s.contains("f64") => Ok(
                quote! { self.#ident.map_or(::sqldef_core::ParamValue::Null, ::sqldef_core::ParamValue::F64) },
            ),
            s if s.contains("bool") => Ok(
                quote! { self.#ident.map_or(::sqldef_core::ParamValue::Null, ::sqldef_core::ParamValue::Bool) },
            ),
            s if s.contains("NaiveDate") || s.contains("Decimal") || s.contains("Uuid") => Ok(
                quote! { self.#ident.as_ref().map(|v| ::sqldef_core::ParamValue::String(v.to_string())).unwrap_or(::sqldef_core::ParamValue::Null) },
            ),
            _ => Err(syn::Error::new(
                field.ty.span(),
                format!("Unsupported Option type for ParamValue: {ty_str}. Hint: map this field to a supported type (String/i32/i64/f64/bool), or mark it with #[persist(skip)] to exclude it from persistence."),
            )),
        };
    }

    match ty_str {
        "String" => Ok(quote! { ::sqldef_core::ParamValue::String(self.#ident.clone()) }),
        "i32" => Ok(quote! { ::sqldef_core::ParamValue::I32(self.#ident) }),
        "i64" => Ok(quote! { ::sqldef_core::ParamValue::I64(self.#ident) }),
        "f64" => Ok(quote! { ::sqldef_core::ParamValue::F64(self.#ident) }),
        "bool" => Ok(quote! { ::sqldef_core::ParamValue::Bool(self.#ident) }),
        s if s.ends_with("NaiveDateTime")
            || s.ends_with("NaiveDate")
            || s.ends_with("Decimal")
            || s.ends_with("Uuid") =>
        {
            Ok(quote! { ::sqldef_core::ParamValue::String(self.#ident.to_string()) })
        }
        _ => Err(syn::Error::new(
            field.ty.span(),
            format!("Unsupported type for ParamValue: {ty_str}. Hint: map this field to a supported type (String/i32/i64/f64/bool) or mark it with #[persist(skip)]."),
        )),
    }
}

// --- `Entity` derive macro ---

#[proc_macro_derive(Entity, attributes(entity, persist, generated_value))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_entity(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_entity(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let fields_metadata = parse_field_metadata(input)?;

    // --- Get table name ---
    // Look for `#[entity(table = "...")]` first.
    let mut table_name_override = None;
    for attr in &input.attrs {
        if attr.path().is_ident("entity") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("table") {
                    let s: LitStr = meta.value()?.parse()?;
                    table_name_override = Some(s.value());
                    Ok(())
                } else {
                    Err(meta.error("unsupported #[entity(...)] key"))
                }
            })?;
        }
    }

    // If no override, deduce it from the struct name (`User` -> `users`).
    let table_name = table_name_override
        .unwrap_or_else(|| format!("{}s", struct_name.to_string().to_snake_case()));

    if !is_valid_ident(&table_name) {
        return Err(syn::Error::new(
            struct_name.span(),
            format!("Invalid table name `{table_name}`. Use ASCII letters, digits, or `_`, starting with a letter or `_`."),
        ));
    }
    for f in fields_metadata.iter().filter(|f| !f.is_skipped) {
        if !is_valid_ident(&f.column_name) {
            return Err(syn::Error::new(
                f.ident.span(),
                format!("Invalid column name `{}`. Use ASCII letters, digits, or `_`, starting with a letter or `_`.", f.column_name),
            ));
        }
    }

    // Validate exactly one #[persist(id)]
    let id_count = fields_metadata.iter().filter(|f| f.is_id).count();
    if id_count == 0 {
        return Err(syn::Error::new(
            struct_name.span(),
            "A field must be marked with #[persist(id)]. Hint: mark your primary key field like `#[persist(id)]`.",
        ));
    } else if id_count > 1 {
        return Err(syn::Error::new(
            struct_name.span(),
            format!("Exactly one field must be marked with #[persist(id)] (found {id_count})."),
        ));
    }

    let persisted: Vec<_> = fields_metadata.iter().filter(|f| !f.is_skipped).collect();

    let field_metas = persisted.iter().map(|f| {
        let property = f.ident.to_string();
        let column = &f.column_name;
        let id = f.is_id;
        let generated = match &f.generated {
            Some((strategy, generator)) => quote! {
                ::core::option::Option::Some(::sqldef_core::GeneratedValue {
                    strategy: ::sqldef_core::GenerationType::#strategy,
                    generator: #generator,
                })
            },
            None => quote! { ::core::option::Option::None },
        };
        quote! {
            ::sqldef_core::FieldMeta {
                property: #property,
                column: #column,
                id: #id,
                generated: #generated,
            }
        }
    });

    let mut property_arms = Vec::with_capacity(persisted.len());
    for f in &persisted {
        let property = f.ident.to_string();
        let value = to_param_value(f)?;
        property_arms.push(quote! { #property => ::core::option::Option::Some(#value), });
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::sqldef_core::Entity for #struct_name #ty_generics #where_clause {
            const TABLE: &'static str = #table_name;
            const FIELDS: &'static [::sqldef_core::FieldMeta] = &[#(#field_metas),*];
        }

        impl #impl_generics ::sqldef_core::PropertySource for #struct_name #ty_generics #where_clause {
            fn property(&self, name: &str) -> ::core::option::Option<::sqldef_core::ParamValue> {
                match name {
                    #(#property_arms)*
                    _ => ::core::option::Option::None,
                }
            }
        }
    })
}

// --- `mapper` attribute macro ---

const MARKERS: &[&str] = &["create", "read", "update", "delete"];

/// Supertraits that never carry mapper methods.
const IGNORED_BOUNDS: &[&str] = &[
    "Send", "Sync", "Sized", "Unpin", "Clone", "Copy", "Debug", "Default",
];

/// Parses one marker attribute into the expression constructing its value.
fn parse_marker(attr: &Attribute, kind: &str) -> syn::Result<TokenStream2> {
    let mut selective = false;
    let mut filter: Option<LitStr> = None;
    if !matches!(attr.meta, syn::Meta::Path(_)) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("selective") && matches!(kind, "create" | "update") {
                selective = true;
                Ok(())
            } else if meta.path.is_ident("filter") && matches!(kind, "update" | "delete") {
                filter = Some(meta.value()?.parse()?);
                Ok(())
            } else {
                Err(meta.error(format!("unsupported #[{kind}(...)] key")))
            }
        })?;
    }
    let filter = match filter {
        Some(lit) => quote! { ::std::string::String::from(#lit) },
        None => quote! { ::std::string::String::from(::sqldef_core::DEFAULT_FILTER) },
    };
    Ok(match kind {
        "create" => quote! { ::sqldef_core::CreateDefinition { selective: #selective } },
        "read" => quote! { ::sqldef_core::ReadDefinition },
        "update" => {
            quote! { ::sqldef_core::UpdateDefinition { selective: #selective, filter: #filter } }
        }
        _ => quote! { ::sqldef_core::DeleteDefinition { filter: #filter } },
    })
}

/// Expression building the `ParamType` of a declared parameter type.
fn param_type(ty: &Type, type_params: &[Ident]) -> syn::Result<TokenStream2> {
    match ty {
        Type::Reference(r) => param_type(&r.elem, type_params),
        Type::Paren(p) => param_type(&p.elem, type_params),
        Type::Group(g) => param_type(&g.elem, type_params),
        Type::Slice(s) => {
            let inner = param_type(&s.elem, type_params)?;
            Ok(quote! {
                ::sqldef_core::ParamType::Parameterized { raw: "[]", args: ::std::vec![#inner] }
            })
        }
        Type::Array(a) => {
            let inner = param_type(&a.elem, type_params)?;
            Ok(quote! {
                ::sqldef_core::ParamType::Parameterized { raw: "[]", args: ::std::vec![#inner] }
            })
        }
        Type::Path(tp) if tp.qself.is_none() => {
            if let Some(ident) = tp.path.get_ident() {
                if type_params.iter().any(|p| p == ident) {
                    let name = ident.to_string();
                    return Ok(quote! { ::sqldef_core::ParamType::Variable(#name) });
                }
            }
            let Some(last) = tp.path.segments.last() else {
                return Err(syn::Error::new(ty.span(), "empty type path"));
            };
            if let syn::PathArguments::AngleBracketed(args) = &last.arguments {
                let raw = last.ident.to_string();
                let mut inner = Vec::new();
                for arg in &args.args {
                    if let syn::GenericArgument::Type(t) = arg {
                        inner.push(param_type(t, type_params)?);
                    }
                }
                if !inner.is_empty() {
                    return Ok(quote! {
                        ::sqldef_core::ParamType::Parameterized { raw: #raw, args: ::std::vec![#(#inner),*] }
                    });
                }
            }
            Ok(quote! { ::sqldef_core::ParamType::of::<#ty>() })
        }
        _ => Err(syn::Error::new(
            ty.span(),
            "unsupported parameter type for entity inference; use the entity, a reference to it, or a collection of it",
        )),
    }
}

#[proc_macro_attribute]
pub fn mapper(attr: TokenStream, item: TokenStream) -> TokenStream {
    if let Err(err) = reject_arguments(attr.into()) {
        return err.into_compile_error().into();
    }
    let mut input = parse_macro_input!(item as ItemTrait);
    expand_mapper(&mut input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn reject_arguments(attr: TokenStream2) -> syn::Result<()> {
    if attr.is_empty() {
        Ok(())
    } else {
        Err(syn::Error::new(attr.span(), "#[mapper] takes no arguments"))
    }
}

fn expand_mapper(input: &mut ItemTrait) -> syn::Result<TokenStream2> {
    let trait_name = input.ident.to_string();
    let vis = input.vis.clone();
    let definition_ident = Ident::new(&format!("{}Definition", input.ident), input.ident.span());
    let type_params: Vec<Ident> = input.generics.type_params().map(|p| p.ident.clone()).collect();
    let type_param_names: Vec<String> = type_params.iter().map(|p| p.to_string()).collect();

    // Supertraits become generic bindings to their own `<Base>Definition`.
    let mut bindings = Vec::new();
    for bound in &input.supertraits {
        let TypeParamBound::Trait(tb) = bound else {
            continue;
        };
        let Some(last) = tb.path.segments.last() else {
            continue;
        };
        if IGNORED_BOUNDS.iter().any(|b| last.ident == b) {
            continue;
        }
        let mut args = Vec::new();
        if let syn::PathArguments::AngleBracketed(generic_args) = &last.arguments {
            for arg in &generic_args.args {
                if let syn::GenericArgument::Type(t) = arg {
                    args.push(param_type(t, &type_params)?);
                }
            }
        }
        let mut base = tb.path.clone();
        if let Some(seg) = base.segments.last_mut() {
            seg.ident = Ident::new(&format!("{}Definition", seg.ident), seg.ident.span());
            seg.arguments = syn::PathArguments::None;
        }
        bindings.push(quote! {
            .extends(::sqldef_core::GenericBinding::new(
                <#base as ::sqldef_core::MapperDefinition>::interface(),
                ::std::vec![#(#args),*],
            ))
        });
    }

    let mut methods = Vec::new();
    for item in &mut input.items {
        let TraitItem::Fn(method) = item else {
            continue;
        };
        let mut markers = Vec::new();
        let mut kept = Vec::with_capacity(method.attrs.len());
        for attr in method.attrs.drain(..) {
            match MARKERS.iter().find(|m| attr.path().is_ident(m)) {
                Some(kind) => markers.push(parse_marker(&attr, kind)?),
                None => kept.push(attr),
            }
        }
        method.attrs = kept;

        let name = method.sig.ident.to_string();
        // Unmarked methods are recorded by name only; their parameters need not be entities.
        let param = if markers.is_empty() {
            None
        } else {
            method
                .sig
                .inputs
                .iter()
                .find_map(|arg| match arg {
                    FnArg::Typed(pt) => Some(&pt.ty),
                    FnArg::Receiver(_) => None,
                })
                .map(|ty| param_type(ty, &type_params))
                .transpose()?
        };
        let param = param.map(|p| quote! { .param(#p) });
        methods.push(quote! {
            .method(::sqldef_core::MethodDecl::new(#name) #(.marker(#markers))* #param)
        });
    }

    Ok(quote! {
        #input

        /// Declaration of the mapper trait of the same name, generated by `#[mapper]`.
        #[derive(Debug, Clone, Copy, Default)]
        #vis struct #definition_ident;

        impl ::sqldef_core::MapperDefinition for #definition_ident {
            fn interface() -> ::sqldef_core::InterfaceDecl {
                ::sqldef_core::InterfaceDecl::new(::std::concat!(::std::module_path!(), "::", #trait_name))
                    .type_params(&[#(#type_param_names),*])
                    #(#bindings)*
                    #(#methods)*
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn entity_error(input: DeriveInput) -> String {
        match expand_entity(&input) {
            Ok(_) => panic!("expected `{}` to be rejected", input.ident),
            Err(err) => err.to_string(),
        }
    }

    #[test]
    fn entity_requires_an_id_field() {
        let err = entity_error(parse_quote! {
            struct NoId {
                name: String,
            }
        });
        assert!(err.contains("must be marked with #[persist(id)]"), "{err}");
    }

    #[test]
    fn entity_rejects_two_id_fields() {
        let err = entity_error(parse_quote! {
            struct TwoIds {
                #[persist(id)]
                id1: i64,
                #[persist(id)]
                id2: i64,
            }
        });
        assert!(err.contains("found 2"), "{err}");
    }

    #[test]
    fn entity_validates_table_and_column_names() {
        let err = entity_error(parse_quote! {
            #[entity(table = "bad table")]
            struct Bad {
                #[persist(id)]
                id: i64,
            }
        });
        assert!(err.contains("Invalid table name `bad table`"), "{err}");

        let err = entity_error(parse_quote! {
            struct Bad {
                #[persist(id, column = "1st")]
                id: i64,
            }
        });
        assert!(err.contains("Invalid column name `1st`"), "{err}");
    }

    #[test]
    fn entity_rejects_unknown_attribute_keys() {
        let err = entity_error(parse_quote! {
            struct Seq {
                #[persist(id)]
                #[generated_value(strategy = "sequence")]
                id: i64,
            }
        });
        assert!(err.contains("unknown generation strategy `sequence`"), "{err}");

        let err = entity_error(parse_quote! {
            struct Seq {
                #[persist(id, primary)]
                id: i64,
            }
        });
        assert_eq!(err, "unsupported #[persist(...)] key");
    }

    #[test]
    fn generated_value_belongs_on_the_id() {
        let err = entity_error(parse_quote! {
            struct Counter {
                #[persist(id)]
                id: i64,
                #[generated_value(strategy = "auto")]
                hits: i64,
            }
        });
        assert!(err.contains("only allowed on the #[persist(id)] field"), "{err}");
    }

    #[test]
    fn entity_expands_table_and_columns() {
        let input: DeriveInput = parse_quote! {
            #[entity(table = "people")]
            struct Person {
                #[persist(id)]
                #[generated_value(strategy = "identity", generator = "personSeq")]
                id: Option<i64>,
                #[persist(column = "full_name")]
                name: String,
                #[persist(skip)]
                cache: Vec<u8>,
            }
        };
        let out = expand_entity(&input).unwrap().to_string();
        assert!(out.contains("\"people\""));
        assert!(out.contains("\"full_name\""));
        assert!(out.contains("\"personSeq\""));
        assert!(!out.contains("\"cache\""));
    }

    #[test]
    fn mapper_rejects_arguments() {
        assert!(reject_arguments(TokenStream2::new()).is_ok());
        let err = reject_arguments(quote! { backend = "postgres" }).unwrap_err();
        assert_eq!(err.to_string(), "#[mapper] takes no arguments");
    }

    #[test]
    fn mapper_rejects_keys_the_marker_does_not_take() {
        let mut input: ItemTrait = parse_quote! {
            pub trait BaseMapper<T> {
                #[read(selective)]
                fn find_all(&self, example: &T);
            }
        };
        let err = expand_mapper(&mut input).unwrap_err();
        assert_eq!(err.to_string(), "unsupported #[read(...)] key");
    }

    #[test]
    fn mapper_strips_markers_and_records_bases() {
        let mut input: ItemTrait = parse_quote! {
            pub trait UserMapper: BaseMapper<User> + Send + Sync {
                #[delete(filter = "email = #{email}")]
                #[doc = "kept"]
                fn delete_by_email(&self, user: &User);
                fn count(&self) -> i64;
            }
        };
        let out = expand_mapper(&mut input).unwrap().to_string();
        let TraitItem::Fn(method) = &input.items[0] else {
            panic!("expected a method");
        };
        assert_eq!(method.attrs.len(), 1);
        assert!(method.attrs[0].path().is_ident("doc"));

        assert!(out.contains("UserMapperDefinition"));
        assert!(out.contains("BaseMapperDefinition"));
        assert!(!out.contains("SendDefinition"));
        assert!(out.contains("\"email = #{email}\""));
        assert!(out.contains("\"count\""));
    }
}
