use sqldef::{
    Configuration, DefinitionError, DefinitionStatementFactory, GeneratedKeys, KeyPhase,
    MapperDefinition, MapperRegistry, OperationKind, ParamValue, Placeholder, Settings,
    StatementCatalog, StatementFactory,
};
use tests_common::{
    sequenced_configuration, AccountMapperDefinition, LedgerMapperDefinition, NoteMapperDefinition,
    OpenMapperDefinition, RecordingCatalog, TagMapperDefinition, User, UserMapperDefinition,
    ACCOUNT_SEQ,
};

fn user_mapper_id(method: &str) -> String {
    format!("{}.{}", UserMapperDefinition::interface().name(), method)
}

fn registered(config: Configuration) -> Configuration {
    let mut registry = MapperRegistry::new(DefinitionStatementFactory::new(config));
    registry.add_mapper::<UserMapperDefinition>().unwrap();
    registry.into_catalog()
}

fn script(config: &Configuration, method: &str) -> String {
    config
        .statement(&user_mapper_id(method))
        .unwrap_or_else(|| panic!("{method} is not registered"))
        .script
        .clone()
}

#[test]
fn one_statement_per_marked_method() {
    let mut registry = MapperRegistry::new(DefinitionStatementFactory::new(Configuration::default()));
    let added = registry.add_mapper::<UserMapperDefinition>().unwrap();
    assert_eq!(added, 9);

    let config = registry.into_catalog();
    for method in [
        "save",
        "save_selective",
        "find_all",
        "update",
        "update_selective",
        "delete",
        "update_by_email",
        "delete_all",
        "save_batch",
    ] {
        assert!(config.has_statement(&user_mapper_id(method)), "{method}");
    }
    assert!(!config.has_statement(&user_mapper_id("count")));
    assert_eq!(config.statements().count(), 9);
}

#[test]
fn resource_is_marked_loaded_once() {
    let catalog = RecordingCatalog::new(Configuration::default());
    let mut registry = MapperRegistry::new(DefinitionStatementFactory::new(catalog));
    registry.add_mapper::<UserMapperDefinition>().unwrap();

    let catalog = registry.into_catalog();
    let tag = format!("interface {}", UserMapperDefinition::interface().name());
    assert_eq!(catalog.resource_marks, vec![tag.clone()]);
    assert!(catalog.is_resource_loaded(&tag));
    assert_eq!(catalog.statement_ids.len(), 9);
}

#[test]
fn statements_carry_the_interface_resource() {
    let config = registered(Configuration::default());
    let stmt = config.statement(&user_mapper_id("save")).unwrap();
    let expected = format!(
        "{}.rs (best guess)",
        UserMapperDefinition::interface().name().replace("::", "/")
    );
    assert_eq!(stmt.resource, expected);
}

#[test]
fn update_and_delete_filters() {
    let config = registered(Configuration::default());
    assert_eq!(
        script(&config, "update"),
        "<script> update users set email_address = #{email}, full_name = #{name}, active = #{active} where id = #{id}</script>"
    );
    assert!(script(&config, "delete").ends_with(" where id = #{id}</script>"));
    assert_eq!(
        script(&config, "update_by_email"),
        "<script> update users set email_address = #{email}, full_name = #{name}, active = #{active} where email_address = #{email}</script>"
    );
    assert_eq!(
        script(&config, "delete_all"),
        "<script> delete from users</script>"
    );
    assert_eq!(
        script(&config, "find_all"),
        "<script> select id, email_address, full_name, active from users</script>"
    );
}

#[test]
fn generic_base_methods_resolve_the_bound_entity() {
    let config = registered(Configuration::default());
    let save = config.statement(&user_mapper_id("save")).unwrap();
    assert_eq!(save.kind, OperationKind::Create);
    assert_eq!(
        save.script,
        "<script> insert into users (email_address, full_name, active) values (#{email}, #{name}, #{active})</script>"
    );
    // A collection parameter stands for its element type.
    assert_eq!(
        config.statement(&user_mapper_id("save_batch")).unwrap().script,
        save.script
    );
}

#[test]
fn create_on_auto_key_binds_generated_keys() {
    let config = registered(Configuration::default());
    for method in ["save", "save_selective", "save_batch"] {
        let key = config
            .statement(&user_mapper_id(method))
            .unwrap()
            .key
            .as_ref()
            .unwrap();
        assert_eq!(key.generator.name(), GeneratedKeys::NAME);
        assert_eq!(key.generator.phase(), KeyPhase::AfterInsert);
        assert_eq!(key.key_property, "id");
        assert_eq!(key.key_column, "id");
    }
    for method in ["find_all", "update", "delete"] {
        assert!(config.statement(&user_mapper_id(method)).unwrap().key.is_none());
    }
}

#[test]
fn identity_key_without_generator_fails() {
    let mut registry = MapperRegistry::new(DefinitionStatementFactory::new(Configuration::default()));
    let err = registry.add_mapper::<AccountMapperDefinition>().unwrap_err();
    assert_eq!(err.to_string(), "can not find accountSeq in configuration");
    assert!(matches!(err, DefinitionError::MissingKeyGenerator { ref name } if name == ACCOUNT_SEQ));
    assert!(err.is_configuration());

    // A failed mapper is not recorded, so registering it again still fails.
    assert!(!registry.has_mapper(AccountMapperDefinition::interface().name()));
    let again = registry.add_mapper::<AccountMapperDefinition>().unwrap_err();
    assert!(matches!(again, DefinitionError::MissingKeyGenerator { ref name } if name == ACCOUNT_SEQ));
    assert_eq!(registry.catalog().statements().count(), 0);
}

#[test]
fn identity_key_uses_named_and_default_generators() {
    let mut registry = MapperRegistry::new(DefinitionStatementFactory::new(sequenced_configuration()));
    registry.add_mapper::<AccountMapperDefinition>().unwrap();
    registry.add_mapper::<TagMapperDefinition>().unwrap();
    let config = registry.into_catalog();

    let account_save = format!("{}.save", AccountMapperDefinition::interface().name());
    let stmt = config.statement(&account_save).unwrap();
    assert_eq!(
        stmt.script,
        "<script> insert into accounts (id, owner, balance) values (#{id}, #{owner}, #{balance})</script>"
    );
    let key = stmt.key.as_ref().unwrap();
    assert_eq!(key.generator.name(), ACCOUNT_SEQ);
    assert_eq!(key.generator.phase(), KeyPhase::BeforeInsert);

    let tag_save = format!("{}.save", TagMapperDefinition::interface().name());
    let key = config.statement(&tag_save).unwrap().key.as_ref().unwrap();
    assert_eq!(key.generator.name(), sqldef::DEFAULT_KEY_GENERATOR);
}

#[test]
fn default_generator_name_comes_from_settings() {
    let mut config = Configuration::new(Settings {
        default_key_generator: "tagSeq".to_string(),
        ..Settings::default()
    });
    let mut registry = MapperRegistry::new(DefinitionStatementFactory::new(&mut config));
    let err = registry.add_mapper::<TagMapperDefinition>().unwrap_err();
    assert!(matches!(err, DefinitionError::MissingKeyGenerator { ref name } if name == "tagSeq"));
}

#[test]
fn assigned_key_has_no_binding() {
    let mut registry = MapperRegistry::new(DefinitionStatementFactory::new(Configuration::default()));
    registry.add_mapper::<NoteMapperDefinition>().unwrap();
    let config = registry.into_catalog();
    let name = NoteMapperDefinition::interface().name().to_string();
    let save = config.statement(&format!("{name}.save")).unwrap();
    assert_eq!(
        save.script,
        "<script> insert into notes (note_id, body) values (#{id}, #{body})</script>"
    );
    assert!(save.key.is_none());
    assert!(config.has_statement(&format!("{name}.find_by_note")));
}

#[test]
fn intermediate_generic_mapper_forwards_entity() {
    let mut registry = MapperRegistry::new(DefinitionStatementFactory::new(sequenced_configuration()));
    assert_eq!(registry.add_mapper::<LedgerMapperDefinition>().unwrap(), 7);
    let config = registry.into_catalog();
    let name = LedgerMapperDefinition::interface().name().to_string();
    assert_eq!(
        config
            .statement(&format!("{name}.delete_by_owner"))
            .unwrap()
            .script,
        "<script> delete from accounts where owner = #{owner}</script>"
    );
}

#[test]
fn unbound_type_variable_is_an_error() {
    let mut registry = MapperRegistry::new(DefinitionStatementFactory::new(Configuration::default()));
    let err = registry.add_mapper::<OpenMapperDefinition>().unwrap_err();
    match err {
        DefinitionError::UnresolvedTypeVariable {
            interface,
            variable,
        } => {
            assert_eq!(interface, OpenMapperDefinition::interface().name());
            assert_eq!(variable, "T");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn selective_and_full_templates_differ() {
    let config = registered(Configuration::new(Settings {
        placeholder: Placeholder::Question,
        ..Settings::default()
    }));
    assert_ne!(script(&config, "save"), script(&config, "save_selective"));
    assert_ne!(script(&config, "update"), script(&config, "update_selective"));

    let mut user = User::new("a@example.com");
    let full = config.statement(&user_mapper_id("save")).unwrap();
    let bound = full.bound_sql(&user).unwrap();
    assert_eq!(
        bound.sql,
        "insert into users (email_address, full_name, active) values (?, ?, ?)"
    );
    assert_eq!(bound.parameters.len(), 3);

    let selective = config.statement(&user_mapper_id("save_selective")).unwrap();
    let bound = selective.bound_sql(&user).unwrap();
    assert_eq!(
        bound.sql,
        "insert into users (email_address,active) values (?,?)"
    );
    assert_eq!(
        bound.values(),
        vec![
            ParamValue::String("a@example.com".into()),
            ParamValue::Bool(true)
        ]
    );

    user.name = Some("Ada".into());
    let bound = selective.bound_sql(&user).unwrap();
    assert_eq!(bound.parameters.len(), 3);
}

#[test]
fn selective_update_with_numbered_placeholders() {
    let config = registered(Configuration::new(Settings {
        placeholder: Placeholder::Dollar,
        ..Settings::default()
    }));
    let mut user = User::new("a@example.com");
    user.id = Some(7);
    let stmt = config.statement(&user_mapper_id("update_selective")).unwrap();
    let bound = stmt.bound_sql(&user).unwrap();
    assert_eq!(
        bound.sql,
        "update users set email_address = $1,active = $2 where id = $3"
    );
    assert_eq!(bound.values()[2], ParamValue::I64(7));
}

#[test]
fn synthesis_is_deterministic() {
    let a = registered(Configuration::default());
    let b = registered(Configuration::default());
    let left: Vec<_> = a.statements().collect();
    let right: Vec<_> = b.statements().collect();
    assert_eq!(left, right);
}

#[test]
fn re_registering_is_a_no_op_but_direct_duplicates_fail() {
    let mut registry = MapperRegistry::new(DefinitionStatementFactory::new(Configuration::default()));
    registry.add_mapper::<UserMapperDefinition>().unwrap();
    assert_eq!(registry.add_mapper::<UserMapperDefinition>().unwrap(), 0);

    let mut factory = DefinitionStatementFactory::new(registry.into_catalog());
    let iface = UserMapperDefinition::interface();
    let save = iface
        .all_methods()
        .into_iter()
        .find(|m| m.name() == "save")
        .unwrap();
    let err = factory.parse_statement(save, &iface).unwrap_err();
    assert!(matches!(err, DefinitionError::DuplicateStatement { ref id } if *id == user_mapper_id("save")));
}
