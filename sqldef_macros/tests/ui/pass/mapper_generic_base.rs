use sqldef_core::{MapperDefinition, ParamType};
use sqldef_macros::{mapper, Entity};

#[derive(Entity)]
struct User {
    #[persist(id)]
    id: i64,
    name: String,
}

#[mapper]
pub trait BaseMapper<T> {
    #[create(selective)]
    fn save(&self, entity: &T);
    #[delete(filter = "name = #{name}")]
    fn delete_by_name(&self, entity: &T);
}

#[mapper]
pub trait UserMapper: BaseMapper<User> + Send {
    #[read]
    fn find_all(&self, probe: &[User]) -> Vec<User>;
    fn count(&self) -> usize;
}

struct Repo;

// Markers are stripped, so the trait stays implementable as written.
impl BaseMapper<User> for Repo {
    fn save(&self, _entity: &User) {}
    fn delete_by_name(&self, _entity: &User) {}
}

impl UserMapper for Repo {
    fn find_all(&self, _probe: &[User]) -> Vec<User> {
        Vec::new()
    }
    fn count(&self) -> usize {
        0
    }
}

fn main() {
    let base = BaseMapperDefinition::interface();
    assert!(base.name().ends_with("::BaseMapper"));
    assert_eq!(base.generic_params(), ["T"]);
    assert_eq!(
        base.declared_methods()[0].first_param(),
        Some(&ParamType::Variable("T"))
    );

    let user = UserMapperDefinition::interface();
    assert_eq!(user.generic_interfaces().len(), 1);
    assert_eq!(user.generic_interfaces()[0].args, vec![ParamType::of::<User>()]);
    assert_eq!(user.all_methods().len(), 4);
    assert!(user.declared_methods()[1].first_param().is_none());
    assert_eq!(Repo.count(), 0);
    let _ = User { id: 1, name: String::new() };
}
