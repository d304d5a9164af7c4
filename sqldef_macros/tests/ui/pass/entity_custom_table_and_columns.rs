use sqldef_core::{Entity as _, EntityType, GenerationType};
use sqldef_macros::Entity;

#[derive(Entity, Clone, Debug, PartialEq)]
#[entity(table = "people")]
struct Person {
    #[persist(id, column = "person_id")]
    #[generated_value(strategy = "identity", generator = "personSeq")]
    id: i64,
    #[persist(column = "email_address")]
    email: String,
    #[persist(column = "full_name")]
    name: String,
    #[persist(skip)]
    scratch: Vec<u8>,
}

fn main() {
    assert_eq!(Person::TABLE, "people");
    let ty = EntityType::of::<Person>();
    let columns: Vec<_> = ty.fields().iter().map(|f| f.column).collect();
    assert_eq!(columns, ["person_id", "email_address", "full_name"]);
    let generated = ty.fields()[0].generated.unwrap();
    assert_eq!(generated.strategy, GenerationType::Identity);
    assert_eq!(generated.generator, "personSeq");
}
