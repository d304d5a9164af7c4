use sqldef_macros::Entity;

#[derive(Entity)]
#[entity(table = "bad table")]
struct Bad {
    #[persist(id)]
    id: i64,
}

fn main() {}
