use sqldef_macros::Entity;

#[derive(Entity)]
struct Seq {
    #[persist(id)]
    #[generated_value(strategy = "sequence")]
    id: i64,
}

fn main() {}
