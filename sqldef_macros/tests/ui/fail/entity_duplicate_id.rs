use sqldef_macros::Entity;

#[derive(Entity)]
struct TwoIds {
    #[persist(id)]
    id1: i64,
    #[persist(id)]
    id2: i64,
}

fn main() {}
