use sqldef_macros::mapper;

#[mapper(backend = "postgres")]
pub trait BaseMapper<T> {
    #[read]
    fn find_all(&self, probe: &T);
}

fn main() {}
