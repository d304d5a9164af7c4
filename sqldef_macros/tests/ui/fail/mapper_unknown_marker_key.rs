use sqldef_macros::mapper;

#[mapper]
pub trait BaseMapper<T> {
    #[read(selective)]
    fn find_all(&self, probe: &T);
}

fn main() {}
