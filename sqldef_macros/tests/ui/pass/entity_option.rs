use sqldef_core::{Entity as _, ParamValue, PropertySource};
use sqldef_macros::Entity;

#[derive(Entity, Clone, Debug, PartialEq)]
struct Article {
    #[persist(id)]
    #[generated_value(strategy = "auto")]
    id: Option<i64>,
    title: String,
    subtitle: Option<String>,
    rating: Option<f64>,
}

fn main() {
    // Table name is the pluralized snake_case struct name.
    assert_eq!(Article::TABLE, "articles");
    let a = Article {
        id: Some(5),
        title: "t".into(),
        subtitle: None,
        rating: Some(4.5),
    };
    assert_eq!(a.property("id"), Some(ParamValue::I64(5)));
    assert_eq!(a.property("subtitle"), Some(ParamValue::Null));
    assert_eq!(a.property("rating"), Some(ParamValue::F64(4.5)));
    assert_eq!(a.property("missing"), None);
}
