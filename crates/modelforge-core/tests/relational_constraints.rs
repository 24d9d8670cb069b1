use modelforge_core::metadata::DeleteBehavior;
use modelforge_core::reflect::{MemberInfo, ScalarType, TypeInfo, TypeRef, TypeRegistry};
use modelforge_core::storage::DefaultTypeMappingSource;
use modelforge_core::{ConfigurationSource, ConventionSet, FinalizedModel, ModelBuilder, RelationalOptions};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std_util::{assert_none, assert_some};

const EXPLICIT: ConfigurationSource = ConfigurationSource::Explicit;

fn types() -> TypeRegistry {
    TypeRegistry::new()
        .with(
            TypeInfo::new("Blog")
                .member(MemberInfo::property("Id", ScalarType::I32))
                .member(MemberInfo::property("Url", ScalarType::String))
                .member(MemberInfo::property("Posts", TypeRef::collection(TypeRef::entity("Post")))),
        )
        .with(
            TypeInfo::new("Post")
                .member(MemberInfo::property("Id", ScalarType::I32))
                .member(MemberInfo::property("Title", ScalarType::String))
                .member(MemberInfo::property("BlogId", ScalarType::I32))
                .member(MemberInfo::property("Blog", TypeRef::entity("Blog"))),
        )
        .with(
            TypeInfo::new("PostSummary")
                .member(MemberInfo::property("Title", ScalarType::String))
                .member(MemberInfo::property("Comments", ScalarType::I32)),
        )
}

fn blogging(options: RelationalOptions) -> FinalizedModel {
    let mut mb = ModelBuilder::new(types(), ConventionSet::default_set());

    let mut blog = mb.entity("Blog", EXPLICIT).unwrap();
    blog.has_key(&["Url"], EXPLICIT).unwrap();

    let mut post = mb.entity("Post", EXPLICIT).unwrap();
    post.has_index(&["Title"], EXPLICIT)
        .unwrap()
        .has_name("IX_post_title", EXPLICIT)
        .unwrap()
        .is_unique(true, EXPLICIT)
        .unwrap();

    let mut summary = mb.entity("PostSummary", EXPLICIT).unwrap();
    summary.has_no_key(EXPLICIT).unwrap();
    summary.to_view("post_summaries", None, EXPLICIT).unwrap();

    mb.finalize_with(options, Arc::new(DefaultTypeMappingSource::default()))
        .unwrap()
}

#[test]
fn constraint_names() {
    let model = blogging(RelationalOptions::new());
    let relational = model.relational();

    let blog = relational.find_table("Blog", None).unwrap();
    assert_eq!(blog.primary_key.as_ref().unwrap().name, "PK_Blog");
    let alternate: Vec<_> = blog.unique_constraints.iter().map(|uc| uc.name.as_str()).collect();
    assert_eq!(alternate, ["AK_Blog_Url"]);

    let post = relational.find_table("Post", None).unwrap();
    assert_eq!(post.primary_key.as_ref().unwrap().name, "PK_Post");

    assert_eq!(post.foreign_keys.len(), 1);
    let fk = &post.foreign_keys[0];
    assert_eq!(fk.name, "FK_Post_Blog_BlogId");
    assert_eq!(fk.principal_table, blog.id);
    assert_eq!(relational.column(fk.principal_columns[0]).name, "Id");
    assert_eq!(fk.on_delete, DeleteBehavior::Cascade);

    let mut indexes: Vec<_> = post
        .indexes
        .iter()
        .map(|index| (index.name.as_str(), index.is_unique))
        .collect();
    indexes.sort();
    assert_eq!(indexes, [("IX_Post_BlogId", false), ("IX_post_title", true)]);
}

#[test]
fn generated_table_names_follow_options() {
    let mut options = RelationalOptions::new();
    options
        .table_name_prefix("app_")
        .pluralize_table_names(true)
        .default_schema("blogging");
    let model = blogging(options);
    let relational = model.relational();

    assert_none!(relational.find_table("Blog", None));
    let blogs = relational.find_table("app_Blogs", Some("blogging")).unwrap();
    assert_eq!(blogs.schema(), Some("blogging"));
    assert_eq!(blogs.primary_key.as_ref().unwrap().name, "PK_app_Blogs");

    let posts = relational.find_table("app_Posts", Some("blogging")).unwrap();
    assert_eq!(posts.foreign_keys[0].name, "FK_app_Posts_app_Blogs_BlogId");

    // Configured names are left alone
    let summaries = relational.find_table("post_summaries", Some("blogging")).unwrap();
    assert!(summaries.is_view());
}

#[test]
fn views_have_no_constraints() {
    let model = blogging(RelationalOptions::new());
    let relational = model.relational();

    let summaries = relational.find_table("post_summaries", None).unwrap();
    assert!(summaries.is_view());
    assert_eq!(summaries.columns.len(), 2);
    assert_none!(&summaries.primary_key);
    assert!(summaries.unique_constraints.is_empty());
    assert!(summaries.foreign_keys.is_empty());
    assert!(summaries.indexes.is_empty());
}

#[test]
fn explicit_table_and_schema() {
    let mut mb = ModelBuilder::new(types(), ConventionSet::default_set());
    mb.entity("Blog", EXPLICIT)
        .unwrap()
        .to_table("blogs", Some("content"), EXPLICIT)
        .unwrap()
        .has_comment("Weblogs", EXPLICIT)
        .unwrap();
    mb.entity("Post", EXPLICIT).unwrap();
    let model = mb.finalize().unwrap();
    let relational = model.relational();

    let blogs = assert_some!(relational.find_table("blogs", Some("content")));
    assert_eq!(blogs.comment.as_deref(), Some("Weblogs"));
    assert_none!(relational.find_table("blogs", None));

    let posts = relational.find_table("Post", None).unwrap();
    assert_eq!(posts.foreign_keys[0].name, "FK_Post_blogs_BlogId");
}

#[test]
fn entity_types_can_share_a_table() {
    let types = TypeRegistry::new()
        .with(
            TypeInfo::new("Order")
                .member(MemberInfo::property("Id", ScalarType::I32))
                .member(MemberInfo::property("Status", ScalarType::String)),
        )
        .with(
            TypeInfo::new("OrderDetail")
                .member(MemberInfo::property("Id", ScalarType::I32))
                .member(MemberInfo::property("ShippingAddress", ScalarType::String)),
        );
    let mut mb = ModelBuilder::new(types, ConventionSet::default_set());

    let mut order = mb.entity("Order", EXPLICIT).unwrap();
    order.to_table("Orders", None, EXPLICIT).unwrap();
    let order_id = order.id();
    order
        .property("Id", ScalarType::I32, EXPLICIT)
        .unwrap()
        .has_comment("order key", EXPLICIT)
        .unwrap();

    let mut detail = mb.entity("OrderDetail", EXPLICIT).unwrap();
    detail.to_table("Orders", None, EXPLICIT).unwrap();
    detail
        .property("Id", ScalarType::I32, EXPLICIT)
        .unwrap()
        .has_comment("detail key", EXPLICIT)
        .unwrap();
    detail
        .has_relationship(order_id, Some(&["Id"][..]), None, EXPLICIT)
        .unwrap()
        .is_unique(true, EXPLICIT)
        .unwrap();

    let model = mb.finalize().unwrap();
    let relational = model.relational();

    assert_eq!(relational.tables().len(), 1);
    let orders = relational.find_table("Orders", None).unwrap();
    let mut names: Vec<_> = orders.columns.iter().map(|column| column.name.as_str()).collect();
    names.sort();
    assert_eq!(names, ["Id", "ShippingAddress", "Status"]);

    // The first entity type mapped to a column configures it
    let id = orders.find_column("Id").unwrap();
    assert_eq!(id.properties.len(), 2);
    assert_eq!(id.comment.as_deref(), Some("order key"));

    assert_eq!(orders.primary_key.as_ref().unwrap().name, "PK_Orders");
    assert!(orders.foreign_keys.is_empty());
    assert!(orders.indexes.is_empty());
}
