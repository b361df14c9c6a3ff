use pretty_assertions::assert_eq;
use serde_json::json;
use tablet::{Naming, NamingStyle, SchemaConfig, SelectOptions};
use tests::*;

fn field_names(db: &tablet::Database, table: &str) -> Vec<String> {
    let model = assert_some!(db.schema().model_by_table(table));
    model.fields.iter().map(|field| field.name.clone()).collect()
}

#[tokio::test]
async fn introspected_names() {
    let db = setup().await;

    let models: Vec<_> = db.schema().models().map(|model| model.name.as_str()).collect();
    assert_eq!(
        models,
        ["User", "Post", "Comment", "Category", "Product", "ProductCategory", "Order", "OrderShipping"]
    );

    assert_eq!(
        field_names(&db, "user"),
        ["id", "firstName", "lastName", "email", "active", "firstPost", "posts"]
    );
    assert_eq!(field_names(&db, "post"), ["id", "user", "title", "users", "comments"]);
    assert_eq!(field_names(&db, "category"), ["id", "name", "parent", "categories", "products"]);
    assert_eq!(field_names(&db, "order"), ["id", "code", "status", "worker", "orderShipping"]);
}

#[tokio::test]
async fn keys_and_relations() {
    let db = setup().await;
    let schema = db.schema();

    let user = assert_some!(schema.model_by_table("user"));
    let id = assert_some!(user.key_field());
    assert!(id.auto_increment);
    assert_eq!(user.unique_keys.len(), 2);

    let first_post = assert_some!(user.field("firstPost"));
    assert!(first_post.nullable);
    assert!(first_post.is_foreign_key());

    let order = assert_some!(schema.model_by_table("order"));
    let shipping = assert_some!(assert_some!(order.field("orderShipping")).as_related());
    assert!(shipping.unique);

    let posts = assert_some!(assert_some!(user.field("posts")).as_related());
    assert!(!posts.unique);
    assert!(posts.through.is_none());
}

#[tokio::test]
async fn junction_detection() {
    let db = setup().await;
    let schema = db.schema();

    let junction = assert_some!(schema.model_by_table("product_category"));
    assert!(junction.junction);
    assert_eq!(junction.primary_key.len(), 2);

    let product = assert_some!(schema.model_by_table("product"));
    let categories = assert_some!(product.field("categories"));
    assert!(assert_some!(categories.as_related()).is_many_to_many());
    assert_eq!(assert_some!(categories.as_related()).junction(), Some(junction.id));

    // No relation field leads to the junction itself.
    for model in schema.models() {
        for field in model.related_fields() {
            let related = assert_some!(field.as_related());
            assert_ne!(related.target, junction.id, "{}::{}", model.name, field.name);
        }
    }

    // `order_shipping` has one foreign key and an extra column.
    assert!(!assert_some!(schema.model_by_table("order_shipping")).junction);
}

#[tokio::test]
async fn renamed_model() {
    let db = setup().await;

    let mut config = SchemaConfig::new();
    assert_ok!(config.set_model_name(db.schema(), "post", "WebPost"));

    let db = setup_with(|builder| {
        builder.config(config);
    })
    .await;

    assert_eq!(
        field_names(&db, "user"),
        ["id", "firstName", "lastName", "email", "active", "firstWebPost", "webPosts"]
    );
    assert_eq!(field_names(&db, "comment"), ["id", "webPost", "body"]);

    let posts = assert_ok!(db.table("WebPost"));
    assert_eq!(posts.name(), "WebPost");

    let users = assert_ok!(db.table("user"));
    let rows = assert_ok!(
        users
            .select("firstWebPost { title }", SelectOptions::new().filter(json!({ "id": 1 })))
            .await
    );
    assert_eq!(json(rows), json!([{ "firstWebPost": { "title": "Notes on the Analytical Engine" } }]));
}

#[tokio::test]
async fn unknown_table_in_config() {
    let db = setup().await;

    let mut config = SchemaConfig::new();
    let err = assert_err!(config.set_model_name(db.schema(), "invoice", "Bill"));
    assert!(err.is_invalid_schema());
}

#[tokio::test]
async fn list_naming_style() {
    let db = setup_with(|builder| {
        builder.naming(Naming::new().style(NamingStyle::List));
    })
    .await;

    assert_eq!(
        field_names(&db, "category"),
        ["id", "name", "parent", "categoryList", "productList"]
    );
}

#[tokio::test]
async fn insert_update_delete() {
    let db = setup().await;
    let users = assert_ok!(db.table("user"));
    let comments = assert_ok!(db.table("comment"));

    let id = assert_ok!(
        users
            .insert(json!({
                "firstName": "Margaret",
                "lastName": "Hamilton",
                "email": "margaret@example.com",
                "firstPost": { "id": 3 }
            }))
            .await
    );
    assert_eq!(id, 5);

    let margaret = assert_some!(assert_ok!(users.get(5).await));
    assert_eq!(json(margaret["firstPost"].clone()), json!({ "id": 3 }));
    assert_eq!(margaret["active"], true);

    assert_eq!(assert_ok!(users.update(json!({ "active": false }), json!({ "id_ge": 3 })).await), 3);
    assert_eq!(assert_ok!(users.count(json!({ "active": false })).await), 3);

    // Nothing to set
    assert_eq!(assert_ok!(users.update(json!({}), serde_json::Value::Null).await), 0);

    assert_eq!(assert_ok!(comments.delete(json!({ "post": 1 })).await), 2);
    assert_eq!(assert_ok!(comments.delete(json!({ "post": 1 })).await), 0);
    assert_eq!(assert_ok!(comments.count(serde_json::Value::Null).await), 1);

    // Relations are not plain columns.
    let err = assert_err!(users.insert(json!({ "firstName": "X", "posts": { "create": [] } })).await);
    assert!(err.is_invalid_payload());
}

#[tokio::test]
async fn failing_setup_script() {
    let err = assert_err!(
        tablet::Database::builder()
            .script("CREATE TABLE (")
            .connect("sqlite::memory:")
            .await
    );
    assert!(err.is_driver_operation_failed());
    assert!(err.to_string().starts_with("running setup script: "), "{err}");
}
