use pretty_assertions::assert_eq;
use serde_json::json;
use tablet::SelectOptions;
use tests::*;

async fn children(db: &tablet::Database, parent: i64) -> serde_json::Value {
    let categories = assert_ok!(db.table("category"));
    let rows = assert_ok!(
        categories
            .select("name", SelectOptions::new().filter(json!({ "parent": parent })).order_by("id"))
            .await
    );
    json(rows)
}

#[tokio::test]
async fn scalar_fields() {
    let db = setup().await;
    let users = assert_ok!(db.table("user"));

    let user = assert_ok!(
        users
            .modify(json!({ "lastName": "King", "active": false }), json!({ "email": "ada@example.com" }))
            .await
    );

    assert_eq!(
        json(user),
        json!({
            "id": 1,
            "firstName": "Ada",
            "lastName": "King",
            "email": "ada@example.com",
            "active": false,
            "firstPost": { "id": 1 }
        })
    );
}

#[tokio::test]
async fn new_primary_key_is_followed() {
    let db = setup().await;
    let products = assert_ok!(db.table("product"));

    let product = assert_ok!(products.modify(json!({ "id": 20, "name": "Clotted cream" }), 1).await);
    assert_eq!(json(product), json!({ "id": 20, "sku": "cream", "name": "Clotted cream" }));

    assert_none!(assert_ok!(products.get(1).await));
}

#[tokio::test]
async fn connect_children() {
    let db = setup().await;
    let categories = assert_ok!(db.table("category"));

    let food = assert_ok!(categories.modify(json!({ "categories": { "connect": [{ "id": 4 }] } }), 1).await);

    assert_eq!(
        json(food),
        json!({
            "id": 1,
            "name": "Food",
            "parent": null,
            "categories": [
                { "id": 2, "name": "Fruit", "parent": { "id": 1 } },
                { "id": 3, "name": "Vegetable", "parent": { "id": 1 } },
                { "id": 4, "name": "Apple", "parent": { "id": 1 } }
            ]
        })
    );

    assert_eq!(children(&db, 2).await, json!([]));
}

#[tokio::test]
async fn create_children() {
    let db = setup().await;
    let categories = assert_ok!(db.table("category"));

    assert_ok!(
        categories
            .modify(json!({ "categories": { "create": [{ "name": "Grain" }, { "name": "Dairy" }] } }), 1)
            .await
    );

    assert_eq!(
        children(&db, 1).await,
        json!([{ "name": "Fruit" }, { "name": "Vegetable" }, { "name": "Grain" }, { "name": "Dairy" }])
    );
}

#[tokio::test]
async fn upsert_children_by_owner_key() {
    let db = setup().await;
    let categories = assert_ok!(db.table("category"));

    // `Fruit` is found through (name, parent) with the parent taken from
    // the row being modified; `Nuts` is missing and gets created under it.
    assert_ok!(
        categories
            .modify(
                json!({
                    "categories": {
                        "upsert": [
                            { "create": { "name": "Fruit" }, "update": { "name": "Fruits" } },
                            { "create": { "name": "Nuts" }, "update": { "name": "Seeds" } }
                        ]
                    }
                }),
                1,
            )
            .await
    );

    assert_eq!(
        children(&db, 1).await,
        json!([{ "name": "Fruits" }, { "name": "Vegetable" }, { "name": "Nuts" }])
    );

    // An `Apple` exists, but not under `Food`.
    assert_ok!(
        categories
            .modify(json!({ "categories": { "upsert": { "create": { "name": "Apple" } } } }), 1)
            .await
    );
    assert_eq!(assert_ok!(categories.count(json!({ "name": "Apple" })).await), 2);
}

#[tokio::test]
async fn update_child() {
    let db = setup().await;
    let categories = assert_ok!(db.table("category"));

    let food = assert_ok!(
        categories
            .modify(
                json!({
                    "categories": {
                        "update": { "where": { "name": "Vegetable" }, "data": { "name": "Veg" } }
                    }
                }),
                1,
            )
            .await
    );
    assert_eq!(food["categories"].expect_list().len(), 2);
    assert_eq!(children(&db, 1).await, json!([{ "name": "Fruit" }, { "name": "Veg" }]));

    // `Apple` is not a child of `Food`; nothing changes.
    assert_ok!(
        categories
            .modify(
                json!({
                    "categories": {
                        "update": { "where": { "name": "Apple" }, "data": { "name": "Pear" } }
                    }
                }),
                1,
            )
            .await
    );
    assert_eq!(assert_ok!(categories.count(json!({ "name": "Apple" })).await), 1);
}

#[tokio::test]
async fn delete_children() {
    let db = setup().await;
    let posts = assert_ok!(db.table("post"));

    let post = assert_ok!(posts.modify(json!({ "comments": { "delete": [2, 3] } }), 1).await);

    // Comment 3 belongs to another post and is left alone.
    assert_eq!(
        json(post["comments"].clone()),
        json!([{ "id": 1, "post": { "id": 1 }, "body": "Ahead of its time" }])
    );

    let comments = assert_ok!(db.table("comment"));
    assert_eq!(assert_ok!(comments.count(serde_json::Value::Null).await), 2);
}

#[tokio::test]
async fn disconnect_children() {
    let db = setup().await;
    let categories = assert_ok!(db.table("category"));

    let food = assert_ok!(
        categories
            .modify(json!({ "categories": { "disconnect": { "name": "Vegetable" } } }), 1)
            .await
    );
    assert_eq!(
        json(food["categories"].clone()),
        json!([{ "id": 2, "name": "Fruit", "parent": { "id": 1 } }])
    );

    let vegetable = assert_some!(assert_ok!(categories.get(3).await));
    assert!(vegetable["parent"].is_null());
}

#[tokio::test]
async fn disconnect_requires_nullable_foreign_key() {
    let db = setup().await;
    let users = assert_ok!(db.table("user"));
    let posts = assert_ok!(db.table("post"));

    let before = db.query_count();

    let err = assert_err!(users.modify(json!({ "posts": { "disconnect": [1] } }), 1).await);
    assert!(err.is_invalid_payload());

    let err = assert_err!(posts.modify(json!({ "user": { "disconnect": true } }), 1).await);
    assert!(err.is_invalid_payload());

    assert_eq!(db.query_count(), before);
}

#[tokio::test]
async fn disconnect_foreign_key() {
    let db = setup().await;
    let users = assert_ok!(db.table("user"));

    let ada = assert_ok!(users.modify(json!({ "firstPost": { "disconnect": true } }), 1).await);
    assert!(ada["firstPost"].is_null());

    let ada = assert_ok!(users.modify(json!({ "firstPost": { "connect": { "id": 2 } } }), 1).await);
    assert_eq!(
        json(ada["firstPost"].clone()),
        json!({ "id": 2, "user": { "id": 1 }, "title": "Bernoulli numbers" })
    );
}

#[tokio::test]
async fn missing_rows() {
    let db = setup().await;
    let categories = assert_ok!(db.table("category"));

    let err = assert_err!(categories.modify(json!({ "name": "Nothing" }), 99).await);
    assert!(err.is_record_not_found());

    let err = assert_err!(
        categories
            .modify(json!({ "name": "Groceries", "categories": { "connect": { "id": 99 } } }), 1)
            .await
    );
    assert!(err.is_record_not_found());

    // The rename before the failed connect was rolled back.
    let food = assert_some!(assert_ok!(categories.get(1).await));
    assert_eq!(food["name"], "Food");
}

#[tokio::test]
async fn bad_filter() {
    let db = setup().await;
    let categories = assert_ok!(db.table("category"));

    let before = db.query_count();

    let err = assert_err!(categories.modify(json!({ "name": "Groceries" }), json!({ "name": "Food" })).await);
    assert!(err.is_bad_filter());
    assert_eq!(
        err.to_string(),
        "bad filter for `Category`: [name] does not cover a unique key"
    );

    assert_eq!(db.query_count(), before);
}

#[tokio::test]
async fn one_to_one_child() {
    let db = setup().await;
    let orders = assert_ok!(db.table("order"));

    let order = assert_ok!(
        orders
            .create(json!({
                "code": "A-2",
                "status": "new",
                "orderShipping": { "create": { "address": "1 Difference Lane" } }
            }))
            .await
    );

    assert_eq!(
        json(order["orderShipping"].clone()),
        json!({ "id": 2, "order": { "id": 2 }, "address": "1 Difference Lane" })
    );
}
