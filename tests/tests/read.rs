use pretty_assertions::assert_eq;
use serde_json::json;
use tablet::{SelectOptions, Value};
use tests::*;

#[tokio::test]
async fn select_all_fields() {
    let db = setup().await;
    let users = assert_ok!(db.table("user"));

    let rows = assert_ok!(
        users
            .select("*", SelectOptions::new().filter(json!({ "id": 1 })))
            .await
    );

    assert_eq!(
        json(rows),
        json!([{
            "id": 1,
            "firstName": "Ada",
            "lastName": "Lovelace",
            "email": "ada@example.com",
            "active": true,
            "firstPost": { "id": 1 }
        }])
    );
}

#[tokio::test]
async fn table_by_model_name() {
    let db = setup().await;

    let shipping = assert_ok!(db.table("OrderShipping"));
    assert_eq!(shipping.model().table, "order_shipping");

    let err = assert_err!(db.table("invoice"));
    assert_eq!(err.to_string(), "invalid payload: unknown table `invoice`");
}

#[tokio::test]
async fn filter_operators() {
    let db = setup().await;
    let users = assert_ok!(db.table("user"));

    let ids = |rows: Vec<tablet::Row>| -> Vec<i64> {
        rows.iter().map(|row| row["id"].as_i64().unwrap()).collect()
    };

    let cases = [
        (json!({ "firstName_like": "A%" }), vec![1, 2]),
        (json!({ "lastName_notLike": "%ing%" }), vec![1, 3, 4]),
        (json!({ "id_ge": 2, "id_lt": 4 }), vec![2, 3]),
        (json!({ "id_ne": 1, "active": true }), vec![2, 3]),
        (json!({ "id": [1, 3] }), vec![1, 3]),
        (json!({ "id_in": [2, 4] }), vec![2, 4]),
        (json!({ "id_ne": [1, 2, 3] }), vec![4]),
        (json!({ "firstPost": null }), vec![2, 3, 4]),
        (json!({ "firstPost_ne": null }), vec![1]),
        (json!([{ "id": 1 }, { "lastName": "Hopper" }]), vec![1, 3]),
        (json!(null), vec![1, 2, 3, 4]),
    ];

    for (filter, expected) in cases {
        let rows = assert_ok!(
            users
                .select("id", SelectOptions::new().filter(filter.clone()).order_by("id"))
                .await
        );
        assert_eq!(ids(rows), expected, "filter={filter}");
    }
}

#[tokio::test]
async fn filter_through_relations() {
    let db = setup().await;
    let users = assert_ok!(db.table("user"));
    let posts = assert_ok!(db.table("post"));

    // A nested filter on the referenced model
    let rows = assert_ok!(
        posts
            .select("title", SelectOptions::new().filter(json!({ "user": { "lastName": "Turing" } })))
            .await
    );
    assert_eq!(json(rows), json!([{ "title": "Computing Machinery and Intelligence" }]));

    // Stub and bare key on a foreign key mean the same
    let by_stub = assert_ok!(posts.count(json!({ "user": { "id": 1 } })).await);
    let by_key = assert_ok!(posts.count(json!({ "user": 1 })).await);
    assert_eq!((by_stub, by_key), (2, 2));

    // A filter on a one-to-many relation
    let rows = assert_ok!(
        users
            .select("id", SelectOptions::new().filter(json!({ "posts": { "title_like": "%Engine%" } })))
            .await
    );
    assert_eq!(json(rows), json!([{ "id": 1 }]));

    // A filter on a many-to-many relation
    let categories = assert_ok!(db.table("category"));
    let rows = assert_ok!(
        categories
            .select("name", SelectOptions::new().filter(json!({ "products": { "sku": "cucumber" } })))
            .await
    );
    assert_eq!(json(rows), json!([{ "name": "Vegetable" }]));
}

#[tokio::test]
async fn unknown_filter_field() {
    let db = setup().await;
    let users = assert_ok!(db.table("user"));

    let err = assert_err!(users.count(json!({ "age_gt": 30 })).await);
    assert!(err.is_invalid_payload());
    assert_eq!(err.to_string(), "invalid payload: unknown field `User::age_gt`");
}

#[tokio::test]
async fn order_and_paging() {
    let db = setup().await;
    let users = assert_ok!(db.table("user"));

    let rows = assert_ok!(
        users
            .select("id", SelectOptions::new().order_by("-id").offset(1).limit(2))
            .await
    );
    assert_eq!(json(rows), json!([{ "id": 3 }, { "id": 2 }]));

    let rows = assert_ok!(
        users
            .select("firstName", SelectOptions::new().order_by(["-active", "firstName"]))
            .await
    );
    assert_eq!(
        json(rows),
        json!([
            { "firstName": "Ada" },
            { "firstName": "Alan" },
            { "firstName": "Grace" },
            { "firstName": "Edsger" }
        ])
    );

    let rows = assert_ok!(users.select("id", SelectOptions::new().offset(3)).await);
    assert_eq!(json(rows), json!([{ "id": 4 }]));
}

#[tokio::test]
async fn nested_selection() {
    let db = setup().await;
    let posts = assert_ok!(db.table("post"));

    let rows = assert_ok!(
        posts
            .select(
                "id, title, user { firstName }, comments { body }",
                SelectOptions::new().filter(json!({ "id_in": [1, 2] })).order_by("id"),
            )
            .await
    );

    assert_eq!(
        json(rows),
        json!([
            {
                "id": 1,
                "title": "Notes on the Analytical Engine",
                "user": { "firstName": "Ada" },
                "comments": [{ "body": "Ahead of its time" }, { "body": "Remarkable" }]
            },
            {
                "id": 2,
                "title": "Bernoulli numbers",
                "user": { "firstName": "Ada" },
                "comments": []
            }
        ])
    );
}

#[tokio::test]
async fn relation_loading_is_batched() {
    let db = setup().await;
    let users = assert_ok!(db.table("user"));

    let before = db.query_count();
    let rows = assert_ok!(
        users
            .select("id, posts { title, comments { body } }", SelectOptions::new())
            .await
    );
    assert_eq!(rows.len(), 4);

    // One select per level: users, posts, comments.
    assert_eq!(db.query_count() - before, 3);
}

#[tokio::test]
async fn one_to_one_and_many_to_many() {
    let db = setup().await;

    let orders = assert_ok!(db.table("order"));
    let rows = assert_ok!(orders.select("code, orderShipping { address }", SelectOptions::new()).await);
    assert_eq!(
        json(rows),
        json!([{ "code": "A-1", "orderShipping": { "address": "12 Analytical Row" } }])
    );

    let categories = assert_ok!(db.table("category"));
    let rows = assert_ok!(
        categories
            .select(
                "name, parent { name }, products { sku }",
                SelectOptions::new().filter(json!({ "id": [1, 4] })).order_by("id"),
            )
            .await
    );
    assert_eq!(
        json(rows),
        json!([
            { "name": "Food", "parent": null, "products": [] },
            { "name": "Apple", "parent": { "name": "Fruit" }, "products": [{ "sku": "gala" }] }
        ])
    );
}

#[tokio::test]
async fn invalid_selection() {
    let db = setup().await;
    let posts = assert_ok!(db.table("post"));

    for fields in ["title {", "title { name }", "author"] {
        let err = assert_err!(posts.select(fields, SelectOptions::new()).await);
        assert!(err.is_invalid_payload(), "{fields}: {err}");
    }
}

#[tokio::test]
async fn count() {
    let db = setup().await;
    let users = assert_ok!(db.table("user"));

    assert_eq!(assert_ok!(users.count(Value::Null).await), 4);
    assert_eq!(assert_ok!(users.count(json!({ "active": false })).await), 1);
    assert_eq!(assert_ok!(users.count(json!({ "id_gt": 10 })).await), 0);
}

#[tokio::test]
async fn get_by_key() {
    let db = setup().await;
    let users = assert_ok!(db.table("user"));

    let ada = assert_some!(assert_ok!(users.get(1).await));
    assert_eq!(ada["email"], "ada@example.com");

    let grace = assert_some!(assert_ok!(users.get(json!({ "email": "grace@example.com" })).await));
    assert_eq!(grace["id"], 3);

    assert_none!(assert_ok!(users.get(99).await));
    assert_none!(assert_ok!(users.get(json!({ "email": "nobody@example.com" })).await));
}

#[tokio::test]
async fn get_by_composite_unique_key() {
    let db = setup().await;
    let categories = assert_ok!(db.table("category"));

    let apple = assert_some!(assert_ok!(categories.get(json!({ "name": "Apple", "parent": { "id": 2 } })).await));
    assert_eq!(apple["id"], 4);

    // A null pins the column too.
    let food = assert_some!(assert_ok!(categories.get(json!({ "name": "Food", "parent": null })).await));
    assert_eq!(food["id"], 1);
}

#[tokio::test]
async fn get_with_bad_filter_sends_nothing() {
    let db = setup().await;
    let users = assert_ok!(db.table("user"));
    let categories = assert_ok!(db.table("category"));

    let before = db.query_count();

    let err = assert_err!(users.get(json!({ "firstName": "Ada" })).await);
    assert!(err.is_bad_filter());
    assert_eq!(
        err.to_string(),
        "bad filter for `User`: [firstName] does not cover a unique key"
    );

    // Half of a composite key
    let err = assert_err!(categories.get(json!({ "name": "Apple" })).await);
    assert!(err.is_bad_filter());

    // Operators do not pin a value
    let err = assert_err!(users.get(json!({ "id_ge": 1 })).await);
    assert!(err.is_bad_filter());

    let err = assert_err!(users.get(Value::Null).await);
    assert!(err.is_bad_filter());

    assert_eq!(db.query_count(), before);
}
