use pretty_assertions::assert_eq;
use serde_json::json;
use tests::*;

#[tokio::test]
async fn insert_then_find() {
    let db = setup().await;
    let categories = assert_ok!(db.table("category"));

    let first = assert_ok!(categories.upsert(json!({ "name": "Pear", "parent": 2 }), None).await);
    assert_eq!(json(first.clone()), json!({ "id": 5, "name": "Pear", "parent": { "id": 2 } }));

    let again = assert_ok!(categories.upsert(json!({ "name": "Pear", "parent": { "id": 2 } }), None).await);
    assert_eq!(again["id"], 5);

    // Same name under another parent is another row.
    let other = assert_ok!(categories.upsert(json!({ "name": "Pear", "parent": 3 }), None).await);
    assert_eq!(other["id"], 6);

    assert_eq!(assert_ok!(categories.count(json!({ "name": "Pear" })).await), 2);
}

#[tokio::test]
async fn existing_row_without_update_is_unchanged() {
    let db = setup().await;
    let products = assert_ok!(db.table("product"));

    let product = assert_ok!(
        products
            .upsert(json!({ "sku": "cream", "name": "Double cream" }), None)
            .await
    );

    assert_eq!(json(product), json!({ "id": 1, "sku": "cream", "name": "Cream" }));
}

#[tokio::test]
async fn existing_row_gets_update() {
    let db = setup().await;
    let products = assert_ok!(db.table("product"));

    let product = assert_ok!(
        products
            .upsert(
                json!({ "sku": "cream", "name": "Cream" }),
                tablet::Record::from(json!({ "name": "Double cream" })),
            )
            .await
    );
    assert_eq!(json(product), json!({ "id": 1, "sku": "cream", "name": "Double cream" }));

    // The update may move the row off its lookup key.
    let product = assert_ok!(
        products
            .upsert(
                json!({ "sku": "gala", "name": "Gala apple" }),
                tablet::Record::from(json!({ "sku": "royal-gala" })),
            )
            .await
    );
    assert_eq!(json(product), json!({ "id": 2, "sku": "royal-gala", "name": "Gala apple" }));

    // A missing row is created from `create` alone.
    let product = assert_ok!(
        products
            .upsert(
                json!({ "sku": "fig", "name": "Fig" }),
                tablet::Record::from(json!({ "name": "Dried fig" })),
            )
            .await
    );
    assert_eq!(json(product), json!({ "id": 4, "sku": "fig", "name": "Fig" }));
}

#[tokio::test]
async fn primary_key_lookup() {
    let db = setup().await;
    let products = assert_ok!(db.table("product"));

    let product = assert_ok!(
        products
            .upsert(
                json!({ "id": 3, "sku": "cucumber", "name": "Cucumber" }),
                tablet::Record::from(json!({ "name": "Mini cucumber" })),
            )
            .await
    );
    assert_eq!(product["name"], "Mini cucumber");

    let product = assert_ok!(
        products
            .upsert(json!({ "id": 10, "sku": "kiwi", "name": "Kiwi" }), None)
            .await
    );
    assert_eq!(json(product), json!({ "id": 10, "sku": "kiwi", "name": "Kiwi" }));
}

#[tokio::test]
async fn no_unique_key_is_a_bad_filter() {
    let db = setup().await;
    let products = assert_ok!(db.table("product"));
    let categories = assert_ok!(db.table("category"));

    let before = db.query_count();

    let err = assert_err!(products.upsert(json!({ "name": "Thing" }), None).await);
    assert!(err.is_bad_filter());
    assert_eq!(err.to_string(), "bad filter for `Product`: [name] does not cover a unique key");

    // `null` never identifies a row to upsert.
    let err = assert_err!(categories.upsert(json!({ "name": "Food", "parent": null }), None).await);
    assert!(err.is_bad_filter());

    assert_eq!(db.query_count(), before);
}

#[tokio::test]
async fn upsert_foreign_key() {
    let db = setup().await;
    let posts = assert_ok!(db.table("post"));

    let post = assert_ok!(
        posts
            .create(json!({
                "title": "Lovelace's Note G",
                "user": {
                    "upsert": {
                        "create": {
                            "firstName": "Augusta",
                            "lastName": "King",
                            "email": "ada@example.com"
                        }
                    }
                }
            }))
            .await
    );
    let user = assert_some!(post["user"].as_record());
    assert_eq!(user["id"], 1);
    assert_eq!(user["firstName"], "Ada");

    let post = assert_ok!(
        posts
            .create(json!({
                "title": "A Mathematical Theory of Communication",
                "user": {
                    "upsert": {
                        "create": {
                            "firstName": "Claude",
                            "lastName": "Shannon",
                            "email": "claude@example.com"
                        },
                        "update": { "active": false }
                    }
                }
            }))
            .await
    );
    assert_eq!(
        json(post["user"].clone()),
        json!({
            "id": 5,
            "firstName": "Claude",
            "lastName": "Shannon",
            "email": "claude@example.com",
            "active": true,
            "firstPost": null
        })
    );
}

#[tokio::test]
async fn upsert_arguments_are_checked() {
    let db = setup().await;
    let posts = assert_ok!(db.table("post"));

    let err = assert_err!(
        posts
            .create(json!({
                "title": "Untitled",
                "user": { "upsert": { "update": { "active": false } } }
            }))
            .await
    );
    assert!(err.is_invalid_payload());
}
