use pretty_assertions::assert_eq;
use serde_json::json;
use tests::*;

#[tokio::test]
async fn junction_is_a_plain_table() {
    let db = setup().await;
    let links = assert_ok!(db.table("product_category"));

    assert_eq!(assert_ok!(links.count(serde_json::Value::Null).await), 2);

    // Composite keys come back as a record of field names.
    let key = assert_ok!(links.insert(json!({ "product": 1, "category": 1 })).await);
    assert_eq!(json(key), json!({ "product": 1, "category": 1 }));
}

#[tokio::test]
async fn connect_is_idempotent() {
    let db = setup().await;
    let products = assert_ok!(db.table("product"));
    let links = assert_ok!(db.table("product_category"));

    for _ in 0..2 {
        let product = assert_ok!(
            products
                .modify(json!({ "categories": { "connect": [{ "id": 1 }] } }), json!({ "sku": "cream" }))
                .await
        );
        assert_eq!(
            json(product["categories"].clone()),
            json!([{ "id": 1, "name": "Food", "parent": null }])
        );
    }

    assert_eq!(assert_ok!(links.count(json!({ "product": 1 })).await), 1);
}

#[tokio::test]
async fn create_with_links() {
    let db = setup().await;
    let products = assert_ok!(db.table("product"));

    let product = assert_ok!(
        products
            .create(json!({
                "sku": "brie",
                "name": "Brie",
                "categories": {
                    "connect": [{ "name": "Food", "parent": null }],
                    "create": [{ "name": "Cheese", "parent": 1 }]
                }
            }))
            .await
    );

    assert_eq!(
        json(product),
        json!({
            "id": 4,
            "sku": "brie",
            "name": "Brie",
            "categories": [
                { "id": 1, "name": "Food", "parent": null },
                { "id": 5, "name": "Cheese", "parent": { "id": 1 } }
            ]
        })
    );
}

#[tokio::test]
async fn upsert_target() {
    let db = setup().await;
    let categories = assert_ok!(db.table("category"));
    let products = assert_ok!(db.table("product"));

    let fruit = assert_ok!(
        categories
            .modify(
                json!({
                    "products": {
                        "upsert": [
                            { "create": { "sku": "gala", "name": "Gala" } },
                            { "create": { "sku": "pear", "name": "Pear" } }
                        ]
                    }
                }),
                2,
            )
            .await
    );

    assert_eq!(
        json(fruit["products"].clone()),
        json!([
            { "id": 2, "sku": "gala", "name": "Gala apple" },
            { "id": 4, "sku": "pear", "name": "Pear" }
        ])
    );

    assert_eq!(assert_ok!(products.count(serde_json::Value::Null).await), 4);
}

#[tokio::test]
async fn update_linked_target() {
    let db = setup().await;
    let products = assert_ok!(db.table("product"));
    let categories = assert_ok!(db.table("category"));

    assert_ok!(
        products
            .modify(
                json!({
                    "categories": {
                        "update": [
                            { "where": { "name": "Apple" }, "data": { "name": "Apples" } },
                            // Not linked to this product
                            { "where": { "name": "Fruit" }, "data": { "name": "Fruits" } }
                        ]
                    }
                }),
                2,
            )
            .await
    );

    assert_eq!(assert_ok!(categories.count(json!({ "name": "Apples" })).await), 1);
    assert_eq!(assert_ok!(categories.count(json!({ "name": "Fruit" })).await), 1);
}

#[tokio::test]
async fn disconnect_and_delete_remove_links_only() {
    let db = setup().await;
    let products = assert_ok!(db.table("product"));
    let categories = assert_ok!(db.table("category"));
    let links = assert_ok!(db.table("product_category"));

    let apple = assert_ok!(categories.modify(json!({ "products": { "disconnect": [2] } }), 4).await);
    assert_eq!(json(apple["products"].clone()), json!([]));

    let cucumber = assert_ok!(
        products
            .modify(json!({ "categories": { "delete": { "name": "Vegetable" } } }), json!({ "sku": "cucumber" }))
            .await
    );
    assert_eq!(json(cucumber["categories"].clone()), json!([]));

    assert_eq!(assert_ok!(links.count(serde_json::Value::Null).await), 0);

    // Both ends are still there.
    assert_some!(assert_ok!(products.get(2).await));
    assert_some!(assert_ok!(categories.get(3).await));
    assert_eq!(assert_ok!(categories.count(serde_json::Value::Null).await), 4);
}

#[tokio::test]
async fn connect_missing_target() {
    let db = setup().await;
    let products = assert_ok!(db.table("product"));
    let links = assert_ok!(db.table("product_category"));

    let err = assert_err!(
        products
            .modify(json!({ "categories": { "connect": [{ "id": 1 }, { "id": 99 }] } }), 1)
            .await
    );
    assert!(err.is_record_not_found());

    assert_eq!(assert_ok!(links.count(json!({ "product": 1 })).await), 0);
}

const TAGS: &str = r#"
CREATE TABLE tag (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    label TEXT NOT NULL UNIQUE
);

CREATE TABLE product_tag (
    product_id INTEGER NOT NULL REFERENCES product (id),
    tag_id INTEGER NOT NULL REFERENCES tag (id)
);

INSERT INTO tag (id, label) VALUES
    (1, 'organic'),
    (2, 'local');

INSERT INTO product_tag (product_id, tag_id) VALUES
    (2, 1);
"#;

#[tokio::test]
async fn keyless_junction() {
    let db = setup_with(|builder| {
        builder.script(format!("{FIXTURE}\n{TAGS}"));
    })
    .await;

    let schema = db.schema();
    let junction = assert_some!(schema.model_by_table("product_tag"));
    assert!(junction.junction);
    assert_empty!(junction.primary_key);

    let product = assert_some!(schema.model_by_table("product"));
    assert_eq!(assert_some!(assert_some!(product.field("tags")).as_related()).junction(), Some(junction.id));
    let tag = assert_some!(schema.model_by_table("tag"));
    assert_eq!(assert_some!(assert_some!(tag.field("products")).as_related()).junction(), Some(junction.id));

    let products = assert_ok!(db.table("product"));
    let tags = assert_ok!(db.table("tag"));
    let links = assert_ok!(db.table("product_tag"));

    for _ in 0..2 {
        let cream = assert_ok!(
            products
                .modify(json!({ "tags": { "connect": [{ "label": "local" }, { "label": "organic" }] } }), 1)
                .await
        );
        assert_eq!(
            json(cream["tags"].clone()),
            json!([{ "id": 1, "label": "organic" }, { "id": 2, "label": "local" }])
        );
    }
    assert_eq!(assert_ok!(links.count(json!({ "product": 1 })).await), 2);

    assert_eq!(assert_ok!(products.count(json!({ "tags": { "label": "organic" } })).await), 2);

    let organic = assert_ok!(tags.modify(json!({ "products": { "disconnect": [1] } }), 1).await);
    assert_eq!(
        json(organic["products"].clone()),
        json!([{ "id": 2, "sku": "gala", "name": "Gala apple" }])
    );
    assert_eq!(assert_ok!(links.count(serde_json::Value::Null).await), 2);

    // Rows without a key can still be written one by one.
    let key = assert_ok!(links.insert(json!({ "product": 3, "tag": 2 })).await);
    assert_eq!(json(key), json!({}));

    let err = assert_err!(links.create(json!({ "product": 3, "tag": 1 })).await);
    assert!(err.is_invalid_payload());

    let err = assert_err!(links.get(json!({ "product": 3 })).await);
    assert!(err.is_bad_filter());
}
