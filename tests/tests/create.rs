use pretty_assertions::assert_eq;
use serde_json::json;
use tests::*;

#[tokio::test]
async fn connect_parent() {
    let db = setup().await;
    let posts = assert_ok!(db.table("post"));

    let post = assert_ok!(
        posts
            .create(json!({
                "title": "Sketch of the Analytical Engine",
                "user": { "connect": { "email": "ada@example.com" } }
            }))
            .await
    );

    assert_eq!(
        json(post),
        json!({
            "id": 4,
            "title": "Sketch of the Analytical Engine",
            "user": {
                "id": 1,
                "firstName": "Ada",
                "lastName": "Lovelace",
                "email": "ada@example.com",
                "active": true,
                "firstPost": { "id": 1 }
            }
        })
    );
}

#[tokio::test]
async fn plain_key_and_stub() {
    let db = setup().await;
    let posts = assert_ok!(db.table("post"));

    // A stub is not a relation operation; only `*` comes back.
    let post = assert_ok!(posts.create(json!({ "title": "On Computable Numbers", "user": 2 })).await);
    assert_eq!(json(post), json!({ "id": 4, "title": "On Computable Numbers", "user": { "id": 2 } }));

    let post = assert_ok!(posts.create(json!({ "title": "Go To Statement", "user": { "id": 4 } })).await);
    assert_eq!(json(post["user"].clone()), json!({ "id": 4 }));
}

#[tokio::test]
async fn create_children() {
    let db = setup().await;
    let users = assert_ok!(db.table("user"));

    let user = assert_ok!(
        users
            .create(json!({
                "firstName": "Barbara",
                "lastName": "Liskov",
                "email": "barbara@example.com",
                "posts": {
                    "create": [{ "title": "Data Abstraction" }, { "title": "Behavioral Subtyping" }]
                }
            }))
            .await
    );

    assert_eq!(
        json(user),
        json!({
            "id": 5,
            "firstName": "Barbara",
            "lastName": "Liskov",
            "email": "barbara@example.com",
            "active": true,
            "firstPost": null,
            "posts": [
                { "id": 4, "user": { "id": 5 }, "title": "Data Abstraction" },
                { "id": 5, "user": { "id": 5 }, "title": "Behavioral Subtyping" }
            ]
        })
    );
}

#[tokio::test]
async fn create_parent_and_grandparent() {
    let db = setup().await;
    let comments = assert_ok!(db.table("comment"));

    let comment = assert_ok!(
        comments
            .create(json!({
                "body": "First!",
                "post": {
                    "create": {
                        "title": "Hello",
                        "user": {
                            "create": {
                                "firstName": "Donald",
                                "lastName": "Knuth",
                                "email": "donald@example.com",
                                "active": false
                            }
                        }
                    }
                }
            }))
            .await
    );

    assert_eq!(
        json(comment),
        json!({
            "id": 4,
            "body": "First!",
            "post": { "id": 4, "user": { "id": 5 }, "title": "Hello" }
        })
    );

    let users = assert_ok!(db.table("user"));
    let donald = assert_some!(assert_ok!(users.get(5).await));
    assert_eq!(donald["active"], false);
}

#[tokio::test]
async fn connect_existing_children() {
    let db = setup().await;
    let users = assert_ok!(db.table("user"));

    let user = assert_ok!(
        users
            .create(json!({
                "firstName": "John",
                "lastName": "Backus",
                "email": "john@example.com",
                "posts": { "connect": [{ "id": 3 }] }
            }))
            .await
    );

    assert_eq!(
        json(user["posts"].clone()),
        json!([{ "id": 3, "user": { "id": 5 }, "title": "Computing Machinery and Intelligence" }])
    );

    let posts = assert_ok!(db.table("post"));
    assert_eq!(assert_ok!(posts.count(json!({ "user": 2 })).await), 0);
}

#[tokio::test]
async fn unknown_field_fails_before_any_statement() {
    let db = setup().await;
    let posts = assert_ok!(db.table("post"));

    let before = db.query_count();

    let err = assert_err!(posts.create(json!({ "title": "Untitled", "author": 1 })).await);
    assert!(err.is_invalid_payload());
    assert_eq!(err.to_string(), "invalid payload: unknown field `Post::author`");

    let err = assert_err!(
        posts
            .create(json!({ "title": "Untitled", "user": { "connect": { "id": 1 }, "create": {} } }))
            .await
    );
    assert!(err.is_invalid_payload());

    assert_eq!(db.query_count(), before);
}

#[tokio::test]
async fn failed_step_rolls_back() {
    let db = setup().await;
    let users = assert_ok!(db.table("user"));

    // The user row is inserted before the missing post is looked up.
    let err = assert_err!(
        users
            .create(json!({
                "firstName": "Ken",
                "lastName": "Thompson",
                "email": "ken@example.com",
                "posts": { "connect": [{ "id": 99 }] }
            }))
            .await
    );
    assert!(err.is_record_not_found());

    assert_eq!(assert_ok!(users.count(json!({ "email": "ken@example.com" })).await), 0);

    // A constraint failure in the database rolls back the same way.
    let err = assert_err!(
        users
            .create(json!({
                "firstName": "Ken",
                "lastName": "Thompson",
                "email": "ken@example.com",
                "posts": {
                    "create": [{ "title": "Reflections on Trusting Trust" }, { "title": null }]
                }
            }))
            .await
    );
    assert!(err.is_driver_operation_failed());

    let posts = assert_ok!(db.table("post"));
    assert_eq!(assert_ok!(posts.count(serde_json::Value::Null).await), 3);
    assert_eq!(assert_ok!(users.count(serde_json::Value::Null).await), 4);
}

#[tokio::test]
async fn unique_violation_is_a_driver_error() {
    let db = setup().await;
    let users = assert_ok!(db.table("user"));

    let err = assert_err!(
        users
            .create(json!({
                "firstName": "Ada",
                "lastName": "Byron",
                "email": "ada@example.com"
            }))
            .await
    );
    assert!(err.is_driver_operation_failed());

    assert_eq!(assert_ok!(users.count(json!({ "lastName": "Byron" })).await), 0);
}

#[tokio::test]
async fn rows_stay_usable_after_rollback() {
    let db = setup().await;
    let posts = assert_ok!(db.table("post"));

    assert_err!(posts.create(json!({ "title": "Orphan", "user": { "connect": { "id": 42 } } })).await);

    let post = assert_ok!(posts.create(json!({ "title": "Adopted", "user": 3 })).await);
    assert_eq!(post["id"], 4);
}
