use pretty_assertions::assert_eq;
use serde_json::json;
use tablet::Record;
use tests::*;

#[tokio::test]
async fn merge_on_unique_key() {
    let db = setup().await;
    let products = assert_ok!(db.table("product"));

    let a = assert_ok!(products.append(json!({ "sku": "fig", "name": "Fig" })));
    let b = assert_ok!(products.append(json!({ "sku": "kiwi", "name": "Kiwi" })));
    let c = assert_ok!(products.append(json!({ "sku": "fig", "name": "Dried fig" })));

    assert_eq!(a, c);
    assert_ne!(a, b);
    assert_eq!(products.record_list(), [a, b, a]);

    let fig = assert_some!(db.pending(a));
    assert_eq!(json(fig), json!({ "sku": "fig", "name": "Dried fig" }));

    // Nothing is written before the flush.
    assert_eq!(assert_ok!(products.count(json!({ "sku": "fig" })).await), 0);
}

#[tokio::test]
async fn flush_writes_keys_back() {
    let db = setup().await;
    let products = assert_ok!(db.table("product"));

    let fig = assert_ok!(products.append(json!({ "sku": "fig", "name": "Fig" })));
    let kiwi = assert_ok!(products.append(json!({ "sku": "kiwi", "name": "Kiwi" })));

    assert_ok!(db.flush().await);

    assert_eq!(json(assert_some!(db.pending(fig))), json!({ "id": 4, "sku": "fig", "name": "Fig" }));
    assert_eq!(json(assert_some!(db.pending(kiwi))), json!({ "id": 5, "sku": "kiwi", "name": "Kiwi" }));

    assert_eq!(assert_ok!(products.count(serde_json::Value::Null).await), 5);
    assert_empty!(products.record_list());

    // A new append after the flush is a new record, even with the same key.
    let again = assert_ok!(products.append(json!({ "sku": "fig", "name": "Fig" })));
    assert_ne!(again, fig);
}

#[tokio::test]
async fn empty_flush_sends_nothing() {
    let db = setup().await;

    let before = db.query_count();
    assert_ok!(db.flush().await);
    assert_eq!(db.query_count(), before);
}

#[tokio::test]
async fn pending_references() {
    let db = setup().await;
    let users = assert_ok!(db.table("user"));
    let posts = assert_ok!(db.table("post"));
    let comments = assert_ok!(db.table("comment"));

    // Appended children first; the flush still inserts parents first.
    let mut comment = Record::from(json!({ "body": "Nice" }));
    let mut post = Record::from(json!({ "title": "Structured Programming" }));

    let user = assert_ok!(users.append(json!({
        "firstName": "Edsger",
        "lastName": "Dijkstra",
        "email": "ewd@example.com"
    })));
    post.insert("user", user);
    let post = assert_ok!(posts.append(post));
    comment.insert("post", post);
    let comment = assert_ok!(comments.append(comment));

    assert_ok!(db.flush().await);

    assert_eq!(
        json(assert_some!(db.pending(post))),
        json!({ "id": 4, "user": 5, "title": "Structured Programming" })
    );
    assert_eq!(
        json(assert_some!(db.pending(comment))),
        json!({ "id": 4, "post": 4, "body": "Nice" })
    );

    // A handle to a flushed record resolves to its key.
    let mut next = Record::from(json!({ "title": "Notes on Structured Programming" }));
    next.insert("user", user);
    let next = assert_ok!(posts.append(next));
    assert_ok!(db.flush().await);

    assert_eq!(assert_some!(db.pending(next))["user"], 5);
}

#[tokio::test]
async fn stub_reference() {
    let db = setup().await;
    let posts = assert_ok!(db.table("post"));

    let mut data = Record::from(json!({ "title": "Draft" }));
    data.insert("user", Record::from_iter([("id", tablet::Value::from(1))]));
    let draft = assert_ok!(posts.append(data));

    assert_eq!(assert_some!(db.pending(draft))["user"], 1);
}

#[tokio::test]
async fn reference_to_wrong_model() {
    let db = setup().await;
    let products = assert_ok!(db.table("product"));
    let posts = assert_ok!(db.table("post"));

    let fig = assert_ok!(products.append(json!({ "sku": "fig", "name": "Fig" })));

    let mut data = Record::from(json!({ "title": "Figs" }));
    data.insert("user", fig);

    let err = assert_err!(posts.append(data));
    assert!(err.is_invalid_payload());

    let err = assert_err!(posts.append(json!({ "title": "Figs", "comments": [] })));
    assert!(err.is_invalid_payload());
}

#[tokio::test]
async fn failed_flush_keeps_the_queue() {
    let db = setup().await;
    let products = assert_ok!(db.table("product"));

    let fig = assert_ok!(products.append(json!({ "sku": "fig", "name": "Fig" })));
    let cream = assert_ok!(products.append(json!({ "sku": "cream", "name": "Single cream" })));

    let err = assert_err!(db.flush().await);
    assert!(err.is_driver_operation_failed());

    // Nothing was written and both records are still queued.
    assert_eq!(assert_ok!(products.count(serde_json::Value::Null).await), 3);
    assert_eq!(products.record_list(), [fig, cream]);
    assert_eq!(json(assert_some!(db.pending(fig))), json!({ "sku": "fig", "name": "Fig" }));

    assert_eq!(assert_ok!(products.delete(json!({ "sku": "cream" })).await), 1);
    assert_ok!(db.flush().await);

    assert_eq!(assert_ok!(products.count(serde_json::Value::Null).await), 4);
    assert_empty!(products.record_list());
}
