use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::BTreeSet;
use tokio::task::JoinSet;
use tests::*;

async fn seed_orders(db: &tablet::Database, count: usize) {
    let orders = assert_ok!(db.table("order"));

    for i in 0..count {
        assert_ok!(orders.insert(json!({ "code": format!("B-{i}"), "status": "new" })).await);
    }
}

#[tokio::test]
async fn claims_oldest_first() {
    let db = setup().await;
    seed_orders(&db, 2).await;
    let orders = assert_ok!(db.table("order"));

    let order = assert_some!(assert_ok!(
        orders
            .claim(json!({ "status": "new" }), json!({ "status": "processing", "worker": "w1" }))
            .await
    ));

    assert_eq!(
        json(order),
        json!({ "id": 2, "code": "B-0", "status": "processing", "worker": "w1" })
    );
}

#[tokio::test]
async fn nothing_to_claim() {
    let db = setup().await;
    let orders = assert_ok!(db.table("order"));

    let claimed = assert_ok!(
        orders
            .claim(json!({ "status": "new" }), json!({ "status": "processing" }))
            .await
    );
    assert_none!(claimed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_claims_never_share_a_row() {
    let db = setup().await;
    seed_orders(&db, 10).await;

    let mut set = JoinSet::new();

    for worker in 0..11 {
        let orders = assert_ok!(db.table("order"));

        set.spawn(async move {
            orders
                .claim(
                    json!({ "status": "new" }),
                    json!({ "status": "processing", "worker": format!("w{worker}") }),
                )
                .await
        });
    }

    let mut claimed = BTreeSet::new();
    let mut empty = 0;

    while let Some(result) = set.join_next().await {
        match assert_ok!(assert_ok!(result)) {
            Some(order) => {
                assert_eq!(order["status"], "processing");
                assert!(claimed.insert(assert_some!(order["id"].as_i64())));
            }
            None => empty += 1,
        }
    }

    assert_eq!(claimed.len(), 10);
    assert_eq!(empty, 1);

    let orders = assert_ok!(db.table("order"));
    assert_eq!(assert_ok!(orders.count(json!({ "status": "new" })).await), 0);
    assert_eq!(assert_ok!(orders.count(json!({ "worker_ne": null })).await), 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn claims_across_connections() {
    let dir = assert_ok!(tempfile::tempdir());
    let db = setup_file(&dir.path().join("orders.db"), 8).await;
    seed_orders(&db, 20).await;

    let mut set = JoinSet::new();

    for worker in 0..30 {
        let orders = assert_ok!(db.table("order"));

        set.spawn(async move {
            orders
                .claim(
                    json!({ "status": "new" }),
                    json!({ "status": "processing", "worker": format!("w{worker}") }),
                )
                .await
        });
    }

    let mut claimed = BTreeSet::new();
    let mut empty = 0;

    while let Some(result) = set.join_next().await {
        match assert_ok!(assert_ok!(result)) {
            Some(order) => assert!(claimed.insert(assert_some!(order["id"].as_i64()))),
            None => empty += 1,
        }
    }

    assert_eq!(claimed.len(), 20);
    assert_eq!(empty, 10);

    let orders = assert_ok!(db.table("order"));
    assert_eq!(assert_ok!(orders.count(json!({ "status": "processing" })).await), 20);
}

#[tokio::test]
async fn claim_with_empty_data() {
    let db = setup().await;
    let orders = assert_ok!(db.table("order"));

    // Without a change the same row comes back every time.
    for _ in 0..2 {
        let order = assert_some!(assert_ok!(orders.claim(json!({ "code": "A-1" }), json!({})).await));
        assert_eq!(order["status"], "shipped");
    }
}

#[tokio::test]
async fn claim_rejects_relation_data() {
    let db = setup().await;
    let orders = assert_ok!(db.table("order"));

    let err = assert_err!(
        orders
            .claim(
                json!({ "status": "shipped" }),
                json!({ "orderShipping": { "create": { "address": "Elsewhere" } } }),
            )
            .await
    );
    assert!(err.is_invalid_payload());
}
