use crate::helpers::*;

#[tokio::test]
async fn check_requires_bearer_token() {
    let server = TestServer::new(default_listings()).await;

    let missing = server.client.post(server.url("/pollers/ebay/check")).send().await.unwrap();
    assert_eq!(missing.status(), 401);

    let wrong = server
        .client
        .post(server.url("/pollers/ebay/check"))
        .bearer_auth("nope")
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), 401);

    assert_eq!(server.source.calls(), 0);
    assert!(server.notifier.sent().await.is_empty());

    server.shutdown().await;
}

#[tokio::test]
async fn check_runs_a_pass_and_reports_it() {
    let server = TestServer::new(default_listings()).await;

    let resp = server.post_authorized("/pollers/ebay/check").await;

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["poller"], "ebay");
    assert_eq!(body["report"]["entities"], 2);
    assert_eq!(body["report"]["sent"], 2);
    assert_eq!(
        server.notifier.sent_titles().await,
        vec!["New eBay Listing - Brass Lamp", "New eBay Listing - Oak Chair"]
    );

    // The same snapshot again is a no-op.
    let body: serde_json::Value =
        server.post_authorized("/pollers/ebay/check").await.json().await.unwrap();
    assert_eq!(body["report"]["events"], 0);
    assert_eq!(server.notifier.sent().await.len(), 2);

    server.shutdown().await;
}

#[tokio::test]
async fn check_accepts_get() {
    let server = TestServer::new(default_listings()).await;

    let resp = server
        .client
        .get(server.url("/pollers/ebay/check"))
        .bearer_auth(API_KEY)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(server.source.calls(), 1);

    server.shutdown().await;
}

#[tokio::test]
async fn check_unknown_poller_returns_404() {
    let server = TestServer::new(vec![]).await;

    let resp = server.post_authorized("/pollers/missing/check").await;

    assert_eq!(resp.status(), 404);
    let body: serde_json::Value = resp.json().await.expect("Failed to parse JSON");
    assert_eq!(body["error"], "Poller 'missing' not found");

    server.shutdown().await;
}

#[tokio::test]
async fn current_returns_live_snapshot_without_touching_state() {
    let server = TestServer::new(default_listings()).await;

    let resp = server.get("/pollers/ebay/current").await;

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.expect("Failed to parse JSON");
    assert_eq!(body["poller"], "ebay");
    let entities = body["entities"].as_array().expect("entities is an array");
    assert_eq!(entities.len(), 2);
    assert_eq!(entities[0]["key"], "101");
    assert_eq!(entities[0]["attributes"]["title"], "Brass Lamp");

    assert!(server.notifier.sent().await.is_empty());
    let doc = server.get("/state/ebay:new_listing").await;
    assert_eq!(doc.status(), 404);

    server.shutdown().await;
}

#[tokio::test]
async fn entity_lookup_finds_live_entity() {
    let server = TestServer::new(default_listings()).await;

    let found = server.get("/pollers/ebay/entities/102").await;
    assert_eq!(found.status(), 200);
    let body: serde_json::Value = found.json().await.unwrap();
    assert_eq!(body["entity"]["attributes"]["title"], "Oak Chair");
    assert_eq!(body["entity"]["attributes"]["ends_within_24h"], true);

    let missing = server.get("/pollers/ebay/entities/999").await;
    assert_eq!(missing.status(), 404);

    server.shutdown().await;
}
