use crate::helpers::*;

#[tokio::test]
async fn state_document_is_served_after_a_pass() {
    let server = TestServer::new(default_listings()).await;

    let before = server.get("/state/ebay:new_listing").await;
    assert_eq!(before.status(), 404);
    let body: serde_json::Value = before.json().await.unwrap();
    assert_eq!(body["error"], "No document stored under 'ebay:new_listing'");

    server.post_authorized("/pollers/ebay/check").await;

    let seen: serde_json::Value =
        server.get("/state/ebay:new_listing").await.json().await.unwrap();
    assert_eq!(seen, serde_json::json!(["101", "102"]));

    let day: serde_json::Value =
        server.get("/state/ebay:ending_24_hour").await.json().await.unwrap();
    assert_eq!(day, serde_json::json!(["102"]));

    let bids: serde_json::Value = server.get("/state/ebay:bid").await.json().await.unwrap();
    assert_eq!(bids["102"]["bids"], 2);

    server.shutdown().await;
}
