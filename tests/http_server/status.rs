use crate::helpers::*;

#[tokio::test]
async fn status_endpoint_reports_pollers() {
    let server = TestServer::new(default_listings()).await;

    let resp = server.get("/status").await;

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.expect("Failed to parse JSON");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["uptime_secs"].as_u64().is_some());

    let ebay = &body["pollers"]["ebay"];
    assert_eq!(ebay["timer_enabled"], false);
    assert_eq!(ebay["phase"], "idle");
    assert_eq!(ebay["passes"], 0);
    assert!(ebay["last_success"].is_null());

    server.shutdown().await;
}

#[tokio::test]
async fn status_endpoint_reflects_completed_pass() {
    let server = TestServer::new(default_listings()).await;

    let resp = server.post_authorized("/pollers/ebay/check").await;
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value =
        server.get("/status").await.json().await.expect("Failed to parse JSON");
    let ebay = &body["pollers"]["ebay"];
    assert_eq!(ebay["passes"], 1);
    assert_eq!(ebay["events_sent"], 2);
    assert!(ebay["last_success"].is_string());
    assert!(ebay["last_error"].is_null());

    server.shutdown().await;
}
