//! End-to-end passes: real sources against mocked providers, the SQLite
//! store, and a collecting notifier.

use std::sync::Arc;

use mockito::{Matcher, Server, ServerGuard};
use pollwatch::{
    config::{AppConfig, PollerConfig, SourceConfig},
    persistence::SqliteStateRepository,
    runner::Poller,
    supervisor::Supervisor,
    test_helpers::{
        CollectingNotifier, PollerConfigBuilder, ebay_ended_item_page, ebay_item_page,
        ebay_result_item, ebay_results_page,
    },
};

const EBAY_RULES: &[&str] =
    &["new_listing", "ending_24_hour", "ending_1_hour", "bid", "title", "ended"];

async fn create_test_repo() -> Arc<SqliteStateRepository> {
    let repo = SqliteStateRepository::new("sqlite::memory:")
        .await
        .expect("Failed to create in-memory repo");
    repo.run_migrations().await.expect("Failed to run migrations");
    Arc::new(repo)
}

fn ebay_poller(base_url: &str) -> PollerConfig {
    let mut poller = PollerConfigBuilder::ebay("seller").notify(EBAY_RULES).build();
    if let SourceConfig::Ebay(ebay) = &mut poller.source {
        ebay.base_url = format!("{base_url}/");
    }
    poller
}

fn pool_poller(endpoint: &str) -> PollerConfig {
    PollerConfigBuilder::pool_calendar(endpoint).notify(&["new_slot", "slot_gone"]).build()
}

async fn build_poller(
    name: &str,
    poller: PollerConfig,
    repo: Arc<SqliteStateRepository>,
    notifier: Arc<CollectingNotifier>,
) -> Arc<Poller<SqliteStateRepository>> {
    let mut config = AppConfig::default();
    config.http_retry_config.max_retries = 0;
    config.pollers.insert(name.to_string(), poller);

    let supervisor = Supervisor::builder()
        .config(config)
        .state(repo)
        .notifier(notifier)
        .build()
        .await
        .expect("Failed to build supervisor");
    supervisor.poller(name).expect("Poller is configured")
}

async fn serve_results(server: &mut ServerGuard, items: &[String]) -> mockito::Mock {
    server
        .mock("GET", "/sch/i.html")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(ebay_results_page(items))
        .create_async()
        .await
}

async fn serve_item(server: &mut ServerGuard, id: u64, page: String) -> mockito::Mock {
    server
        .mock("GET", format!("/itm/{id}").as_str())
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(page)
        .create_async()
        .await
}

#[tokio::test]
async fn listing_lifecycle_is_notified_once_per_change() {
    let mut server = Server::new_async().await;
    let repo = create_test_repo().await;
    let notifier = Arc::new(CollectingNotifier::new());
    let poller = build_poller("ebay", ebay_poller(&server.url()), repo, notifier.clone()).await;

    let lamp = ebay_result_item(11, "Lamp", "£2.00", "", "3d 4h left");

    let page = serve_results(
        &mut server,
        &[lamp.clone(), ebay_result_item(12, "Vase", "£5.00", "1 bid", "4h 10m left")],
    )
    .await;
    poller.run_once().await.unwrap();
    assert_eq!(
        notifier.sent_titles().await,
        vec![
            "New eBay Listing - Lamp",
            "New eBay Listing - Vase",
            "eBay Listing Ends Tomorrow - Vase"
        ]
    );
    page.remove_async().await;

    let page = serve_results(
        &mut server,
        &[lamp.clone(), ebay_result_item(12, "Vase", "£7.50", "3 bids", "45m left")],
    )
    .await;
    let item = serve_item(
        &mut server,
        12,
        ebay_item_page(12, "Vase", "£7.50", "3 bids", "44m 58s left"),
    )
    .await;
    poller.run_once().await.unwrap();
    item.assert_async().await;
    assert_eq!(
        notifier.sent_titles().await[3..],
        ["eBay Listing 1 Hour Left - Vase", "eBay Listing Bid - Vase"]
    );
    let sent = notifier.sent().await;
    let bid = &sent[4];
    assert!(bid.body.contains("Old Bids: 1"));
    assert!(bid.body.contains("Bids: 3"));
    assert!(bid.body.contains("Price: £7.50"));
    assert!(bid.body.contains("Time Left: 44m 58s"));
    page.remove_async().await;
    item.remove_async().await;

    // The final price and bids come from the ended item page.
    let _page = serve_results(&mut server, &[lamp]).await;
    let ended_page = ebay_ended_item_page(12, "Vase", "£9.99", "4 bids");
    let _item = serve_item(&mut server, 12, ended_page).await;
    let report = poller.run_once().await.unwrap();
    assert_eq!(report.events, 1);
    let ended = notifier.sent().await.pop().unwrap();
    assert_eq!(ended.title, "eBay Listing Ended - Vase");
    assert!(ended.body.contains("eBay Listing Ended (Sold)"));
    assert!(ended.body.contains("Bids: 4\nPrice: £9.99"));
    assert!(ended.body.contains("/itm/12"));
    let html = ended.html.unwrap();
    assert!(html.contains("<h1>eBay Listing Ended (Sold)</h1>"));
    assert!(html.contains(r#"<img src="https://i.ebayimg.com/12.jpg"/>"#));
    assert!(html.contains(">View Listing</a>"));

    // Nothing changes on a further pass.
    poller.run_once().await.unwrap();
    assert_eq!(notifier.sent().await.len(), 6);
}

#[tokio::test]
async fn ended_listing_without_item_page_uses_last_known_values() {
    let mut server = Server::new_async().await;
    let repo = create_test_repo().await;
    let notifier = Arc::new(CollectingNotifier::new());
    let poller = build_poller("ebay", ebay_poller(&server.url()), repo, notifier.clone()).await;

    let lamp = ebay_result_item(51, "Lamp", "£2.00", "", "3d 4h left");
    let page = serve_results(
        &mut server,
        &[lamp.clone(), ebay_result_item(52, "Clock", "£5.00", "2 bids", "2d left")],
    )
    .await;
    poller.run_once().await.unwrap();
    page.remove_async().await;

    let _page = serve_results(&mut server, &[lamp]).await;
    let _item = server
        .mock("GET", "/itm/52")
        .match_query(Matcher::Any)
        .with_status(404)
        .create_async()
        .await;
    let report = poller.run_once().await.unwrap();

    assert_eq!(report.sent, 1);
    let ended = notifier.sent().await.pop().unwrap();
    assert_eq!(ended.title, "eBay Listing Ended - Clock");
    assert!(ended.body.contains("Bids: 2\nPrice: £5.00"));
}

#[tokio::test]
async fn alert_state_survives_a_restart() {
    let mut server = Server::new_async().await;
    let repo = create_test_repo().await;
    let _page = serve_results(
        &mut server,
        &[ebay_result_item(21, "Mirror", "£12.00", "2 bids", "2d left")],
    )
    .await;

    let first = Arc::new(CollectingNotifier::new());
    let poller =
        build_poller("ebay", ebay_poller(&server.url()), repo.clone(), first.clone()).await;
    poller.run_once().await.unwrap();
    assert_eq!(first.sent_titles().await, vec!["New eBay Listing - Mirror"]);
    drop(poller);

    let second = Arc::new(CollectingNotifier::new());
    let poller = build_poller("ebay", ebay_poller(&server.url()), repo, second.clone()).await;
    let report = poller.run_once().await.unwrap();

    assert_eq!(report.events, 0);
    assert!(second.sent().await.is_empty());
}

#[tokio::test]
async fn provider_error_leaves_state_untouched() {
    let mut server = Server::new_async().await;
    let repo = create_test_repo().await;
    let notifier = Arc::new(CollectingNotifier::new());
    let poller = build_poller("ebay", ebay_poller(&server.url()), repo, notifier.clone()).await;

    let broken = server
        .mock("GET", "/sch/i.html")
        .match_query(Matcher::Any)
        .with_status(503)
        .create_async()
        .await;
    assert!(poller.run_once().await.is_err());
    assert_eq!(poller.status().await.passes, 0);
    broken.remove_async().await;

    let _page =
        serve_results(&mut server, &[ebay_result_item(31, "Rug", "£9.00", "", "1d left")]).await;
    poller.run_once().await.unwrap();

    assert_eq!(notifier.sent_titles().await, vec!["New eBay Listing - Rug"]);
}

#[tokio::test]
async fn garbage_page_is_an_error_not_an_empty_snapshot() {
    let mut server = Server::new_async().await;
    let repo = create_test_repo().await;
    let notifier = Arc::new(CollectingNotifier::new());
    let poller = build_poller("ebay", ebay_poller(&server.url()), repo, notifier.clone()).await;

    let page =
        serve_results(&mut server, &[ebay_result_item(41, "Bowl", "£3.00", "", "2d left")]).await;
    poller.run_once().await.unwrap();
    page.remove_async().await;

    let _garbage = server
        .mock("GET", "/sch/i.html")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("<html><body>Service temporarily unavailable</body></html>")
        .create_async()
        .await;

    assert!(poller.run_once().await.is_err());
    assert_eq!(notifier.sent_titles().await, vec!["New eBay Listing - Bowl"]);
}

#[tokio::test]
async fn pool_calendar_reports_new_and_gone_slots() {
    let mut server = Server::new_async().await;
    let repo = create_test_repo().await;
    let notifier = Arc::new(CollectingNotifier::new());
    let endpoint = format!("{}/wp-admin/admin-ajax.php", server.url());
    let poller = build_poller("pool", pool_poller(&endpoint), repo, notifier.clone()).await;

    let schedule = server
        .mock("POST", "/wp-admin/admin-ajax.php")
        .match_body(Matcher::UrlEncoded("action".into(), "dopbsp_calendar_schedule_get".into()))
        .with_status(200)
        .with_body(
            serde_json::json!({
                "2030-07-13": concat!(
                    r#"{"hours": {"10:00": {"available": "3"}, "11:00": {"available": "0"}, "#,
                    r#""16:00": {"available": "2"}}}"#
                ),
                "2030-07-15": {"hours": {"10:00": {"available": "1"}}}
            })
            .to_string(),
        )
        .create_async()
        .await;
    poller.run_once().await.unwrap();
    assert_eq!(
        notifier.sent_titles().await,
        vec!["New Good Pool Slot - Saturday 13 July 2030 10:00"]
    );
    schedule.remove_async().await;

    let _schedule = server
        .mock("POST", "/wp-admin/admin-ajax.php")
        .with_status(200)
        .with_body(
            serde_json::json!({
                "2030-07-13": {"hours": {"10:00": {"available": "0"}, "12:00": {"available": "4"}}}
            })
            .to_string(),
        )
        .create_async()
        .await;
    poller.run_once().await.unwrap();

    assert_eq!(
        notifier.sent_titles().await[1..],
        ["New Good Pool Slot - Saturday 13 July 2030 12:00", "Pool Slot Gone - 2030-07-13T10:00"]
    );
}
