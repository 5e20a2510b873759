use std::{net::SocketAddr, sync::Arc};

use pollwatch::{
    config::{AppConfig, RunnerConfig, ServerConfig},
    http_server::{self, ApiState, PollerRegistry},
    models::Entity,
    persistence::SqliteStateRepository,
    runner::Poller,
    test_helpers::{CollectingNotifier, ListingBuilder, PollerConfigBuilder, ScriptedSource},
};
use reqwest::Client;
use tokio::task;
use tokio_util::sync::CancellationToken;

pub const API_KEY: &str = "test-key";

pub async fn create_test_repo() -> Arc<SqliteStateRepository> {
    let repo = SqliteStateRepository::new("sqlite::memory:")
        .await
        .expect("Failed to create in-memory repo");
    repo.run_migrations().await.expect("Failed to run migrations");
    Arc::new(repo)
}

pub fn default_listings() -> Vec<Entity> {
    vec![
        ListingBuilder::new(101).title("Brass Lamp").price(12.5).build(),
        ListingBuilder::new(102).title("Oak Chair").bids(2).ending_today().build(),
    ]
}

pub struct TestServer {
    pub address: SocketAddr,
    pub server_handle: task::JoinHandle<()>,
    pub client: Client,
    pub repo: Arc<SqliteStateRepository>,
    pub source: Arc<ScriptedSource>,
    pub notifier: Arc<CollectingNotifier>,
    token: CancellationToken,
}

impl TestServer {
    /// Starts a server with a single eBay poller named `ebay` that serves
    /// `snapshot` and notifies on new listings.
    pub async fn new(snapshot: Vec<Entity>) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get address");
        drop(listener); // Release port for the app to use

        let config = Arc::new(AppConfig {
            server: ServerConfig {
                enabled: true,
                listen_address: addr.to_string(),
                api_key: Some(API_KEY.to_string()),
            },
            ..Default::default()
        });

        let repo = create_test_repo().await;
        let source = Arc::new(ScriptedSource::new().then_snapshot(snapshot));
        let notifier = Arc::new(CollectingNotifier::new());
        let poller = Poller::new(
            "ebay",
            PollerConfigBuilder::ebay("seller").notify(&["new_listing"]).build(),
            RunnerConfig::default(),
            source.clone(),
            repo.clone(),
            notifier.clone(),
        )
        .expect("Default rules are valid");

        let mut pollers = PollerRegistry::new();
        pollers.insert("ebay".to_string(), Arc::new(poller));
        let state = ApiState::new(config, repo.clone(), Arc::new(pollers));

        let token = CancellationToken::new();
        let server_token = token.clone();
        let server_handle = task::spawn(async move {
            http_server::run_server(state, server_token).await.expect("Server failed");
        });

        // Wait for server to start
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;

        Self { address: addr, server_handle, client: Client::new(), repo, source, notifier, token }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.address, path)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.expect("Request failed")
    }

    pub async fn post_authorized(&self, path: &str) -> reqwest::Response {
        self.client.post(self.url(path)).bearer_auth(API_KEY).send().await.expect("Request failed")
    }

    pub async fn shutdown(self) {
        self.token.cancel();
        self.server_handle.await.expect("Server task panicked");
    }
}
