use serde::Deserialize;

/// Configuration for the HTTP trigger surface.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Whether the HTTP server is started by `run`.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Address and port for the HTTP server to listen on.
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Optional API key required by the on-demand check endpoint.
    /// If not set in config, falls back to the `POLLWATCH_API_KEY` env var.
    #[serde(default = "default_api_key_from_env")]
    pub api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            listen_address: default_listen_address(),
            api_key: default_api_key_from_env(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_listen_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_api_key_from_env() -> Option<String> {
    std::env::var("POLLWATCH_API_KEY").ok().filter(|key| !key.is_empty())
}
