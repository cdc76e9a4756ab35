use anyhow::{Context, Result};
use colored::Colorize;
use deskchat_api::HttpBackendClient;
use deskchat_history::{HistoryStore, SyncBridge};
use std::path::PathBuf;

use crate::cli::Cli;
use crate::config::{ClientConfig, FileConfig, ViewConfig, DEFAULT_CONFIG_FILE};

/// Application configuration derived from CLI arguments, environment and config file
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub client_config: ClientConfig,
    pub view_config: ViewConfig,
}

/// Set up application configuration from CLI arguments
pub fn setup_from_cli(cli: &Cli) -> AppConfig {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    // A broken config file must not keep the client from starting
    let file = match FileConfig::load(&config_path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("{} {:#}", "⚠️  Ignoring config file:".yellow(), e);
            FileConfig::default()
        }
    };

    let client_config = ClientConfig::resolve(cli, &file);
    log::debug!("resolved config: {:?}", client_config);

    AppConfig {
        client_config,
        view_config: ViewConfig::from_file(&file.view),
    }
}

impl AppConfig {
    pub fn backend(&self) -> Result<HttpBackendClient> {
        let config = &self.client_config;
        let client = HttpBackendClient::new(&config.backend_url, config.request_timeout)
            .with_context(|| format!("Failed to create backend client for {}", config.backend_url))?;
        Ok(client.with_verbose(config.verbose))
    }

    /// Open the configured history slot, publishing on `bridge` when given
    pub async fn open_history(&self, bridge: Option<SyncBridge>) -> Result<HistoryStore> {
        let path = &self.client_config.history_path;
        let store = HistoryStore::open(path)
            .await
            .with_context(|| format!("Failed to open history at {}", path.display()))?;
        Ok(match bridge {
            Some(bridge) => store.with_bridge(bridge),
            None => store,
        })
    }
}
