use async_trait::async_trait;
use deskchat_logging::{log_request, log_response};
use deskchat_types::{BackendQuery, BackendReply, HealthStatus, ResponseTemplate};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::client::BackendClient;
use crate::error::BackendError;

/// Strip trailing slashes and a trailing `/predict` so paths can be appended
pub fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    trimmed
        .strip_suffix("/predict")
        .unwrap_or(trimmed)
        .to_string()
}

/// HTTP/JSON client for the prediction backend
pub struct HttpBackendClient {
    base_url: String,
    client: reqwest::Client,
    verbose: bool,
}

impl HttpBackendClient {
    /// `timeout` bounds every request end to end
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: normalize_base_url(base_url),
            client,
            verbose: false,
        })
    }

    /// Print request/response debug blocks to the console
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read_json<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T, BackendError> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;
        log_response(&status, &headers, &body, self.verbose);

        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, BackendError> {
        log_request::<()>("GET", url, None, self.verbose);
        log::debug!("GET {}", url);

        let response = self.client.get(url).send().await?;
        self.read_json(response).await
    }
}

#[async_trait]
impl BackendClient for HttpBackendClient {
    async fn predict(&self, query: &BackendQuery) -> Result<BackendReply, BackendError> {
        let url = self.url("/predict");
        log_request("POST", &url, Some(query), self.verbose);
        log::debug!("POST {} ({} chars)", url, query.query.chars().count());

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(query)
            .send()
            .await?;

        let reply: BackendReply = self.read_json(response).await?;
        log::info!(
            "prediction: intent={:?} category={:?} confidence={:?} flags={:?}",
            reply.intent,
            reply.category,
            reply.confidence,
            reply.template_flags
        );
        Ok(reply)
    }

    async fn intents(&self) -> Result<Vec<String>, BackendError> {
        self.get_json(&self.url("/intents")).await
    }

    async fn categories(&self) -> Result<Vec<String>, BackendError> {
        self.get_json(&self.url("/categories")).await
    }

    async fn templates(&self, intent: &str) -> Result<Vec<ResponseTemplate>, BackendError> {
        let mut url = reqwest::Url::parse(&self.url("/templates/"))
            .map_err(|_| BackendError::Unsupported("templates on this base URL"))?;
        url.path_segments_mut()
            .map_err(|_| BackendError::Unsupported("templates on this base URL"))?
            .pop_if_empty()
            .push(intent);

        match self.get_json::<Vec<ResponseTemplate>>(url.as_str()).await {
            Err(BackendError::Status { status: 404, .. }) => Ok(Vec::new()),
            other => other,
        }
    }

    async fn health(&self) -> Result<HealthStatus, BackendError> {
        self.get_json(&self.url("/health")).await
    }
}
