//! # deskchat-api
//!
//! Client side of the customer-service prediction backend.
//!
//! - `POST /predict` classifies an utterance and returns the reply text
//! - `GET /intents`, `GET /categories`, `GET /templates/{intent}` expose the catalogue
//! - `GET /health` reports whether the classifier is loaded
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use deskchat_api::{BackendClient, HttpBackendClient};
//! use deskchat_types::BackendQuery;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = HttpBackendClient::new("http://localhost:8000", Duration::from_secs(30))?;
//!     let reply = client.predict(&BackendQuery::new("Where is my order?")).await?;
//!     println!("{} ({:?})", reply.response, reply.intent);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod http;

pub use client::BackendClient;
pub use error::BackendError;
pub use http::{normalize_base_url, HttpBackendClient};
