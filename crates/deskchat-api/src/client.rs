use async_trait::async_trait;
use deskchat_types::{BackendQuery, BackendReply, HealthStatus, ResponseTemplate};

use crate::error::BackendError;

/// Prediction backend interface
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Classify one utterance. Exactly one attempt, no retry.
    async fn predict(&self, query: &BackendQuery) -> Result<BackendReply, BackendError>;

    /// Every intent label the backend knows
    async fn intents(&self) -> Result<Vec<String>, BackendError> {
        Err(BackendError::Unsupported("intents"))
    }

    /// Every category label the backend knows
    async fn categories(&self) -> Result<Vec<String>, BackendError> {
        Err(BackendError::Unsupported("categories"))
    }

    /// Response templates for one intent; an unknown intent yields an empty list
    async fn templates(&self, _intent: &str) -> Result<Vec<ResponseTemplate>, BackendError> {
        Err(BackendError::Unsupported("templates"))
    }

    async fn health(&self) -> Result<HealthStatus, BackendError> {
        Err(BackendError::Unsupported("health"))
    }
}
