use async_trait::async_trait;

use crate::cortex::error::CortexError;
use crate::cortex::types::{RetrievedDocument, SearchRequest, ServiceDescriptor};

/// Text completion against a hosted model.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, model: &str, prompt: &str) -> Result<String, CortexError>;
}

/// Search service discovery plus chunk retrieval.
#[async_trait]
pub trait RetrievalBackend: Send + Sync {
    async fn list_services(&self) -> Result<Vec<ServiceDescriptor>, CortexError>;

    async fn search(&self, request: &SearchRequest) -> Result<Vec<RetrievedDocument>, CortexError>;
}
