use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::cortex::discovery::discover_services;
use crate::cortex::error::CortexError;
use crate::cortex::provider::RetrievalBackend;
use crate::cortex::sql::SqlStatementsClient;
use crate::cortex::types::{CortexConnection, RetrievedDocument, SearchRequest, ServiceDescriptor};

const TOKEN_TYPE_HEADER: &str = "X-Snowflake-Authorization-Token-Type";

/// Cortex Search over REST: service discovery through the statements API,
/// chunk retrieval through each service's `:query` endpoint.
pub struct CortexSearchClient {
    client: reqwest::Client,
    sql: SqlStatementsClient,
    connection: CortexConnection,
}

impl CortexSearchClient {
    pub fn new(connection: CortexConnection) -> Result<Self, CortexError> {
        let client = reqwest::Client::builder()
            .timeout(connection.request_timeout)
            .build()?;
        let sql = SqlStatementsClient::new(connection.clone())?;
        Ok(CortexSearchClient {
            client,
            sql,
            connection,
        })
    }

    fn request_body(request: &SearchRequest) -> Value {
        let mut body = json!({
            "query": request.query,
            "columns": request.columns,
            "limit": request.limit,
        });
        if let Some(filter) = &request.filter {
            body["filter"] = filter.to_value();
        }
        body
    }

    fn parse_results(payload: &Value) -> Result<Vec<RetrievedDocument>, CortexError> {
        let results = payload
            .get("results")
            .and_then(|results| results.as_array())
            .ok_or_else(|| CortexError::response_shape("missing results array"))?;

        results
            .iter()
            .map(|row| {
                let columns = row
                    .as_object()
                    .ok_or_else(|| CortexError::response_shape("result row is not an object"))?;
                Ok(RetrievedDocument::new(
                    columns
                        .iter()
                        .map(|(key, value)| (key.clone(), value.clone()))
                        .collect(),
                ))
            })
            .collect()
    }
}

#[async_trait]
impl RetrievalBackend for CortexSearchClient {
    async fn list_services(&self) -> Result<Vec<ServiceDescriptor>, CortexError> {
        discover_services(&self.sql).await
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<RetrievedDocument>, CortexError> {
        let url = self.connection.search_query_url(&request.service);
        let body = Self::request_body(request);

        debug!("Searching {} for: {}", request.service, request.query);
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.connection.api_token)
            .header(TOKEN_TYPE_HEADER, &self.connection.token_type)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let payload: Value = response.json().await.unwrap_or(Value::Null);
            let message = payload
                .get("message")
                .and_then(|message| message.as_str())
                .unwrap_or("search query failed")
                .to_string();
            return Err(CortexError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let payload: Value = response.json().await?;
        Self::parse_results(&payload)
    }
}
