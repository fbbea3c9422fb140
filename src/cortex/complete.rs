use async_trait::async_trait;

use crate::cortex::error::CortexError;
use crate::cortex::provider::CompletionBackend;
use crate::cortex::sql::{text_bindings, SqlStatementsClient};
use crate::cortex::types::CortexConnection;

const COMPLETE_STATEMENT: &str = "SELECT SNOWFLAKE.CORTEX.COMPLETE(?, ?)";

/// `SNOWFLAKE.CORTEX.COMPLETE` invoked through the SQL statements API.
///
/// Model name and prompt travel as bind variables, never spliced into the
/// statement text.
pub struct CortexCompleteClient {
    sql: SqlStatementsClient,
}

impl CortexCompleteClient {
    pub fn new(connection: CortexConnection) -> Result<Self, CortexError> {
        Ok(CortexCompleteClient {
            sql: SqlStatementsClient::new(connection)?,
        })
    }
}

#[async_trait]
impl CompletionBackend for CortexCompleteClient {
    async fn complete(&self, model: &str, prompt: &str) -> Result<String, CortexError> {
        let bindings = text_bindings(&[model, prompt]);
        let result = self.sql.execute(COMPLETE_STATEMENT, Some(bindings)).await?;

        let answer = result
            .scalar()
            .ok_or_else(|| CortexError::response_shape("COMPLETE returned no rows"))?;

        Ok(answer.to_string())
    }
}
