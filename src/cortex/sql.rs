use reqwest::StatusCode;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::cortex::error::CortexError;
use crate::cortex::types::CortexConnection;

const TOKEN_TYPE_HEADER: &str = "X-Snowflake-Authorization-Token-Type";

/// Client for the Snowflake SQL statements REST API.
///
/// Statements run synchronously in the connection's database and schema,
/// with the warehouse attached when one is configured. Statements that
/// Snowflake parks for async execution are surfaced as
/// [`CortexError::StatementPending`].
pub struct SqlStatementsClient {
    client: reqwest::Client,
    connection: CortexConnection,
}

impl SqlStatementsClient {
    pub fn new(connection: CortexConnection) -> Result<Self, CortexError> {
        let client = reqwest::Client::builder()
            .timeout(connection.request_timeout)
            .build()?;
        Ok(SqlStatementsClient { client, connection })
    }

    pub async fn execute(
        &self,
        statement: &str,
        bindings: Option<Value>,
    ) -> Result<SqlResultSet, CortexError> {
        let mut body = json!({
            "statement": statement,
            "timeout": self.connection.request_timeout.as_secs(),
            "database": self.connection.database,
            "schema": self.connection.schema,
        });
        if !self.connection.warehouse.is_empty() {
            body["warehouse"] = json!(self.connection.warehouse);
        }
        if let Some(bindings) = bindings {
            body["bindings"] = bindings;
        }

        debug!("Executing statement: {}", statement);
        let response = self
            .client
            .post(self.connection.statements_url())
            .bearer_auth(&self.connection.api_token)
            .header(TOKEN_TYPE_HEADER, &self.connection.token_type)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let payload: Value = response.json().await?;

        if status == StatusCode::ACCEPTED {
            let code = payload
                .get("code")
                .and_then(|code| code.as_str())
                .unwrap_or("unknown")
                .to_string();
            return Err(CortexError::StatementPending { code });
        }

        if !status.is_success() {
            let message = payload
                .get("message")
                .and_then(|message| message.as_str())
                .unwrap_or("statement execution failed")
                .to_string();
            return Err(CortexError::Api {
                status: status.as_u16(),
                message,
            });
        }

        SqlResultSet::from_payload(&payload)
    }
}

/// Positional TEXT bind variables, keyed "1", "2", ... as the statements
/// API expects.
pub fn text_bindings(values: &[&str]) -> Value {
    let mut bindings = Map::new();
    for (index, value) in values.iter().enumerate() {
        bindings.insert(
            (index + 1).to_string(),
            json!({ "type": "TEXT", "value": value }),
        );
    }
    Value::Object(bindings)
}

/// Columns and rows of one executed statement.
#[derive(Debug, Clone)]
pub struct SqlResultSet {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl SqlResultSet {
    pub(crate) fn from_payload(payload: &Value) -> Result<Self, CortexError> {
        let columns = payload
            .get("resultSetMetaData")
            .and_then(|meta| meta.get("rowType"))
            .and_then(|row_type| row_type.as_array())
            .ok_or_else(|| CortexError::response_shape("missing resultSetMetaData.rowType"))?
            .iter()
            .map(|column| {
                column
                    .get("name")
                    .and_then(|name| name.as_str())
                    .map(str::to_string)
                    .ok_or_else(|| CortexError::response_shape("rowType entry without a name"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let rows = payload
            .get("data")
            .and_then(|data| data.as_array())
            .ok_or_else(|| CortexError::response_shape("missing data rows"))?
            .iter()
            .map(|row| {
                row.as_array()
                    .cloned()
                    .ok_or_else(|| CortexError::response_shape("data row is not an array"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SqlResultSet { columns, rows })
    }

    /// Snowflake uppercases unquoted identifiers, so match by name
    /// regardless of case.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|column| column.eq_ignore_ascii_case(name))
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn str_cell(&self, row: usize, column: &str) -> Option<&str> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index)?.as_str()
    }

    /// First cell of the first row, for single-scalar statements.
    pub fn scalar(&self) -> Option<&str> {
        self.rows.first()?.first()?.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_payload() -> Value {
        json!({
            "resultSetMetaData": {
                "rowType": [
                    { "name": "NAME", "type": "text" },
                    { "name": "COMMENT", "type": "text" }
                ]
            },
            "data": [
                ["REMEDIES_SVC", "herbal remedies"],
                ["LEAFLETS_SVC", null]
            ]
        })
    }

    #[test]
    fn result_set_zips_row_type_with_data() {
        let result = SqlResultSet::from_payload(&sample_payload()).unwrap();

        assert_eq!(result.rows().len(), 2);
        assert_eq!(result.str_cell(0, "name"), Some("REMEDIES_SVC"));
        assert_eq!(result.str_cell(1, "NAME"), Some("LEAFLETS_SVC"));
        assert_eq!(result.str_cell(1, "comment"), None);
    }

    #[test]
    fn scalar_reads_first_cell() {
        let result = SqlResultSet::from_payload(&sample_payload()).unwrap();
        assert_eq!(result.scalar(), Some("REMEDIES_SVC"));
    }

    #[test]
    fn malformed_payload_is_a_shape_error() {
        let missing_meta = json!({ "data": [] });
        let error = SqlResultSet::from_payload(&missing_meta).unwrap_err();
        assert!(matches!(error, CortexError::ResponseShape(_)));

        let missing_data = json!({ "resultSetMetaData": { "rowType": [] } });
        let error = SqlResultSet::from_payload(&missing_data).unwrap_err();
        assert!(matches!(error, CortexError::ResponseShape(_)));
    }

    #[test]
    fn text_bindings_are_positional_from_one() {
        let bindings = text_bindings(&["mistral-large2", "[INST] hi [/INST]"]);

        assert_eq!(
            bindings,
            json!({
                "1": { "type": "TEXT", "value": "mistral-large2" },
                "2": { "type": "TEXT", "value": "[INST] hi [/INST]" }
            })
        );
    }
}
