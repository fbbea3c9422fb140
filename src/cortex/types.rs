use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Connection coordinates shared by the Cortex REST clients.
#[derive(Debug, Clone)]
pub struct CortexConnection {
    pub account_url: String,
    pub api_token: String,
    pub token_type: String,
    pub database: String,
    pub schema: String,
    pub warehouse: String,
    pub request_timeout: Duration,
}

impl CortexConnection {
    pub fn statements_url(&self) -> String {
        format!(
            "{}/api/v2/statements",
            self.account_url.trim_end_matches('/')
        )
    }

    pub fn search_query_url(&self, service: &str) -> String {
        format!(
            "{}/api/v2/databases/{}/schemas/{}/cortex-search-services/{}:query",
            self.account_url.trim_end_matches('/'),
            urlencoding::encode(&self.database),
            urlencoding::encode(&self.schema),
            urlencoding::encode(service),
        )
    }
}

/// A Cortex Search service visible to the session role, with the text
/// column it indexes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub name: String,
    pub search_column: String,
}

/// One row returned by a Cortex Search query.
///
/// Column names come back in whatever case the service defines them, while
/// `DESCRIBE` reports the search column uppercased, so lookups here ignore
/// case.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievedDocument {
    #[serde(flatten)]
    columns: BTreeMap<String, Value>,
}

impl RetrievedDocument {
    pub fn new(columns: BTreeMap<String, Value>) -> Self {
        RetrievedDocument { columns }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(column))
            .map(|(_, value)| value)
    }

    pub fn get_str(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(|value| value.as_str())
    }

    /// Body text under the service's search column, empty when absent.
    pub fn text(&self, search_column: &str) -> &str {
        self.get_str(search_column).unwrap_or("")
    }

    pub fn file_url(&self) -> Option<&str> {
        self.get_str("file_url")
    }

    pub fn relative_path(&self) -> Option<&str> {
        self.get_str("relative_path")
    }
}

/// Boolean filter tree in the Cortex Search query syntax.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchFilter {
    Eq(String, Value),
    And(Vec<SearchFilter>),
    Or(Vec<SearchFilter>),
    Not(Box<SearchFilter>),
}

impl SearchFilter {
    /// The shipped corpus is tagged by language; scope retrieval to the
    /// English chunks.
    pub fn english_only() -> Self {
        SearchFilter::And(vec![SearchFilter::Eq(
            "language".to_string(),
            json!("English"),
        )])
    }

    pub fn to_value(&self) -> Value {
        match self {
            SearchFilter::Eq(column, value) => json!({ "@eq": { column: value } }),
            SearchFilter::And(clauses) => {
                let parts: Vec<Value> = clauses.iter().map(SearchFilter::to_value).collect();
                json!({ "@and": parts })
            }
            SearchFilter::Or(clauses) => {
                let parts: Vec<Value> = clauses.iter().map(SearchFilter::to_value).collect();
                json!({ "@or": parts })
            }
            SearchFilter::Not(clause) => json!({ "@not": clause.to_value() }),
        }
    }

    /// Parses the filter syntax back into a tree. Used for the config
    /// override, which is authored as raw JSON.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        if object.len() != 1 {
            return None;
        }
        let (operator, operand) = object.iter().next()?;
        match operator.as_str() {
            "@eq" => {
                let pair = operand.as_object()?;
                if pair.len() != 1 {
                    return None;
                }
                let (column, expected) = pair.iter().next()?;
                Some(SearchFilter::Eq(column.clone(), expected.clone()))
            }
            "@and" | "@or" => {
                let clauses: Option<Vec<SearchFilter>> = operand
                    .as_array()?
                    .iter()
                    .map(SearchFilter::from_value)
                    .collect();
                let clauses = clauses?;
                if clauses.is_empty() {
                    return None;
                }
                if operator == "@and" {
                    Some(SearchFilter::And(clauses))
                } else {
                    Some(SearchFilter::Or(clauses))
                }
            }
            "@not" => Some(SearchFilter::Not(Box::new(SearchFilter::from_value(
                operand,
            )?))),
            _ => None,
        }
    }
}

/// One retrieval call against a named search service.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub service: String,
    pub query: String,
    pub columns: Vec<String>,
    pub filter: Option<SearchFilter>,
    pub limit: u32,
}
