use tracing::warn;

use crate::cortex::error::CortexError;
use crate::cortex::sql::{SqlResultSet, SqlStatementsClient};
use crate::cortex::types::ServiceDescriptor;

const SHOW_SERVICES: &str = "SHOW CORTEX SEARCH SERVICES";

/// Enumerates the search services visible to the session role and resolves
/// each one's search column via `DESCRIBE`.
///
/// A service whose describe call fails, or which reports no search column,
/// is dropped from the roster rather than failing the whole discovery.
pub async fn discover_services(
    sql: &SqlStatementsClient,
) -> Result<Vec<ServiceDescriptor>, CortexError> {
    let listing = sql.execute(SHOW_SERVICES, None).await?;
    let names = service_names(&listing);

    let mut services = Vec::with_capacity(names.len());
    for name in names {
        let describe = format!("DESCRIBE CORTEX SEARCH SERVICE {}", name);
        match sql.execute(&describe, None).await {
            Ok(result) => match search_column(&result) {
                Some(search_column) => services.push(ServiceDescriptor {
                    name,
                    search_column,
                }),
                None => {
                    warn!("Search service {} reports no search column, skipping", name);
                }
            },
            Err(err) => {
                warn!("Failed to describe search service {}: {}", name, err);
            }
        }
    }

    Ok(services)
}

fn service_names(result: &SqlResultSet) -> Vec<String> {
    let mut names = Vec::new();
    for row in 0..result.rows().len() {
        if let Some(name) = result.str_cell(row, "name") {
            names.push(name.to_string());
        }
    }
    names
}

fn search_column(result: &SqlResultSet) -> Option<String> {
    let column = result.str_cell(0, "search_column")?;
    if column.is_empty() {
        return None;
    }
    Some(column.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn service_names_come_from_the_name_column() {
        let payload = json!({
            "resultSetMetaData": {
                "rowType": [
                    { "name": "created_on" },
                    { "name": "name" },
                    { "name": "database_name" }
                ]
            },
            "data": [
                ["2024-01-01", "REMEDIES_SVC", "REMEDIA_DOCS"],
                ["2024-02-01", "LEAFLETS_SVC", "REMEDIA_DOCS"]
            ]
        });
        let result = SqlResultSet::from_payload(&payload).unwrap();

        assert_eq!(service_names(&result), vec!["REMEDIES_SVC", "LEAFLETS_SVC"]);
    }

    #[test]
    fn search_column_reads_the_describe_row() {
        let payload = json!({
            "resultSetMetaData": {
                "rowType": [
                    { "name": "name" },
                    { "name": "search_column" }
                ]
            },
            "data": [ ["REMEDIES_SVC", "CHUNK"] ]
        });
        let result = SqlResultSet::from_payload(&payload).unwrap();

        assert_eq!(search_column(&result), Some("CHUNK".to_string()));
    }

    #[test]
    fn empty_or_missing_search_column_is_none() {
        let empty = json!({
            "resultSetMetaData": { "rowType": [ { "name": "search_column" } ] },
            "data": [ [""] ]
        });
        let result = SqlResultSet::from_payload(&empty).unwrap();
        assert_eq!(search_column(&result), None);

        let missing = json!({
            "resultSetMetaData": { "rowType": [ { "name": "name" } ] },
            "data": [ ["REMEDIES_SVC"] ]
        });
        let result = SqlResultSet::from_payload(&missing).unwrap();
        assert_eq!(search_column(&result), None);
    }
}
