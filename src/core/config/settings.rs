use std::time::Duration;

use serde_json::Value;
use tracing::warn;

use crate::chat::prompt::DEFAULT_SYSTEM_PROMPT;
use crate::chat::session::ChatOptions;
use crate::cortex::{CortexConnection, SearchFilter};

const DEFAULT_TOKEN_TYPE: &str = "PROGRAMMATIC_ACCESS_TOKEN";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
const DEFAULT_HOST: &str = "127.0.0.1";

/// Typed snapshot of the merged config, every field defaulted.
#[derive(Debug, Clone)]
pub struct Settings {
    pub connection: CortexConnection,
    pub system_prompt: String,
    pub search_filter: Option<SearchFilter>,
    pub default_options: ChatOptions,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
}

impl Settings {
    pub fn from_value(config: &Value) -> Self {
        let backend = config.get("backend");

        let connection = CortexConnection {
            account_url: backend_string(backend, "account_url"),
            api_token: backend_string(backend, "api_token"),
            token_type: backend_string_or(backend, "token_type", DEFAULT_TOKEN_TYPE),
            database: backend_string(backend, "database"),
            schema: backend_string(backend, "schema"),
            warehouse: backend_string(backend, "warehouse"),
            request_timeout: Duration::from_secs(
                backend
                    .and_then(|section| section.get("request_timeout_secs"))
                    .and_then(|value| value.as_u64())
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
        };

        let system_prompt = config
            .get("assistant")
            .and_then(|assistant| assistant.get("system_prompt"))
            .and_then(|value| value.as_str())
            .filter(|text| !text.trim().is_empty())
            .unwrap_or(DEFAULT_SYSTEM_PROMPT)
            .to_string();

        let search_filter = match config.get("search").and_then(|search| search.get("filter")) {
            None => Some(SearchFilter::english_only()),
            Some(Value::Null) => None,
            Some(value) => match SearchFilter::from_value(value) {
                Some(filter) => Some(filter),
                None => {
                    warn!("Ignoring malformed search.filter, using the default");
                    Some(SearchFilter::english_only())
                }
            },
        };

        let default_options = config
            .get("defaults")
            .and_then(|defaults| serde_json::from_value::<ChatOptions>(defaults.clone()).ok())
            .unwrap_or_default();

        let host = config
            .get("server")
            .and_then(|server| server.get("host"))
            .and_then(|value| value.as_str())
            .unwrap_or(DEFAULT_HOST)
            .to_string();

        let cors_allowed_origins = config
            .get("server")
            .and_then(|server| server.get("cors_allowed_origins"))
            .and_then(|value| value.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_str())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Settings {
            connection,
            system_prompt,
            search_filter,
            default_options,
            host,
            cors_allowed_origins,
        }
    }

    /// Whether enough of the backend section is present to reach Snowflake.
    /// The warehouse stays optional; statements then run on the account
    /// default.
    pub fn configured(&self) -> bool {
        let connection = &self.connection;
        !connection.account_url.is_empty()
            && !connection.api_token.is_empty()
            && !connection.database.is_empty()
            && !connection.schema.is_empty()
    }
}

fn backend_string(backend: Option<&Value>, key: &str) -> String {
    backend_string_or(backend, key, "")
}

fn backend_string_or(backend: Option<&Value>, key: &str, fallback: &str) -> String {
    backend
        .and_then(|section| section.get(key))
        .and_then(|value| value.as_str())
        .unwrap_or(fallback)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_config() -> Value {
        json!({
            "backend": {
                "account_url": "https://acct.snowflakecomputing.com",
                "api_token": "tok-123",
                "database": "REMEDIA_DOCS",
                "schema": "DATA",
                "warehouse": "COMPUTE_WH",
                "request_timeout_secs": 30
            },
            "assistant": { "system_prompt": "Be terse." },
            "defaults": { "model": "llama3.1-70b", "num_retrieved_chunks": 7 },
            "server": {
                "host": "0.0.0.0",
                "cors_allowed_origins": ["https://ui.example.com"]
            }
        })
    }

    #[test]
    fn full_config_maps_every_field() {
        let settings = Settings::from_value(&full_config());

        assert!(settings.configured());
        assert_eq!(settings.connection.database, "REMEDIA_DOCS");
        assert_eq!(settings.connection.token_type, "PROGRAMMATIC_ACCESS_TOKEN");
        assert_eq!(settings.connection.request_timeout, Duration::from_secs(30));
        assert_eq!(settings.system_prompt, "Be terse.");
        assert_eq!(settings.default_options.model, "llama3.1-70b");
        assert_eq!(settings.default_options.num_retrieved_chunks, 7);
        assert_eq!(settings.default_options.num_chat_messages, 5);
        assert_eq!(settings.host, "0.0.0.0");
        assert_eq!(
            settings.cors_allowed_origins,
            vec!["https://ui.example.com".to_string()]
        );
    }

    #[test]
    fn empty_config_falls_back_everywhere() {
        let settings = Settings::from_value(&json!({}));

        assert!(!settings.configured());
        assert_eq!(settings.system_prompt, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(settings.default_options, ChatOptions::default());
        assert_eq!(settings.host, "127.0.0.1");
        assert_eq!(settings.search_filter, Some(SearchFilter::english_only()));
        assert_eq!(
            settings.connection.request_timeout,
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)
        );
    }

    #[test]
    fn null_filter_disables_filtering() {
        let settings = Settings::from_value(&json!({ "search": { "filter": null } }));
        assert_eq!(settings.search_filter, None);
    }

    #[test]
    fn malformed_filter_falls_back_to_default() {
        let settings =
            Settings::from_value(&json!({ "search": { "filter": { "@xor": [] } } }));
        assert_eq!(settings.search_filter, Some(SearchFilter::english_only()));
    }

    #[test]
    fn custom_filter_is_parsed() {
        let settings = Settings::from_value(&json!({
            "search": { "filter": { "@eq": { "region": "EU" } } }
        }));
        assert_eq!(
            settings.search_filter,
            Some(SearchFilter::Eq("region".to_string(), json!("EU")))
        );
    }

    #[test]
    fn configured_requires_the_token() {
        let mut config = full_config();
        config["backend"]
            .as_object_mut()
            .unwrap()
            .remove("api_token");

        assert!(!Settings::from_value(&config).configured());
    }

    #[test]
    fn configured_tolerates_a_missing_warehouse() {
        let mut config = full_config();
        config["backend"]
            .as_object_mut()
            .unwrap()
            .remove("warehouse");

        let settings = Settings::from_value(&config);
        assert!(settings.configured());
        assert!(settings.connection.warehouse.is_empty());
    }
}
