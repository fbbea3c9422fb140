use serde_json::{Map, Value};

use crate::chat::session::{
    MAX_CHAT_MESSAGES, MAX_RETRIEVED_CHUNKS, MIN_CHAT_MESSAGES, MIN_RETRIEVED_CHUNKS, MODELS,
};
use crate::core::errors::ApiError;
use crate::cortex::SearchFilter;

pub fn validate_config(config: &Value) -> Result<(), ApiError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(backend) = expect_optional_object(root, "backend")? {
        validate_optional_string_field(backend, "backend.account_url", "account_url")?;
        validate_optional_string_field(backend, "backend.api_token", "api_token")?;
        validate_optional_string_field(backend, "backend.token_type", "token_type")?;
        validate_optional_string_field(backend, "backend.database", "database")?;
        validate_optional_string_field(backend, "backend.schema", "schema")?;
        validate_optional_string_field(backend, "backend.warehouse", "warehouse")?;
        validate_u64_field(
            backend,
            "backend.request_timeout_secs",
            "request_timeout_secs",
            1,
            600,
        )?;

        if let Some(url) = backend.get("account_url").and_then(|value| value.as_str()) {
            if !url.is_empty() && !url.starts_with("https://") && !url.starts_with("http://") {
                return Err(ApiError::BadRequest(
                    "Invalid config at 'backend.account_url': must be an http(s) URL".to_string(),
                ));
            }
        }
    }

    if let Some(assistant) = expect_optional_object(root, "assistant")? {
        validate_optional_string_field(assistant, "assistant.system_prompt", "system_prompt")?;
    }

    if let Some(search) = expect_optional_object(root, "search")? {
        if let Some(filter) = search.get("filter") {
            if !filter.is_null() && SearchFilter::from_value(filter).is_none() {
                return Err(ApiError::BadRequest(
                    "Invalid config at 'search.filter': expected @and/@or/@not/@eq tree"
                        .to_string(),
                ));
            }
        }
    }

    if let Some(defaults) = expect_optional_object(root, "defaults")? {
        if let Some(model) = defaults.get("model") {
            let Some(name) = model.as_str() else {
                return Err(config_type_error("defaults.model", "string"));
            };
            if !MODELS.contains(&name) {
                return Err(ApiError::BadRequest(format!(
                    "Invalid config at 'defaults.model': unknown model '{}'",
                    name
                )));
            }
        }
        validate_u64_field(
            defaults,
            "defaults.num_retrieved_chunks",
            "num_retrieved_chunks",
            MIN_RETRIEVED_CHUNKS as u64,
            MAX_RETRIEVED_CHUNKS as u64,
        )?;
        validate_u64_field(
            defaults,
            "defaults.num_chat_messages",
            "num_chat_messages",
            MIN_CHAT_MESSAGES as u64,
            MAX_CHAT_MESSAGES as u64,
        )?;
        validate_bool_field(defaults, "defaults.use_chat_history", "use_chat_history")?;
        validate_bool_field(defaults, "defaults.debug", "debug")?;
    }

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_string_array_field(
            server,
            "server.cors_allowed_origins",
            "cors_allowed_origins",
        )?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ApiError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(config_type_error(key, "object")),
        None => Ok(None),
    }
}

fn validate_bool_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.as_bool().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "boolean"))
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.as_str().is_none() {
        return Err(config_type_error(path, "string"));
    }
    Ok(())
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&format!("{}[{}]", path, index), "string"));
        };
        if text.trim().is_empty() {
            return Err(ApiError::BadRequest(format!(
                "Invalid config at '{}[{}]': value cannot be empty",
                path, index
            )));
        }
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> ApiError {
    ApiError::BadRequest(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn valid_config_passes() {
        let config = json!({
            "backend": {
                "account_url": "https://acct.snowflakecomputing.com",
                "api_token": "tok",
                "database": "DOCS",
                "request_timeout_secs": 60
            },
            "defaults": { "model": "llama3.1-8b", "num_retrieved_chunks": 10 },
            "server": { "cors_allowed_origins": ["http://localhost:5173"] }
        });

        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn rejects_non_url_account_url() {
        let config = json!({ "backend": { "account_url": "acct.snowflakecomputing.com" } });
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn rejects_out_of_range_defaults() {
        let config = json!({ "defaults": { "num_retrieved_chunks": 31 } });
        assert!(validate_config(&config).is_err());

        let config = json!({ "defaults": { "num_chat_messages": 0 } });
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn rejects_unknown_default_model() {
        let config = json!({ "defaults": { "model": "gpt-4" } });
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn rejects_malformed_search_filter() {
        let config = json!({ "search": { "filter": { "@maybe": [] } } });
        assert!(validate_config(&config).is_err());

        let config = json!({ "search": { "filter": null } });
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn rejects_wrong_types() {
        let config = json!({ "backend": "not an object" });
        assert!(validate_config(&config).is_err());

        let config = json!({ "server": { "cors_allowed_origins": "https://one" } });
        assert!(validate_config(&config).is_err());

        let config = json!({ "defaults": { "use_chat_history": "yes" } });
        assert!(validate_config(&config).is_err());
    }
}
