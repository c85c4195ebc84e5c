use serde_json::{Map, Value};
use crate::core::errors::ApiError;

const STORE_BACKENDS: [&str; 2] = ["memory", "sqlite"];
const EMBEDDING_BACKENDS: [&str; 2] = ["remote", "local"];

pub fn validate_config(config: &Value) -> Result<(), ApiError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 0, 65535)?;
        validate_string_array_field(
            server,
            "server.cors_allowed_origins",
            "cors_allowed_origins",
        )?;
    }

    if let Some(llm) = expect_optional_object(root, "llm")? {
        validate_optional_string_field(llm, "llm.base_url", "base_url")?;
        validate_optional_string_field(llm, "llm.api_key", "api_key")?;
        validate_optional_string_field(llm, "llm.chat_model", "chat_model")?;
        validate_optional_string_field(llm, "llm.embedding_model", "embedding_model")?;
        validate_enum_field(
            llm,
            "llm.embedding_backend",
            "embedding_backend",
            &EMBEDDING_BACKENDS,
        )?;
        validate_u64_field(
            llm,
            "llm.embedding_dimension",
            "embedding_dimension",
            1,
            65_536,
        )?;
        validate_u64_field(llm, "llm.max_tokens", "max_tokens", 1, 1_000_000)?;
    }

    if let Some(rag) = expect_optional_object(root, "rag")? {
        validate_enum_field(rag, "rag.store", "store", &STORE_BACKENDS)?;
        validate_u64_field(rag, "rag.default_top_k", "default_top_k", 1, 1_000)?;
        validate_u64_field(rag, "rag.max_top_k", "max_top_k", 1, 1_000)?;
        validate_u64_field(
            rag,
            "rag.max_context_chars",
            "max_context_chars",
            1,
            10_000_000,
        )?;
        validate_u64_field(
            rag,
            "rag.max_chunk_chars",
            "max_chunk_chars",
            16,
            1_000_000,
        )?;
        validate_u64_field(
            rag,
            "rag.provider_timeout_secs",
            "provider_timeout_secs",
            1,
            86_400,
        )?;
    }

    if let Some(web) = expect_optional_object(root, "web")? {
        validate_u64_field(
            web,
            "web.fetch_timeout_secs",
            "fetch_timeout_secs",
            1,
            86_400,
        )?;
        validate_optional_string_field(web, "web.render_endpoint", "render_endpoint")?;
        validate_optional_string_field(web, "web.user_agent", "user_agent")?;
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

fn validate_enum_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    allowed: &[&str],
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if !allowed.contains(&text) {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': expected one of {}",
            path,
            allowed.join(", ")
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
    if value.is_null() || value.as_str().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "string"))
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
    fn accepts_empty_and_complete_configs() {
        assert!(validate_config(&json!({})).is_ok());
        assert!(validate_config(&json!({
            "server": { "host": "0.0.0.0", "port": 8000, "cors_allowed_origins": ["*"] },
            "llm": { "embedding_backend": "local", "embedding_dimension": 384 },
            "rag": { "store": "sqlite", "default_top_k": 1, "max_top_k": 5 },
            "web": { "fetch_timeout_secs": 10, "render_endpoint": null }
        }))
        .is_ok());
    }

    #[test]
    fn rejects_unknown_store_backend() {
        let err = validate_config(&json!({ "rag": { "store": "chroma" } })).unwrap_err();
        assert!(err.to_string().contains("rag.store"));
    }

    #[test]
    fn rejects_out_of_range_numbers() {
        let err = validate_config(&json!({ "rag": { "default_top_k": 0 } })).unwrap_err();
        assert!(err.to_string().contains("between 1 and 1000"));

        let err = validate_config(&json!({ "server": { "port": "eighty" } })).unwrap_err();
        assert!(err.to_string().contains("expected integer"));
    }

    #[test]
    fn rejects_non_object_sections() {
        let err = validate_config(&json!({ "llm": "gemini" })).unwrap_err();
        assert!(err.to_string().contains("'llm': expected object"));
    }
}
