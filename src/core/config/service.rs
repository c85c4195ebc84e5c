use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::paths::AppPaths;
use super::settings::AppConfig;
use super::validation::validate_config;
use crate::core::errors::ApiError;

const REDACT_PLACEHOLDER: &str = "****";

const SENSITIVE_PATTERNS: [&str; 8] = [
    "api_key",
    "secret",
    "password",
    "_token",
    "token_",
    "credential",
    "access_key",
    "bearer",
];

const SENSITIVE_WHITELIST: [&str; 3] = ["max_tokens", "total_tokens", "tokens"];

/// Environment variables that override file configuration, by dotted path.
const ENV_OVERRIDES: [(&str, &[&str]); 6] = [
    ("GEMINI_API_KEY", &["llm", "api_key"]),
    ("RAGBOT_API_KEY", &["llm", "api_key"]),
    ("RAGBOT_BASE_URL", &["llm", "base_url"]),
    ("RAGBOT_HOST", &["server", "host"]),
    ("RAGBOT_RENDER_ENDPOINT", &["web", "render_endpoint"]),
    ("PORT", &["server", "port"]),
];

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("RAGBOT_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.paths.secrets_path.clone()
    }

    /// Loads the raw merged configuration: public file, secrets file, then
    /// environment overrides.
    pub fn load_config(&self) -> Result<Value, ApiError> {
        let public_config = load_yaml_file(&self.config_path());
        let secrets_config = load_yaml_file(&self.secrets_path());
        let mut merged = deep_merge(&public_config, &secrets_config);
        apply_env_overrides(&mut merged, |key| env::var(key).ok());
        validate_config(&merged)?;
        Ok(merged)
    }

    pub fn redact_sensitive_values(&self, value: &Value) -> Value {
        redact_sensitive_values(value)
    }
}

pub fn parse_app_config(raw: Value) -> Result<AppConfig, ApiError> {
    serde_json::from_value(raw)
        .map_err(|e| ApiError::BadRequest(format!("Invalid config: {}", e)))
}

fn load_yaml_file(path: &Path) -> Value {
    if !path.exists() {
        return Value::Object(Map::new());
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<Value>(&contents) {
            Ok(value) => match value {
                Value::Object(_) => value,
                _ => Value::Object(Map::new()),
            },
            Err(err) => {
                tracing::warn!("Ignoring unparsable config {}: {}", path.display(), err);
                Value::Object(Map::new())
            }
        },
        Err(_) => Value::Object(Map::new()),
    }
}

fn apply_env_overrides<F>(config: &mut Value, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    for (var, path) in ENV_OVERRIDES {
        let Some(raw) = lookup(var) else {
            continue;
        };
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let value = match raw.parse::<u64>() {
            Ok(number) if var == "PORT" => Value::from(number),
            _ => Value::String(raw.to_string()),
        };
        ensure_object_path(config, path, value);
    }
}

fn ensure_object_path(config: &mut Value, path: &[&str], value: Value) {
    if path.is_empty() {
        return;
    }

    let mut current = config;
    for (index, key) in path.iter().enumerate() {
        if index == path.len() - 1 {
            if let Some(map) = current.as_object_mut() {
                map.insert(key.to_string(), value);
            }
            return;
        }

        if !current.get(*key).map(|v| v.is_object()).unwrap_or(false) {
            let Some(map) = current.as_object_mut() else {
                return;
            };
            map.insert((*key).to_string(), Value::Object(Map::new()));
        }

        let Some(next) = current.get_mut(*key) else {
            return;
        };
        current = next;
    }
}

fn deep_merge(base: &Value, override_value: &Value) -> Value {
    match (base, override_value) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => override_value.clone(),
    }
}

fn redact_sensitive_values(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted = Map::new();
            for (key, val) in map {
                if is_sensitive_key(key) && !val.is_null() {
                    redacted.insert(key.clone(), Value::String(REDACT_PLACEHOLDER.to_string()));
                } else {
                    redacted.insert(key.clone(), redact_sensitive_values(val));
                }
            }
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_sensitive_values).collect()),
        _ => value.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let key_lower = key.to_lowercase();
    if SENSITIVE_WHITELIST
        .iter()
        .any(|allowed| *allowed == key_lower)
    {
        return false;
    }
    SENSITIVE_PATTERNS
        .iter()
        .any(|pattern| key_lower.contains(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::settings::{EmbeddingBackend, StoreBackend};
    use serde_json::json;

    #[test]
    fn deep_merge_merges_objects_and_overrides_scalars() {
        let base = json!({
            "llm": { "chat_model": "gemini-2.0-flash", "api_key": null },
            "rag": { "default_top_k": 1 }
        });
        let secrets = json!({
            "llm": { "api_key": "secret" }
        });

        let merged = deep_merge(&base, &secrets);

        assert_eq!(
            merged,
            json!({
                "llm": { "chat_model": "gemini-2.0-flash", "api_key": "secret" },
                "rag": { "default_top_k": 1 }
            })
        );
    }

    #[test]
    fn env_overrides_fill_missing_sections() {
        let mut config = json!({ "rag": { "store": "sqlite" } });
        apply_env_overrides(&mut config, |key| match key {
            "GEMINI_API_KEY" => Some("from-env".to_string()),
            "PORT" => Some("9100".to_string()),
            _ => None,
        });

        assert_eq!(config["llm"]["api_key"], json!("from-env"));
        assert_eq!(config["server"]["port"], json!(9100));
        assert_eq!(config["rag"]["store"], json!("sqlite"));
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let mut config = json!({ "llm": { "api_key": "file-key" } });
        apply_env_overrides(&mut config, |key| match key {
            "GEMINI_API_KEY" => Some("   ".to_string()),
            _ => None,
        });
        assert_eq!(config["llm"]["api_key"], json!("file-key"));
    }

    #[test]
    fn parse_app_config_applies_defaults() {
        let config = parse_app_config(json!({
            "llm": { "embedding_backend": "local" },
            "rag": { "store": "sqlite", "max_top_k": 3 }
        }))
        .unwrap();

        assert_eq!(config.llm.embedding_backend, EmbeddingBackend::Local);
        assert_eq!(config.llm.chat_model, "gemini-2.0-flash");
        assert_eq!(config.rag.store, StoreBackend::Sqlite);
        assert_eq!(config.rag.max_top_k, 3);
        assert_eq!(config.rag.default_top_k, 1);
        assert_eq!(config.server.port, 8000);
        assert!(config.llm.api_key().is_none());
    }

    #[test]
    fn redact_sensitive_values_replaces_secrets_only() {
        let input = json!({
            "llm": {
                "api_key": "secret",
                "max_tokens": 42
            },
            "web": { "render_endpoint": "http://localhost:3000" }
        });

        let redacted = redact_sensitive_values(&input);

        assert_eq!(
            redacted,
            json!({
                "llm": {
                    "api_key": "****",
                    "max_tokens": 42
                },
                "web": { "render_endpoint": "http://localhost:3000" }
            })
        );
    }
}
