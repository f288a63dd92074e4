//! Unified configuration layer.
//!
//! All environment variable reads live here; business code goes through the
//! structured config types instead of calling `std::env::var` directly.

use std::env;

/// LLM API configuration for the analysis backend.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_base: String,
    pub api_key: String,
    pub model: String,
}

impl LlmConfig {
    /// Load from environment, falling back to defaults (loads `.env` once).
    pub fn from_env() -> Self {
        load_dotenv();
        Self {
            api_base: env_or(
                "FIREAUDIT_API_BASE",
                &["OPENAI_API_BASE", "OPENAI_BASE_URL"],
                || "https://api.openai.com/v1".to_string(),
            ),
            api_key: env_or("FIREAUDIT_API_KEY", &["OPENAI_API_KEY"], String::new),
            model: env_or("FIREAUDIT_MODEL", &["OPENAI_MODEL"], || {
                "gpt-4o".to_string()
            }),
        }
    }
}

/// Logging configuration. The CLI flag sets the base level; the
/// `FIREAUDIT_LOG_LEVEL` environment variable overrides it when set.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub log_level: Option<String>,
}

impl ObservabilityConfig {
    pub fn from_env() -> Self {
        load_dotenv();
        Self {
            log_level: env_optional("FIREAUDIT_LOG_LEVEL", &["LOG_LEVEL"]),
        }
    }
}

/// Read an env var through a primary key and alias chain, defaulting on miss.
pub fn env_or<F>(primary: &str, aliases: &[&str], default: F) -> String
where
    F: FnOnce() -> String,
{
    env_optional(primary, aliases).unwrap_or_else(default)
}

/// Read an env var through a primary key and alias chain. Empty values count
/// as unset.
pub fn env_optional(primary: &str, aliases: &[&str]) -> Option<String> {
    std::iter::once(primary)
        .chain(aliases.iter().copied())
        .find_map(|key| env::var(key).ok().filter(|v| !v.trim().is_empty()))
}

/// Load `.env` from the current directory into the environment, once per
/// process. Existing variables are never overwritten.
pub fn load_dotenv() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let path = env::current_dir()
            .map(|d| d.join(".env"))
            .unwrap_or_else(|_| std::path::PathBuf::from(".env"));
        let Ok(content) = std::fs::read_to_string(&path) else {
            return;
        };
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let mut value = value.trim();
            if (value.starts_with('"') && value.ends_with('"') && value.len() >= 2)
                || (value.starts_with('\'') && value.ends_with('\'') && value.len() >= 2)
            {
                value = &value[1..value.len() - 1];
            }
            if !key.is_empty() && env::var(key).is_err() {
                // SAFETY: called once at startup before any worker threads.
                unsafe {
                    env::set_var(key, value);
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_or_falls_back_to_default() {
        let v = env_or("FIREAUDIT_TEST_UNSET_KEY", &[], || "fallback".to_string());
        assert_eq!(v, "fallback");
    }

    #[test]
    fn env_optional_skips_empty_values() {
        // SAFETY: test-local key, no other thread reads it.
        unsafe {
            env::set_var("FIREAUDIT_TEST_EMPTY_KEY", "   ");
        }
        assert_eq!(env_optional("FIREAUDIT_TEST_EMPTY_KEY", &[]), None);
    }

    #[test]
    fn env_optional_honors_alias_chain() {
        // SAFETY: test-local key, no other thread reads it.
        unsafe {
            env::set_var("FIREAUDIT_TEST_ALIAS_KEY", "from-alias");
        }
        assert_eq!(
            env_optional("FIREAUDIT_TEST_PRIMARY_UNSET", &["FIREAUDIT_TEST_ALIAS_KEY"]),
            Some("from-alias".to_string())
        );
    }
}
