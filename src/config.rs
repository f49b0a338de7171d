//! Configuration types, read from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::admin::AdminPolicy;
use crate::coaching::{CoachDefaults, FaithMode};
use crate::error::ConfigError;
use crate::llm::{LlmBackend, LlmConfig};

const DEFAULT_MODEL: &str = "gpt-4.1-mini";
const DEFAULT_DB_PATH: &str = "./data/coach-assist.db";
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 120;

/// Which `StateStore` backs the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    LibSql { path: PathBuf },
    Memory,
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: SecretString,
    pub allowed_users: Vec<String>,
}

/// HTTP event surface. Every `/api` request must carry the bearer token.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub port: u16,
    pub token: SecretString,
}

#[derive(Debug, Clone)]
pub struct CoachConfig {
    pub llm: LlmConfig,
    pub store: StoreConfig,
    pub admin_ids: Vec<String>,
    pub admin_role: Option<String>,
    pub telegram: Option<TelegramConfig>,
    /// Disabled unless `COACH_HTTP_PORT` is set.
    pub http: Option<HttpConfig>,
    /// Read stdin as the `cli` channel.
    pub cli: bool,
    pub defaults: CoachDefaults,
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.into(),
    }
}

impl CoachConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend: LlmBackend = match get("COACH_LLM_BACKEND") {
            Some(raw) => raw
                .parse()
                .map_err(|e: String| invalid("COACH_LLM_BACKEND", e))?,
            None => LlmBackend::OpenAi,
        };
        let key_var = match backend {
            LlmBackend::OpenAi => "OPENAI_API_KEY",
            LlmBackend::Anthropic => "ANTHROPIC_API_KEY",
        };
        let api_key = get(key_var).ok_or_else(|| ConfigError::MissingEnvVar(key_var.into()))?;

        let timeout_secs = match get("COACH_LLM_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or_else(|| invalid("COACH_LLM_TIMEOUT_SECS", "expected a positive integer"))?,
            None => DEFAULT_LLM_TIMEOUT_SECS,
        };

        let llm = LlmConfig {
            backend,
            api_key: SecretString::from(api_key),
            model: get("COACH_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout: Duration::from_secs(timeout_secs),
        };

        let store = match get("COACH_STORE").as_deref().map(str::trim) {
            Some("memory") => StoreConfig::Memory,
            Some("libsql") | None => StoreConfig::LibSql {
                path: PathBuf::from(
                    get("COACH_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
                ),
            },
            Some(other) => {
                return Err(invalid(
                    "COACH_STORE",
                    format!("unknown store '{other}' (libsql, memory)"),
                ));
            }
        };

        let telegram = get("TELEGRAM_BOT_TOKEN").map(|token| TelegramConfig {
            bot_token: SecretString::from(token),
            allowed_users: split_list(
                &get("TELEGRAM_ALLOWED_USERS").unwrap_or_else(|| "*".to_string()),
            ),
        });

        let http = match get("COACH_HTTP_PORT") {
            Some(raw) => {
                let port = raw
                    .trim()
                    .parse::<u16>()
                    .map_err(|e| invalid("COACH_HTTP_PORT", e.to_string()))?;
                let token = get("COACH_HTTP_TOKEN")
                    .ok_or_else(|| ConfigError::MissingEnvVar("COACH_HTTP_TOKEN".into()))?;
                Some(HttpConfig {
                    port,
                    token: SecretString::from(token.trim().to_string()),
                })
            }
            None => None,
        };

        let cli = match get("COACH_CLI").map(|v| v.trim().to_ascii_lowercase()) {
            None => true,
            Some(v) if matches!(v.as_str(), "1" | "true" | "on") => true,
            Some(v) if matches!(v.as_str(), "0" | "false" | "off") => false,
            Some(v) => return Err(invalid("COACH_CLI", format!("expected on/off, got '{v}'"))),
        };

        let faith_mode = match get("COACH_FAITH_MODE") {
            Some(raw) => raw
                .parse::<FaithMode>()
                .map_err(|e| invalid("COACH_FAITH_MODE", e))?,
            None => FaithMode::default(),
        };

        Ok(Self {
            llm,
            store,
            admin_ids: get("COACH_ADMIN_IDS")
                .map(|raw| split_list(&raw))
                .unwrap_or_default(),
            admin_role: get("COACH_ADMIN_ROLE").map(|r| r.trim().to_string()),
            telegram,
            http,
            cli,
            defaults: CoachDefaults {
                global_tone: get("COACH_GLOBAL_TONE"),
                faith_mode,
            },
        })
    }

    pub fn admin_policy(&self) -> AdminPolicy {
        AdminPolicy::new(self.admin_ids.clone(), self.admin_role.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<CoachConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CoachConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_with_only_an_api_key() {
        let cfg = config(&[("OPENAI_API_KEY", "sk-test")]).unwrap();
        assert_eq!(cfg.llm.backend, LlmBackend::OpenAi);
        assert_eq!(cfg.llm.model, DEFAULT_MODEL);
        assert_eq!(cfg.llm.api_key.expose_secret(), "sk-test");
        assert_eq!(cfg.llm.timeout, Duration::from_secs(120));
        assert_eq!(
            cfg.store,
            StoreConfig::LibSql {
                path: PathBuf::from(DEFAULT_DB_PATH)
            }
        );
        assert!(cfg.telegram.is_none());
        assert!(cfg.http.is_none());
        assert!(cfg.cli);
        assert_eq!(cfg.defaults.faith_mode, FaithMode::User);
    }

    #[test]
    fn api_key_follows_backend() {
        let err = config(&[("COACH_LLM_BACKEND", "anthropic"), ("OPENAI_API_KEY", "x")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref v) if v == "ANTHROPIC_API_KEY"));

        let cfg = config(&[
            ("COACH_LLM_BACKEND", "anthropic"),
            ("ANTHROPIC_API_KEY", "sk-ant"),
        ])
        .unwrap();
        assert_eq!(cfg.llm.backend, LlmBackend::Anthropic);
    }

    #[test]
    fn full_configuration() {
        let cfg = config(&[
            ("OPENAI_API_KEY", "sk"),
            ("COACH_STORE", "memory"),
            ("COACH_ADMIN_IDS", "1, 2,,3"),
            ("COACH_ADMIN_ROLE", "ops"),
            ("TELEGRAM_BOT_TOKEN", "tok"),
            ("TELEGRAM_ALLOWED_USERS", "alice,42"),
            ("COACH_HTTP_PORT", "8080"),
            ("COACH_HTTP_TOKEN", "s3cret"),
            ("COACH_FAITH_MODE", "off"),
            ("COACH_GLOBAL_TONE", "calm"),
            ("COACH_CLI", "off"),
        ])
        .unwrap();
        assert_eq!(cfg.store, StoreConfig::Memory);
        assert_eq!(cfg.admin_ids, vec!["1", "2", "3"]);
        assert!(cfg.admin_policy().is_admin("x", &["ops".into()]));
        assert_eq!(cfg.telegram.unwrap().allowed_users, vec!["alice", "42"]);
        let http = cfg.http.unwrap();
        assert_eq!(http.port, 8080);
        assert_eq!(http.token.expose_secret(), "s3cret");
        assert!(!cfg.cli);
        assert_eq!(cfg.defaults.faith_mode, FaithMode::Off);
        assert_eq!(cfg.defaults.global_tone.as_deref(), Some("calm"));
    }

    #[test]
    fn http_surface_requires_a_token() {
        let err = config(&[("OPENAI_API_KEY", "sk"), ("COACH_HTTP_PORT", "8080")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref v) if v == "COACH_HTTP_TOKEN"));
    }

    #[test]
    fn rejects_bad_values() {
        for (key, value) in [
            ("COACH_HTTP_PORT", "http"),
            ("COACH_LLM_TIMEOUT_SECS", "0"),
            ("COACH_STORE", "redis"),
            ("COACH_FAITH_MODE", "loud"),
            ("COACH_CLI", "maybe"),
        ] {
            let err = config(&[("OPENAI_API_KEY", "sk"), (key, value)]).unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidValue { key: ref k, .. } if k == key),
                "{key}"
            );
        }
    }
}
