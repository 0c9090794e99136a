use std::env;
use std::time::Duration;

/// Connection settings for one chat-completion provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Human-readable provider name, surfaced in `promptUsed` annotations.
    pub name: String,
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
}

impl ProviderConfig {
    pub fn new(name: &str, endpoint: &str, api_key: &str, model: &str, timeout: Duration) -> Self {
        Self {
            name: name.to_string(),
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            timeout,
        }
    }

    /// A provider is usable only when endpoint, key and model are all present.
    pub fn is_configured(&self) -> bool {
        !self.endpoint.is_empty() && !self.api_key.is_empty() && !self.model.is_empty()
    }
}

/// Settings for the whole analysis layer: primary and backup providers
/// plus the toggle permitting backup/synthetic fallback.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub primary: ProviderConfig,
    pub backup: ProviderConfig,
    /// When false, neither the backup provider nor the synthetic generator
    /// is used; total provider failure then propagates to the caller.
    pub enable_fallback: bool,
    /// Retry budget read from the environment and surfaced in the
    /// diagnostics report. Not acted on: each provider call makes exactly
    /// one attempt, the fallback chain is the only retry mechanism.
    pub max_retries: u32,
}

impl LlmSettings {
    /// Reads settings from environment variables, falling back to the
    /// defaults the service shipped with.
    ///
    /// Variables: `LLM_API_ENDPOINT`, `LLM_API_KEY`, `LLM_MODEL`,
    /// `LLM_TIMEOUT` (ms), `LLM_MAX_RETRIES`, the `LLM_BACKUP_*`
    /// counterparts and `LLM_ENABLE_FALLBACK`.
    pub fn from_env() -> Self {
        let timeout = Duration::from_millis(env_u64("LLM_TIMEOUT", 60_000));

        let primary = ProviderConfig::new(
            &env_or("LLM_PROVIDER_NAME", "Qwen3"),
            &env_or("LLM_API_ENDPOINT", "https://api.suanli.cn/v1"),
            &env_or("LLM_API_KEY", ""),
            &env_or("LLM_MODEL", "free:Qwen3-30B-A3B"),
            timeout,
        );

        let backup = ProviderConfig::new(
            &env_or("LLM_BACKUP_PROVIDER_NAME", "DeepSeek"),
            &env_or("LLM_BACKUP_API_ENDPOINT", "https://api.deepseek.com/v1"),
            &env_or("LLM_BACKUP_API_KEY", ""),
            &env_or("LLM_BACKUP_MODEL", "deepseek-chat"),
            timeout,
        );

        Self {
            primary,
            backup,
            enable_fallback: env_or("LLM_ENABLE_FALLBACK", "true") != "false",
            max_retries: env_u64("LLM_MAX_RETRIES", 3) as u32,
        }
    }

    /// Reports configuration problems without failing.
    ///
    /// # Returns
    /// A list of human-readable issues; empty when the settings are complete.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.primary.endpoint.is_empty() {
            issues.push("主要LLM服务endpoint未配置".to_string());
        }
        if self.primary.api_key.is_empty() {
            issues.push("主要LLM服务API密钥未配置".to_string());
        }
        if self.primary.model.is_empty() {
            issues.push("主要LLM服务模型未配置".to_string());
        }

        if self.enable_fallback {
            if self.backup.endpoint.is_empty() {
                issues.push("备用LLM服务endpoint未配置".to_string());
            }
            if self.backup.api_key.is_empty() {
                issues.push("备用LLM服务API密钥未配置".to_string());
            }
            if self.backup.model.is_empty() {
                issues.push("备用LLM服务模型未配置".to_string());
            }
        }

        issues
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(primary_key: &str, backup_key: &str, enable_fallback: bool) -> LlmSettings {
        LlmSettings {
            primary: ProviderConfig::new(
                "Qwen3",
                "https://api.suanli.cn/v1",
                primary_key,
                "free:Qwen3-30B-A3B",
                Duration::from_secs(60),
            ),
            backup: ProviderConfig::new(
                "DeepSeek",
                "https://api.deepseek.com/v1",
                backup_key,
                "deepseek-chat",
                Duration::from_secs(60),
            ),
            enable_fallback,
            max_retries: 3,
        }
    }

    #[test]
    fn validate_reports_missing_keys() {
        let issues = settings("", "", true).validate();
        assert!(issues.iter().any(|i| i.contains("主要LLM服务API密钥")));
        assert!(issues.iter().any(|i| i.contains("备用LLM服务API密钥")));
    }

    #[test]
    fn validate_skips_backup_when_fallback_disabled() {
        let issues = settings("sk-test", "", false).validate();
        assert!(issues.is_empty());
    }

    #[test]
    fn configured_requires_all_fields() {
        let s = settings("sk-test", "", true);
        assert!(s.primary.is_configured());
        assert!(!s.backup.is_configured());
    }
}
