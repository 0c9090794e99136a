use std::time::Instant;

use serde::Serialize;

use crate::config::{LlmSettings, ProviderConfig};
use crate::provider::client::ChatProvider;
use crate::provider::types::ProviderError;

const TEST_SYSTEM_PROMPT: &str = "你是一个测试助手，请严格按照用户要求回复。";
const TEST_MESSAGE: &str = "请回复'测试成功'四个字，不要添加任何其他内容。";

/// Which stages of a provider call completed during a diagnostic run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageChecks {
    pub config_check: bool,
    pub network_check: bool,
    pub auth_check: bool,
    pub response_check: bool,
}

/// Outcome of probing one provider.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderReport {
    pub provider: String,
    pub endpoint: String,
    pub model: String,
    pub success: bool,
    pub response_time_ms: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub details: StageChecks,
}

/// Combined connectivity report for the configured provider chain.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsReport {
    pub primary: ProviderReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<ProviderReport>,
    pub total_tested: usize,
    pub success_count: usize,
    pub failure_count: usize,
    /// Name of the first working provider, if any.
    pub recommended_provider: Option<String>,
    pub configured_retries: u32,
}

/// Probes one provider with a canned round-trip message and reports which
/// stage failed. Operators use this to tell configuration mistakes apart
/// from network or credential problems.
pub async fn test_provider(
    provider: &dyn ChatProvider,
    config: &ProviderConfig,
) -> ProviderReport {
    let start = Instant::now();
    let mut report = ProviderReport {
        provider: config.name.clone(),
        endpoint: config.endpoint.clone(),
        model: config.model.clone(),
        success: false,
        response_time_ms: 0,
        error: None,
        details: StageChecks::default(),
    };

    if !config.is_configured() {
        report.error = Some("配置不完整：缺少endpoint、apiKey或model".to_string());
        report.response_time_ms = start.elapsed().as_millis();
        return report;
    }
    report.details.config_check = true;

    log::debug!("[{}] 测试网络连接...", config.name);
    match provider
        .call_single(config, TEST_SYSTEM_PROMPT, TEST_MESSAGE)
        .await
    {
        Ok(content) => {
            report.details.network_check = true;
            report.details.auth_check = true;
            report.details.response_check = true;
            report.success = true;
            log::debug!("[{}] 响应内容: \"{}\"", config.name, content);
        }
        Err(e) => {
            match &e {
                ProviderError::NotConfigured { .. } => {}
                ProviderError::Timeout { .. } | ProviderError::Request { .. } => {}
                ProviderError::Auth { .. } => {
                    report.details.network_check = true;
                }
                ProviderError::Http { .. } => {
                    report.details.network_check = true;
                }
                ProviderError::Shape { .. } => {
                    report.details.network_check = true;
                    report.details.auth_check = true;
                }
            }
            report.error = Some(e.to_string());
        }
    }

    report.response_time_ms = start.elapsed().as_millis();
    report
}

/// Probes the whole provider chain, backup included when fallback is
/// enabled, and recommends the first working provider.
pub async fn test_all_providers(
    provider: &dyn ChatProvider,
    settings: &LlmSettings,
) -> DiagnosticsReport {
    log::info!("开始LLM API全面测试...");
    let primary = test_provider(provider, &settings.primary).await;

    let backup = if settings.enable_fallback {
        Some(test_provider(provider, &settings.backup).await)
    } else {
        None
    };

    let mut success_count = 0;
    let mut recommended = None;
    if primary.success {
        success_count += 1;
        recommended = Some(primary.provider.clone());
    }
    if let Some(b) = &backup {
        if b.success {
            success_count += 1;
            if recommended.is_none() {
                recommended = Some(b.provider.clone());
            }
        }
    }

    let total_tested = 1 + backup.is_some() as usize;
    let report = DiagnosticsReport {
        primary,
        backup,
        total_tested,
        success_count,
        failure_count: total_tested - success_count,
        recommended_provider: recommended,
        configured_retries: settings.max_retries,
    };
    log::info!(
        "测试总结: {}/{} 可用, 推荐: {:?}",
        report.success_count,
        report.total_tested,
        report.recommended_provider
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;

    struct ScriptedProvider {
        fail_with: Option<fn(&str) -> ProviderError>,
    }

    #[async_trait]
    impl ChatProvider for ScriptedProvider {
        async fn call_single(
            &self,
            config: &ProviderConfig,
            _system_prompt: &str,
            _user_prompt: &str,
        ) -> Result<String, ProviderError> {
            match self.fail_with {
                Some(make) => Err(make(&config.name)),
                None => Ok("测试成功".to_string()),
            }
        }
    }

    fn settings() -> LlmSettings {
        LlmSettings {
            primary: ProviderConfig::new(
                "Qwen3",
                "https://api.suanli.cn/v1",
                "sk-a",
                "free:Qwen3-30B-A3B",
                Duration::from_secs(5),
            ),
            backup: ProviderConfig::new(
                "DeepSeek",
                "https://api.deepseek.com/v1",
                "sk-b",
                "deepseek-chat",
                Duration::from_secs(5),
            ),
            enable_fallback: true,
            max_retries: 3,
        }
    }

    #[tokio::test]
    async fn healthy_chain_recommends_primary() {
        let provider = ScriptedProvider { fail_with: None };
        let report = test_all_providers(&provider, &settings()).await;
        assert_eq!(report.success_count, 2);
        assert_eq!(report.recommended_provider.as_deref(), Some("Qwen3"));
    }

    #[tokio::test]
    async fn auth_failure_marks_network_reached() {
        let provider = ScriptedProvider {
            fail_with: Some(|name| ProviderError::Auth {
                provider: name.to_string(),
                status: 401,
            }),
        };
        let report = test_provider(&provider, &settings().primary).await;
        assert!(!report.success);
        assert!(report.details.config_check);
        assert!(report.details.network_check);
        assert!(!report.details.auth_check);
    }

    #[tokio::test]
    async fn unconfigured_provider_fails_config_stage() {
        let provider = ScriptedProvider { fail_with: None };
        let config = ProviderConfig::new("Qwen3", "", "", "", Duration::from_secs(5));
        let report = test_provider(&provider, &config).await;
        assert!(!report.success);
        assert!(!report.details.config_check);
    }
}
