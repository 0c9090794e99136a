use std::sync::Arc;

use crate::analysis::cache::{fingerprint, AnalysisCache};
use crate::analysis::normalizer::normalize;
use crate::analysis::synthetic;
use crate::analysis::types::AnalysisResult;
use crate::answer::{format_answers, render_prompt, AnswerSet, SurveyData};
use crate::config::LlmSettings;
use crate::error::AnalysisError;
use crate::prompt::selector::select_prompt;
use crate::prompt::store::PromptStore;
use crate::provider::client::{ChatProvider, HttpChatProvider};
use crate::provider::types::ProviderError;

/// Name surfaced in `promptUsed` when the synthetic generator served the
/// request.
const SYNTHETIC_PROVIDER: &str = "synthetic";

/// Last-resort prompt pair for surveys with no configuration at all.
const GENERIC_SYSTEM_PROMPT: &str =
    "你是一位CRS合规顾问。请基于用户的问卷回答给出简要的合规风险分析，并以JSON格式输出\
     overallRiskLevel、radarScores、detailedAnalysis、actionPlan和summaryAndSuggestions字段。";
const GENERIC_ANALYSIS_PROMPT: &str =
    "请分析以下问卷回答的CRS合规风险并以JSON格式输出结果：\n\n{USER_ANSWERS}";

/// The analysis orchestrator: cache lookup, prompt selection, provider
/// fallback chain and normalization. Constructed once at process start
/// and shared by reference; its two caches are the only mutable state.
pub struct AnalysisEngine {
    settings: LlmSettings,
    store: PromptStore,
    cache: AnalysisCache,
    provider: Arc<dyn ChatProvider>,
}

impl AnalysisEngine {
    pub fn new(settings: LlmSettings, store: PromptStore) -> Self {
        Self::with_provider(settings, store, Arc::new(HttpChatProvider::new()))
    }

    /// Builds an engine over a custom provider backend. Tests use this to
    /// script provider behavior without a network.
    pub fn with_provider(
        settings: LlmSettings,
        store: PromptStore,
        provider: Arc<dyn ChatProvider>,
    ) -> Self {
        Self {
            settings,
            store,
            cache: AnalysisCache::default(),
            provider,
        }
    }

    /// Analyzes one survey submission.
    ///
    /// # Arguments
    /// * `answers` - The submission (survey id plus question/value pairs)
    /// * `survey` - Survey definition, used to render readable answer text
    ///
    /// # Returns
    /// A fully normalized result. Fails only when every provider is down
    /// and synthetic fallback is disabled.
    pub async fn analyze(
        &self,
        answers: &AnswerSet,
        survey: &SurveyData,
    ) -> Result<AnalysisResult, AnalysisError> {
        let cache_key = fingerprint(answers);
        if let Some(cached) = self.cache.get(&cache_key) {
            log::debug!("缓存命中，跳过AI调用: {}", cache_key);
            return Ok(cached);
        }

        // Config load and answer formatting have no data dependency.
        let (config, formatted_answers) = tokio::join!(
            self.store.load(&answers.survey_id),
            async { format_answers(answers, survey) }
        );

        let (variant_id, system_prompt, analysis_template) = match &config {
            Some(config) => match select_prompt(config, answers) {
                Some(variant) => (
                    variant.id.clone(),
                    variant.system_prompt.clone(),
                    variant.analysis_prompt.clone(),
                ),
                None => {
                    log::warn!(
                        "Config for {} has no usable variant, using its fallback prompt",
                        answers.survey_id
                    );
                    (
                        "fallback".to_string(),
                        config.fallback_prompt.system_prompt.clone(),
                        config.fallback_prompt.analysis_prompt.clone(),
                    )
                }
            },
            None => {
                log::warn!(
                    "No prompt configuration for survey {}, using generic prompt",
                    answers.survey_id
                );
                (
                    "fallback".to_string(),
                    GENERIC_SYSTEM_PROMPT.to_string(),
                    GENERIC_ANALYSIS_PROMPT.to_string(),
                )
            }
        };

        let user_prompt = render_prompt(&analysis_template, &formatted_answers);

        let (content, provider_name) = self
            .call_with_fallback(&system_prompt, &user_prompt)
            .await?;

        let mut result = normalize(&content);
        result.prompt_used = format!("{} ({})", variant_id, provider_name);

        self.cache.put(cache_key, result.clone());
        Ok(result)
    }

    /// Tries providers in priority order: primary, then backup, then the
    /// synthetic generator. Linear, never concurrent: racing primary and
    /// backup would double-bill one logical request.
    ///
    /// # Returns
    /// The raw reply and the name of the provider that served it.
    async fn call_with_fallback(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<(String, String), AnalysisError> {
        let mut last_error: ProviderError;

        if self.settings.primary.is_configured() {
            match self
                .provider
                .call_single(&self.settings.primary, system_prompt, user_prompt)
                .await
            {
                Ok(content) => return Ok((content, self.settings.primary.name.clone())),
                Err(e) => {
                    log::warn!("主要服务 {} 调用失败: {}", self.settings.primary.name, e);
                    last_error = e;
                }
            }
        } else {
            last_error = ProviderError::NotConfigured {
                provider: self.settings.primary.name.clone(),
            };
            log::warn!("{}", last_error);
        }

        if self.settings.enable_fallback && self.settings.backup.is_configured() {
            match self
                .provider
                .call_single(&self.settings.backup, system_prompt, user_prompt)
                .await
            {
                Ok(content) => return Ok((content, self.settings.backup.name.clone())),
                Err(e) => {
                    log::warn!(
                        "备用服务 {} 也调用失败 (主要服务错误: {}): {}",
                        self.settings.backup.name,
                        last_error,
                        e
                    );
                    last_error = e;
                }
            }
        }

        if self.settings.enable_fallback {
            log::info!("所有服务均不可用，生成本地降级分析: {}", last_error);
            return Ok((synthetic::generate_response(), SYNTHETIC_PROVIDER.to_string()));
        }

        Err(AnalysisError::Exhausted {
            details: last_error.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answer::{Answer, AnswerValue, SurveyQuestion};
    use crate::config::ProviderConfig;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Scripted provider: responds per provider name, counting calls.
    struct ScriptedProvider {
        primary: Result<String, ()>,
        backup: Result<String, ()>,
        calls: AtomicUsize,
        primary_calls: AtomicUsize,
        backup_calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(primary: Result<String, ()>, backup: Result<String, ()>) -> Self {
            Self {
                primary,
                backup,
                calls: AtomicUsize::new(0),
                primary_calls: AtomicUsize::new(0),
                backup_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ChatProvider for ScriptedProvider {
        async fn call_single(
            &self,
            config: &ProviderConfig,
            _system_prompt: &str,
            _user_prompt: &str,
        ) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let script = if config.name == "Qwen3" {
                self.primary_calls.fetch_add(1, Ordering::SeqCst);
                &self.primary
            } else {
                self.backup_calls.fetch_add(1, Ordering::SeqCst);
                &self.backup
            };
            script.clone().map_err(|_| ProviderError::Timeout {
                provider: config.name.clone(),
                seconds: 60,
            })
        }
    }

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

    fn survey() -> SurveyData {
        SurveyData {
            id: "bank_crs_01".into(),
            title: "CRS合规自测".into(),
            questions: vec![
                SurveyQuestion {
                    id: "q1".into(),
                    title: "您持有哪些类型的金融账户？".into(),
                },
                SurveyQuestion {
                    id: "q2".into(),
                    title: "您是否持有离岸架构？".into(),
                },
            ],
        }
    }

    fn answers(q2_value: &str) -> AnswerSet {
        AnswerSet {
            survey_id: "bank_crs_01".into(),
            answers: vec![
                Answer {
                    question_id: "q1".into(),
                    value: AnswerValue::Multiple(vec!["personal_bank".into()]),
                },
                Answer {
                    question_id: "q2".into(),
                    value: AnswerValue::Single(q2_value.into()),
                },
            ],
        }
    }

    fn valid_reply(level: u8) -> String {
        serde_json::json!({
            "overallRiskLevel": level,
            "radarScores": {
                "金融账户穿透风险": 6,
                "实体分类与结构风险": 5,
                "税务居民身份协调": 4,
                "控权人UBO暴露风险": 5,
                "合规准备与后续行为": 3
            }
        })
        .to_string()
    }

    fn engine(
        provider: Arc<ScriptedProvider>,
        settings: LlmSettings,
    ) -> AnalysisEngine {
        let _ = crate::logger::setup_test_logger();
        AnalysisEngine::with_provider(settings, PromptStore::new(None), provider)
    }

    #[tokio::test]
    async fn primary_success_annotates_provider() {
        let provider = Arc::new(ScriptedProvider::new(Ok(valid_reply(40)), Err(())));
        let engine = engine(provider.clone(), settings("sk-a", "sk-b", true));

        let result = engine.analyze(&answers("domestic_only"), &survey()).await.unwrap();
        assert_eq!(result.overall_risk_level, 40);
        assert_eq!(result.prompt_used, "bank_crs_default (Qwen3)");
        assert_eq!(provider.backup_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn offshore_answers_select_conditional_variant() {
        let provider = Arc::new(ScriptedProvider::new(Ok(valid_reply(70)), Err(())));
        let engine = engine(provider, settings("sk-a", "sk-b", true));

        let result = engine.analyze(&answers("offshore_company"), &survey()).await.unwrap();
        assert_eq!(result.prompt_used, "bank_crs_offshore (Qwen3)");
    }

    #[tokio::test]
    async fn primary_timeout_falls_back_to_backup_once() {
        let provider = Arc::new(ScriptedProvider::new(Err(()), Ok(valid_reply(45))));
        let engine = engine(provider.clone(), settings("sk-a", "sk-b", true));

        let result = engine.analyze(&answers("domestic_only"), &survey()).await.unwrap();
        assert_eq!(result.overall_risk_level, 45);
        assert!(result.prompt_used.contains("DeepSeek"));
        assert_eq!(provider.primary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(provider.backup_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn both_providers_down_yields_synthetic_result() {
        let provider = Arc::new(ScriptedProvider::new(Err(()), Err(())));
        let engine = engine(provider.clone(), settings("sk-a", "sk-b", true));

        let result = engine.analyze(&answers("domestic_only"), &survey()).await.unwrap();
        assert!(result.prompt_used.contains("synthetic"));
        assert!((1..=99).contains(&result.overall_risk_level));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unconfigured_providers_go_synthetic_without_network() {
        let provider = Arc::new(ScriptedProvider::new(Ok(valid_reply(40)), Ok(valid_reply(40))));
        let engine = engine(provider.clone(), settings("", "", true));

        let result = engine.analyze(&answers("domestic_only"), &survey()).await.unwrap();
        assert!(result.prompt_used.contains("synthetic"));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fallback_disabled_propagates_exhaustion() {
        let provider = Arc::new(ScriptedProvider::new(Err(()), Ok(valid_reply(40))));
        let engine = engine(provider.clone(), settings("sk-a", "sk-b", false));

        let err = engine.analyze(&answers("domestic_only"), &survey()).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Exhausted { .. }));
        // backup is part of fallback and must not have been tried
        assert_eq!(provider.backup_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn identical_submissions_hit_the_cache() {
        let provider = Arc::new(ScriptedProvider::new(Ok(valid_reply(40)), Err(())));
        let engine = engine(provider.clone(), settings("sk-a", "sk-b", true));

        let first = engine.analyze(&answers("domestic_only"), &survey()).await.unwrap();

        // Same answers in a different order: same fingerprint, no new call.
        let mut reordered = answers("domestic_only");
        reordered.answers.reverse();
        let second = engine.analyze(&reordered, &survey()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_survey_uses_generic_prompt() {
        let provider = Arc::new(ScriptedProvider::new(Ok(valid_reply(40)), Err(())));
        let engine = engine(provider, settings("sk-a", "sk-b", true));

        let mut unknown = answers("domestic_only");
        unknown.survey_id = "no_such_survey".into();
        let result = engine.analyze(&unknown, &survey()).await.unwrap();
        assert_eq!(result.prompt_used, "fallback (Qwen3)");
    }
}
