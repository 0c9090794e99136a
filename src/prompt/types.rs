use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::answer::AnswerSet;

/// Condition gating a conditional prompt variant.
///
/// Each kind carries its own typed payload so adding a new kind is an
/// exhaustive-match change rather than a string comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VariantCondition {
    /// True when the answer for `question_id` intersects `values`.
    #[serde(rename_all = "camelCase")]
    AnswerContains {
        question_id: String,
        values: Vec<String>,
    },
}

impl VariantCondition {
    /// Evaluates the condition against a submission. An absent answer
    /// never matches.
    pub fn matches(&self, answers: &AnswerSet) -> bool {
        match self {
            VariantCondition::AnswerContains {
                question_id,
                values,
            } => answers
                .answer_for(question_id)
                .map(|a| a.value.contains_any(values))
                .unwrap_or(false),
        }
    }
}

/// One named prompt configuration selectable for a survey.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptVariant {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub system_prompt: String,
    /// Template with a single `{USER_ANSWERS}` substitution placeholder.
    pub analysis_prompt: String,
    #[serde(default)]
    pub condition: Option<VariantCondition>,
    /// Documentation of the expected output shape; never enforced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_format: Option<Value>,
}

/// Prompt pair used when no variant is applicable at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackPrompt {
    pub system_prompt: String,
    pub analysis_prompt: String,
}

/// Per-survey prompt configuration.
///
/// `prompts` preserves definition order (IndexMap): selection is
/// first-match-wins, so iteration order must be stable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptConfig {
    pub survey_id: String,
    pub title: String,
    pub version: String,
    pub prompts: IndexMap<String, PromptVariant>,
    pub fallback_prompt: FallbackPrompt,
}

impl PromptConfig {
    pub fn default_variant(&self) -> Option<&PromptVariant> {
        self.prompts.get("default")
    }

    /// Checks the config invariants, logging a warning per violation.
    /// A malformed config is still usable; the selector just falls
    /// through to the fallback prompt.
    pub fn check(&self) {
        match self.prompts.get("default") {
            None => log::warn!(
                "Prompt config {} has no \"default\" variant",
                self.survey_id
            ),
            Some(v) if v.condition.is_some() => log::warn!(
                "Default variant of {} carries a condition; it is ignored",
                self.survey_id
            ),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_deserializes_from_tagged_json() {
        let condition: VariantCondition = serde_json::from_str(
            r#"{"type":"answer_contains","questionId":"q2","values":["offshore_company"]}"#,
        )
        .unwrap();
        assert_eq!(
            condition,
            VariantCondition::AnswerContains {
                question_id: "q2".into(),
                values: vec!["offshore_company".into()],
            }
        );
    }

    #[test]
    fn prompts_keep_definition_order() {
        let config: PromptConfig = serde_json::from_str(
            r#"{
                "surveyId": "s1",
                "title": "t",
                "version": "1.0",
                "prompts": {
                    "default": {"id": "v0", "name": "默认", "systemPrompt": "s", "analysisPrompt": "{USER_ANSWERS}"},
                    "b": {"id": "v1", "name": "b", "systemPrompt": "s", "analysisPrompt": "{USER_ANSWERS}"},
                    "a": {"id": "v2", "name": "a", "systemPrompt": "s", "analysisPrompt": "{USER_ANSWERS}"}
                },
                "fallbackPrompt": {"systemPrompt": "s", "analysisPrompt": "{USER_ANSWERS}"}
            }"#,
        )
        .unwrap();

        let keys: Vec<&str> = config.prompts.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["default", "b", "a"]);
    }
}
