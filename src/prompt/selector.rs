use crate::answer::AnswerSet;
use crate::prompt::types::{PromptConfig, PromptVariant};

/// Deterministically picks the applicable prompt variant for a submission.
///
/// Variants are evaluated in the config's definition order, skipping the
/// `"default"` key; the first variant whose condition matches wins. When
/// nothing matches the `"default"` variant is returned. `None` only for a
/// malformed config with no default variant either.
pub fn select_prompt<'a>(
    config: &'a PromptConfig,
    answers: &AnswerSet,
) -> Option<&'a PromptVariant> {
    for (key, variant) in &config.prompts {
        if key == "default" {
            continue;
        }
        if let Some(condition) = &variant.condition {
            if condition.matches(answers) {
                log::debug!("Selected prompt: {} ({})", variant.name, variant.id);
                return Some(variant);
            }
        }
    }

    log::debug!("Using default prompt");
    config.default_variant()
}
