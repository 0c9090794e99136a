pub mod analysis;
pub mod answer;
pub mod config;
pub mod error;
pub mod logger;
pub mod prompt;
pub mod provider;

rust_i18n::i18n!("i18n", fallback = "en");

pub use analysis::engine::AnalysisEngine;
pub use analysis::types::AnalysisResult;
pub use answer::{Answer, AnswerSet, AnswerValue, SurveyData, SurveyQuestion};
pub use config::{LlmSettings, ProviderConfig};
pub use error::AnalysisError;
pub use prompt::store::PromptStore;
