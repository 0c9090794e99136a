use rust_i18n::t;
use thiserror::Error;

use crate::provider::ProviderError;

/// The unified error type of the analysis layer.
///
/// By contract the engine almost always succeeds with some structurally
/// valid result; `Exhausted` is the single failure that reaches callers,
/// and only when synthetic fallback is disabled.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Every provider failed and synthetic generation is not permitted.
    #[error("{}", t!("analysis.error.exhausted", details = .details))]
    Exhausted { details: String },
}
