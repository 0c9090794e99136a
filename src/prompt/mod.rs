pub mod selector;
pub mod store;
pub mod types;

pub use selector::select_prompt;
pub use store::PromptStore;
pub use types::{FallbackPrompt, PromptConfig, PromptVariant, VariantCondition};
