pub mod client;
pub mod diagnostics;
pub mod types;

pub use client::{ChatProvider, HttpChatProvider};
pub use diagnostics::{DiagnosticsReport, ProviderReport, StageChecks};
pub use types::ProviderError;
