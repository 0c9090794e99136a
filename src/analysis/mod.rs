pub mod cache;
pub mod engine;
pub mod normalizer;
pub mod synthetic;
pub mod text;
pub mod types;

pub use cache::AnalysisCache;
pub use engine::AnalysisEngine;
pub use normalizer::normalize;
pub use types::AnalysisResult;
