use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;

use crate::prompt::types::PromptConfig;

/// Analysis config bundled with the crate so the default survey works
/// without any external files.
const BUILTIN_BANK_CRS: &str = include_str!("../../data/ana_bank_crs.json");

/// Maps a survey id to its analysis config resource name.
fn config_resource(survey_id: &str) -> Option<&'static str> {
    match survey_id {
        "bank_crs_01" => Some("ana_bank_crs.json"),
        "ai_survey" => Some("ana_ai_survey.json"),
        _ => None,
    }
}

fn builtin_config(resource: &str) -> Option<&'static str> {
    match resource {
        "ana_bank_crs.json" => Some(BUILTIN_BANK_CRS),
        _ => None,
    }
}

/// Loads and caches per-survey prompt configurations.
///
/// Successful loads are cached for the process lifetime; a missing
/// mapping, missing file or parse failure yields `None` with a warning,
/// never an error — callers always have a terminal fallback.
pub struct PromptStore {
    /// Directory holding analysis config files; `None` means builtin only.
    config_dir: Option<PathBuf>,
    cache: DashMap<String, Arc<PromptConfig>>,
}

impl PromptStore {
    pub fn new(config_dir: Option<PathBuf>) -> Self {
        Self {
            config_dir,
            cache: DashMap::new(),
        }
    }

    /// Resolves a survey id to its prompt configuration.
    ///
    /// # Arguments
    /// * `survey_id` - The survey whose analysis config is wanted
    ///
    /// # Returns
    /// The cached or freshly loaded config, or `None` when no usable
    /// configuration exists for this survey.
    pub async fn load(&self, survey_id: &str) -> Option<Arc<PromptConfig>> {
        if let Some(config) = self.cache.get(survey_id) {
            return Some(config.clone());
        }

        let Some(resource) = config_resource(survey_id) else {
            log::warn!("No config file mapping found for survey: {}", survey_id);
            return None;
        };

        let content = match self.read_resource(resource).await {
            Some(content) => content,
            None => {
                log::warn!("Prompt config not found for survey: {}", survey_id);
                return None;
            }
        };

        match serde_json::from_str::<PromptConfig>(&content) {
            Ok(config) => {
                config.check();
                let config = Arc::new(config);
                self.cache.insert(survey_id.to_string(), config.clone());
                Some(config)
            }
            Err(e) => {
                log::warn!("Error parsing prompt config for {}: {}", survey_id, e);
                None
            }
        }
    }

    /// Reads a config resource from the configured directory, falling
    /// back to the compiled-in copy where one exists.
    async fn read_resource(&self, resource: &str) -> Option<String> {
        if let Some(dir) = &self.config_dir {
            let path = dir.join(resource);
            match tokio::fs::read_to_string(&path).await {
                Ok(content) => return Some(content),
                Err(e) => {
                    log::warn!("Failed to read prompt config {:?}: {}", path, e);
                }
            }
        }

        builtin_config(resource).map(str::to_string)
    }
}
