use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::analysis::types::AnalysisResult;
use crate::answer::AnswerSet;

/// Results are kept for five minutes: long enough to absorb a burst of
/// identical resubmissions, short enough that nothing stale survives.
pub const CACHE_DURATION: Duration = Duration::from_secs(5 * 60);

struct CacheEntry {
    result: AnalysisResult,
    stored_at: Instant,
}

/// Process-local memoization of completed analyses, keyed by submission
/// fingerprint. Exists only to avoid duplicate paid LLM calls, not for
/// correctness: entries are derivable, so last-writer-wins races are fine.
pub struct AnalysisCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl Default for AnalysisCache {
    fn default() -> Self {
        Self::new(CACHE_DURATION)
    }
}

impl AnalysisCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn get(&self, key: &str) -> Option<AnalysisResult> {
        let entry = self.entries.get(key)?;
        if entry.stored_at.elapsed() < self.ttl {
            log::debug!("使用缓存结果: {}", key);
            Some(entry.result.clone())
        } else {
            None
        }
    }

    /// Stores a result and opportunistically sweeps expired entries.
    /// There is no background timer; writes are the only sweep trigger.
    pub fn put(&self, key: String, result: AnalysisResult) {
        self.entries.insert(
            key,
            CacheEntry {
                result,
                stored_at: Instant::now(),
            },
        );
        let ttl = self.ttl;
        self.entries
            .retain(|_, entry| entry.stored_at.elapsed() < ttl);
    }
}

/// Builds a stable cache key for a submission: the survey id plus a
/// 16-hex-char hash over the answers sorted by question id. The digest
/// covers the whole encoding, so any changed answer changes the key;
/// input order never affects cache identity.
pub fn fingerprint(answers: &AnswerSet) -> String {
    let mut sorted = answers.answers.clone();
    sorted.sort_by(|a, b| a.question_id.cmp(&b.question_id));

    // Field order of `Answer` is fixed, so this encoding is stable.
    let encoded = serde_json::to_string(&sorted).unwrap_or_default();
    let digest = seahash::hash(encoded.as_bytes());
    format!("{}_{:016x}", answers.survey_id, digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answer::{Answer, AnswerValue};

    fn answer(question_id: &str, value: &str) -> Answer {
        Answer {
            question_id: question_id.into(),
            value: AnswerValue::Single(value.into()),
        }
    }

    #[test]
    fn fingerprint_ignores_answer_order() {
        let a = AnswerSet {
            survey_id: "bank_crs_01".into(),
            answers: vec![answer("q1", "x"), answer("q2", "y")],
        };
        let b = AnswerSet {
            survey_id: "bank_crs_01".into(),
            answers: vec![answer("q2", "y"), answer("q1", "x")],
        };
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn fingerprint_is_scoped_by_survey_and_content() {
        let a = AnswerSet {
            survey_id: "bank_crs_01".into(),
            answers: vec![answer("q1", "x")],
        };
        let mut b = a.clone();
        b.survey_id = "ai_survey".into();
        let mut c = a.clone();
        c.answers[0].value = AnswerValue::Single("z".into());

        assert_ne!(fingerprint(&a), fingerprint(&b));
        assert_ne!(fingerprint(&a), fingerprint(&c));
    }

    #[test]
    fn fingerprint_covers_the_whole_submission() {
        // Serialized answer lists share a long constant prefix; keys must
        // still differ when only one value deep in the list differs.
        let base = AnswerSet {
            survey_id: "bank_crs_01".into(),
            answers: vec![
                answer("q1", "personal_bank"),
                answer("q2", "domestic_only"),
                answer("q3", "single_residency"),
            ],
        };
        let mut changed = base.clone();
        changed.answers[2].value = AnswerValue::Single("dual_residency".into());

        assert_ne!(fingerprint(&base), fingerprint(&changed));
    }

    #[test]
    fn entries_expire_after_ttl() {
        let cache = AnalysisCache::new(Duration::from_millis(0));
        cache.put("k".into(), AnalysisResult::default());
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn writes_sweep_expired_entries() {
        let cache = AnalysisCache::new(Duration::from_millis(0));
        cache.put("old".into(), AnalysisResult::default());
        cache.put("new".into(), AnalysisResult::default());
        // "old" was expired at the time of the second write
        assert!(!cache.entries.contains_key("old"));
    }

    #[test]
    fn fresh_entries_are_returned() {
        let cache = AnalysisCache::default();
        cache.put("k".into(), AnalysisResult::default());
        assert!(cache.get("k").is_some());
    }
}
