use lazy_static::lazy_static;
use regex::Regex;

use crate::analysis::types::{
    comment_for_level, AnalysisResult, MAX_LEGACY_SUGGESTIONS,
};

lazy_static! {
    /// Bare numbers, optionally suffixed with 分, e.g. "金融账户 7分".
    static ref SCORE_RE: Regex = Regex::new(r"(\d+)分?").unwrap();
}

const SUGGESTION_KEYWORDS: [&str; 3] = ["建议", "推荐", "应该"];
const SUMMARY_KEYWORDS: [&str; 3] = ["总结", "综合", "整体"];

/// Best-effort extraction from prose output: the secondary strategy used
/// when no JSON could be recovered. Shares the normalizer's contract of
/// always producing a fully populated result.
pub fn extract(text: &str) -> AnalysisResult {
    let mut result = AnalysisResult::default();

    apply_scores(text, &mut result);

    let suggestions = extract_suggestions(text);
    if !suggestions.is_empty() {
        result.detailed_analysis.recommendations = suggestions;
    }

    result.summary_and_suggestions.evaluation_summary = extract_summary(text);
    result.risk_level_comment = comment_for_level(result.overall_risk_level).to_string();

    result.derive_legacy();
    result
}

/// Assigns the first five plausible scores to the radar dimensions in
/// their fixed order. Fewer than five numbers means the text is too vague
/// to trust, so defaults stay.
fn apply_scores(text: &str, result: &mut AnalysisResult) {
    let scores: Vec<u8> = SCORE_RE
        .captures_iter(text)
        .filter_map(|c| c[1].parse::<u8>().ok())
        .collect();

    if scores.len() >= 5 {
        for (index, score) in scores.iter().take(5).enumerate() {
            if (1..=9).contains(score) {
                result.radar_scores.set_by_index(index, *score);
            }
        }
    }
}

/// Pulls suggestion-like sentences out of paragraphs mentioning
/// 建议/推荐/应该.
fn extract_suggestions(text: &str) -> Vec<String> {
    let mut suggestions = Vec::new();

    for paragraph in text.split("\n\n") {
        for line in paragraph.lines() {
            let trimmed = line.trim().trim_start_matches(|c: char| {
                c.is_ascii_digit() || c == '.' || c == '、' || c == ' '
            });
            if trimmed.is_empty() {
                continue;
            }
            if SUGGESTION_KEYWORDS.iter().any(|k| trimmed.contains(k)) {
                suggestions.push(trimmed.to_string());
                if suggestions.len() >= MAX_LEGACY_SUGGESTIONS {
                    return suggestions;
                }
            }
        }
    }

    suggestions
}

/// Finds a 总结/综合/整体 section; otherwise falls back to the leading
/// 200 characters.
fn extract_summary(text: &str) -> String {
    for keyword in SUMMARY_KEYWORDS {
        if let Some(pos) = text.find(keyword) {
            let section = &text[pos..];
            let end = section.find("\n\n").unwrap_or(section.len());
            let summary = section[..end].trim();
            if !summary.is_empty() {
                return summary.to_string();
            }
        }
    }

    let lead: String = text.chars().take(200).collect();
    format!("{}...", lead.trim())
}
