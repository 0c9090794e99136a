use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::analysis::text;
use crate::analysis::types::{
    comment_for_level, AnalysisResult, RADAR_DIMENSIONS, DEFAULT_RISK_LEVEL, MAX_ACTION_ITEMS,
    MAX_COMPLIANCE_GAPS, MAX_RECOMMENDATIONS, MAX_RISK_FACTORS,
};

lazy_static! {
    static ref THINK_RE: Regex = Regex::new(r"(?s)<think>.*?</think>").unwrap();
    /// Decorative emoji and symbol ranges some models sprinkle over output.
    static ref SYMBOL_RE: Regex = Regex::new(
        "[🔥⚡💾📡✅❌🚀🔍⚙️📋💡📊📈🎯\u{2600}-\u{26FF}\u{2700}-\u{27BF}]"
    )
    .unwrap();
    static ref BLANK_RE: Regex = Regex::new(r"\n{3,}").unwrap();
}

/// Converts arbitrary LLM output into a fully populated, schema-valid
/// `AnalysisResult`. Total: never fails, never returns a partial shape.
/// Malformed fields are replaced by their defaults rather than rejecting
/// the whole result.
pub fn normalize(raw: &str) -> AnalysisResult {
    let cleaned = clean_text(raw);

    let mut result = match extract_json(&cleaned) {
        Some(value) => from_value(&value),
        None => text::extract(&cleaned),
    };

    result.derive_legacy();
    result
}

/// Strips provider thinking markup and decorative symbols, and collapses
/// runs of blank lines.
pub fn clean_text(text: &str) -> String {
    let without_think = THINK_RE.replace_all(text, "");
    let without_symbols = SYMBOL_RE.replace_all(&without_think, "");
    BLANK_RE
        .replace_all(&without_symbols, "\n\n")
        .trim()
        .to_string()
}

/// Locates a JSON object inside free text: a balanced `{...}` span first,
/// then the cruder first-`{`-to-last-`}` slice as a retry.
fn extract_json(text: &str) -> Option<Value> {
    if let Some(span) = balanced_json_span(text) {
        if let Ok(value) = serde_json::from_str::<Value>(span) {
            if value.is_object() {
                return Some(value);
            }
        }
    }

    let first = text.find('{')?;
    let last = text.rfind('}')?;
    if last <= first {
        return None;
    }
    serde_json::from_str::<Value>(&text[first..=last])
        .ok()
        .filter(|v| v.is_object())
}

/// Returns the first balanced top-level `{...}` span, respecting string
/// literals and escapes.
fn balanced_json_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Validates and coerces a parsed JSON object into the result shape.
fn from_value(value: &Value) -> AnalysisResult {
    let mut result = AnalysisResult::default();

    result.overall_risk_level = value
        .get("overallRiskLevel")
        .and_then(|v| int_in_range(v, 1, 99))
        .unwrap_or(DEFAULT_RISK_LEVEL);

    result.risk_level_comment = non_empty_string(value.get("riskLevelComment"))
        .unwrap_or_else(|| comment_for_level(result.overall_risk_level).to_string());

    if let Some(radar) = value.get("radarScores") {
        for (index, dimension) in RADAR_DIMENSIONS.iter().enumerate() {
            if let Some(score) = radar.get(*dimension).and_then(|v| int_in_range(v, 1, 9)) {
                result.radar_scores.set_by_index(index, score);
            }
        }
    }

    let detailed = value.get("detailedAnalysis");
    result.detailed_analysis.risk_factors = string_list(
        detailed.and_then(|d| d.get("riskFactors")),
        MAX_RISK_FACTORS,
    );
    result.detailed_analysis.compliance_gaps = string_list(
        detailed.and_then(|d| d.get("complianceGaps")),
        MAX_COMPLIANCE_GAPS,
    );

    let mut recommendations = string_list(
        detailed.and_then(|d| d.get("recommendations")),
        MAX_RECOMMENDATIONS,
    );
    if recommendations.is_empty() {
        // 旧版扁平结构把建议放在顶层
        recommendations = string_list(value.get("suggestions"), MAX_RECOMMENDATIONS);
    }
    if !recommendations.is_empty() {
        result.detailed_analysis.recommendations = recommendations;
    }

    if let Some(per_dimension) = detailed.and_then(|d| d.get("riskDetailedAnalysis")) {
        for (index, dimension) in RADAR_DIMENSIONS.iter().enumerate() {
            if let Some(text) = non_empty_string(per_dimension.get(*dimension)) {
                result
                    .detailed_analysis
                    .risk_detailed_analysis
                    .set_by_index(index, text);
            }
        }
    }

    if let Some(plan) = value.get("actionPlan") {
        result.action_plan.immediate = string_list(plan.get("immediate"), MAX_ACTION_ITEMS);
        result.action_plan.short_term = string_list(plan.get("shortTerm"), MAX_ACTION_ITEMS);
        result.action_plan.long_term = string_list(plan.get("longTerm"), MAX_ACTION_ITEMS);
    }

    let summary_block = value.get("summaryAndSuggestions");
    if let Some(summary) = summary_block
        .and_then(|s| non_empty_string(s.get("evaluationSummary")))
        .or_else(|| non_empty_string(value.get("summary")))
    {
        result.summary_and_suggestions.evaluation_summary = summary;
    }
    result.summary_and_suggestions.optimization_suggestions = string_list(
        summary_block.and_then(|s| s.get("optimizationSuggestions")),
        MAX_RECOMMENDATIONS,
    );
    result.summary_and_suggestions.professional_advice =
        summary_block.and_then(|s| non_empty_string(s.get("professionalAdvice")));

    result
}

/// Accepts integers or floats, rejects anything outside `[min, max]`.
fn int_in_range(value: &Value, min: i64, max: i64) -> Option<u8> {
    let n = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64))?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    (min..=max).contains(&n).then_some(n as u8)
}

fn non_empty_string(value: Option<&Value>) -> Option<String> {
    let text = clean_text(value?.as_str()?);
    (!text.is_empty()).then_some(text)
}

/// Collects up to `cap` non-empty cleaned strings from a JSON array.
fn string_list(value: Option<&Value>, cap: usize) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| non_empty_string(Some(item)))
                .take(cap)
                .collect()
        })
        .unwrap_or_default()
}
