use serde::{Deserialize, Serialize};

/// The five radar dimensions, in their fixed reporting order.
pub const RADAR_DIMENSIONS: [&str; 5] = [
    "金融账户穿透风险",
    "实体分类与结构风险",
    "税务居民身份协调",
    "控权人UBO暴露风险",
    "合规准备与后续行为",
];

pub const DEFAULT_RISK_LEVEL: u8 = 50;
pub const DEFAULT_RADAR_SCORE: u8 = 5;

/// Generic per-dimension prose used when the model returned none.
pub const DIMENSION_PLACEHOLDER: &str = "该维度暂无详细分析，建议咨询专业顾问获取进一步解读。";

pub const MAX_RISK_FACTORS: usize = 5;
pub const MAX_COMPLIANCE_GAPS: usize = 5;
pub const MAX_RECOMMENDATIONS: usize = 8;
pub const MAX_ACTION_ITEMS: usize = 3;
pub const MAX_LEGACY_SUGGESTIONS: usize = 5;

/// Five-dimension structured scores, 1-9 each.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadarScores {
    #[serde(rename = "金融账户穿透风险")]
    pub account_penetration: u8,
    #[serde(rename = "实体分类与结构风险")]
    pub entity_structure: u8,
    #[serde(rename = "税务居民身份协调")]
    pub tax_residency: u8,
    #[serde(rename = "控权人UBO暴露风险")]
    pub ubo_exposure: u8,
    #[serde(rename = "合规准备与后续行为")]
    pub compliance_readiness: u8,
}

impl Default for RadarScores {
    fn default() -> Self {
        Self {
            account_penetration: DEFAULT_RADAR_SCORE,
            entity_structure: DEFAULT_RADAR_SCORE,
            tax_residency: DEFAULT_RADAR_SCORE,
            ubo_exposure: DEFAULT_RADAR_SCORE,
            compliance_readiness: DEFAULT_RADAR_SCORE,
        }
    }
}

impl RadarScores {
    /// Scores in `RADAR_DIMENSIONS` order.
    pub fn as_array(&self) -> [u8; 5] {
        [
            self.account_penetration,
            self.entity_structure,
            self.tax_residency,
            self.ubo_exposure,
            self.compliance_readiness,
        ]
    }

    pub fn set_by_index(&mut self, index: usize, score: u8) {
        match index {
            0 => self.account_penetration = score,
            1 => self.entity_structure = score,
            2 => self.tax_residency = score,
            3 => self.ubo_exposure = score,
            4 => self.compliance_readiness = score,
            _ => {}
        }
    }

    /// Projects the 1-9 radar scores onto the legacy 1-5 dimensions.
    pub fn to_legacy(&self) -> RiskScores {
        RiskScores {
            financial_account: scale_to_legacy(self.account_penetration),
            controlling_person: scale_to_legacy(self.ubo_exposure),
            structure: scale_to_legacy(self.entity_structure),
            compliance: scale_to_legacy(self.compliance_readiness),
            tax: scale_to_legacy(self.tax_residency),
        }
    }
}

fn scale_to_legacy(radar: u8) -> u8 {
    ((radar as f64 * 5.0 / 9.0).round() as u8).clamp(1, 5)
}

/// Legacy five-dimension 1-5 scores still consumed by older report pages.
/// Always derived from `RadarScores`, never parsed from raw output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskScores {
    #[serde(rename = "金融账户")]
    pub financial_account: u8,
    #[serde(rename = "控制人")]
    pub controlling_person: u8,
    #[serde(rename = "结构")]
    pub structure: u8,
    #[serde(rename = "合规")]
    pub compliance: u8,
    #[serde(rename = "税务")]
    pub tax: u8,
}

impl Default for RiskScores {
    fn default() -> Self {
        RadarScores::default().to_legacy()
    }
}

/// One prose explanation per radar dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskDetailedAnalysis {
    #[serde(rename = "金融账户穿透风险")]
    pub account_penetration: String,
    #[serde(rename = "实体分类与结构风险")]
    pub entity_structure: String,
    #[serde(rename = "税务居民身份协调")]
    pub tax_residency: String,
    #[serde(rename = "控权人UBO暴露风险")]
    pub ubo_exposure: String,
    #[serde(rename = "合规准备与后续行为")]
    pub compliance_readiness: String,
}

impl Default for RiskDetailedAnalysis {
    fn default() -> Self {
        Self {
            account_penetration: DIMENSION_PLACEHOLDER.to_string(),
            entity_structure: DIMENSION_PLACEHOLDER.to_string(),
            tax_residency: DIMENSION_PLACEHOLDER.to_string(),
            ubo_exposure: DIMENSION_PLACEHOLDER.to_string(),
            compliance_readiness: DIMENSION_PLACEHOLDER.to_string(),
        }
    }
}

impl RiskDetailedAnalysis {
    pub fn set_by_index(&mut self, index: usize, text: String) {
        match index {
            0 => self.account_penetration = text,
            1 => self.entity_structure = text,
            2 => self.tax_residency = text,
            3 => self.ubo_exposure = text,
            4 => self.compliance_readiness = text,
            _ => {}
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedAnalysis {
    pub risk_factors: Vec<String>,
    pub compliance_gaps: Vec<String>,
    pub recommendations: Vec<String>,
    pub risk_detailed_analysis: RiskDetailedAnalysis,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionPlan {
    pub immediate: Vec<String>,
    pub short_term: Vec<String>,
    pub long_term: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryAndSuggestions {
    pub evaluation_summary: String,
    pub optimization_suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub professional_advice: Option<String>,
}

/// Fully normalized analysis output. Every field is always populated;
/// downstream consumers never need to null-check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Overall risk, 1-99.
    pub overall_risk_level: u8,
    pub risk_level_comment: String,
    pub radar_scores: RadarScores,
    pub detailed_analysis: DetailedAnalysis,
    pub action_plan: ActionPlan,
    pub summary_and_suggestions: SummaryAndSuggestions,
    /// Selected variant id annotated with the serving provider, or
    /// `fallback (<error summary>)` when nothing could be called.
    pub prompt_used: String,

    // 兼容旧版报告页面的派生字段
    pub risk_scores: RiskScores,
    pub suggestions: Vec<String>,
    pub summary: String,
}

/// Maps an overall risk level onto its fixed comment band.
pub fn comment_for_level(level: u8) -> &'static str {
    match level {
        0..=19 => "您的CRS合规风险较低，当前的账户与申报安排整体稳健。",
        20..=39 => "您的CRS合规风险总体可控，存在少量需要关注的事项。",
        40..=59 => "您的CRS合规风险处于中等水平，建议有针对性地完善合规安排。",
        60..=79 => "您的CRS合规风险偏高，建议尽快梳理账户与架构并咨询专业顾问。",
        _ => "您的CRS合规风险较高，建议立即开展全面的合规审查。",
    }
}

impl Default for AnalysisResult {
    fn default() -> Self {
        let mut result = Self {
            overall_risk_level: DEFAULT_RISK_LEVEL,
            risk_level_comment: comment_for_level(DEFAULT_RISK_LEVEL).to_string(),
            radar_scores: RadarScores::default(),
            detailed_analysis: DetailedAnalysis {
                recommendations: vec!["请咨询专业的CRS合规顾问获取个性化建议。".to_string()],
                ..DetailedAnalysis::default()
            },
            action_plan: ActionPlan::default(),
            summary_and_suggestions: SummaryAndSuggestions {
                evaluation_summary: "基于您的回答，我们为您生成了CRS合规风险分析报告。"
                    .to_string(),
                ..SummaryAndSuggestions::default()
            },
            prompt_used: "default".to_string(),
            risk_scores: RiskScores::default(),
            suggestions: Vec::new(),
            summary: String::new(),
        };
        result.derive_legacy();
        result
    }
}

impl AnalysisResult {
    /// Recomputes the legacy compatibility fields from the normalized
    /// structure. Must be called after any mutation of the new shape.
    pub fn derive_legacy(&mut self) {
        self.risk_scores = self.radar_scores.to_legacy();
        self.suggestions = self
            .detailed_analysis
            .recommendations
            .iter()
            .take(MAX_LEGACY_SUGGESTIONS)
            .cloned()
            .collect();
        self.summary = format!(
            "风险等级：{}分 - {}",
            self.overall_risk_level, self.risk_level_comment
        );
    }

    /// Static last-resort result for callers facing total exhaustion,
    /// clearly labeled as a lower-confidence report.
    pub fn offline_default(reason: &str) -> Self {
        let mut result = Self::default();
        result.detailed_analysis.recommendations = vec![
            "建议咨询专业的CRS合规顾问获取个性化建议".to_string(),
            "定期关注CRS相关法规的更新和变化".to_string(),
            "建立完善的合规管理体系和内控制度".to_string(),
            "保持良好的文档记录和申报习惯".to_string(),
        ];
        result.summary_and_suggestions.evaluation_summary =
            "由于技术原因，无法生成详细分析。建议咨询专业顾问获取个性化建议。".to_string();
        result.prompt_used = format!("fallback ({})", reason);
        result.derive_legacy();
        result
    }
}
