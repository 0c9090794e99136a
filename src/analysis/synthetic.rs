use rand::Rng;
use serde_json::json;

/// Fabricates a structurally valid chat-completion reply when every real
/// provider is unavailable. The shape matches what the prompts ask a real
/// model for, so the normalizer handles synthetic and real output the
/// same way. Values are random but bounded to the mid-risk range; the
/// wording marks the report as generic.
pub fn generate_response() -> String {
    let mut rng = rand::thread_rng();

    let overall: u8 = rng.gen_range(35..=65);
    let radar = |rng: &mut rand::rngs::ThreadRng| rng.gen_range(3..=7u8);

    json!({
        "overallRiskLevel": overall,
        "riskLevelComment": "本报告由系统根据通用规则生成，建议结合专业意见使用。",
        "radarScores": {
            "金融账户穿透风险": radar(&mut rng),
            "实体分类与结构风险": radar(&mut rng),
            "税务居民身份协调": radar(&mut rng),
            "控权人UBO暴露风险": radar(&mut rng),
            "合规准备与后续行为": radar(&mut rng)
        },
        "detailedAnalysis": {
            "riskFactors": [
                "跨境金融账户可能落入CRS申报范围",
                "税务居民身份的认定需要进一步核实"
            ],
            "complianceGaps": [
                "缺少完整的账户与架构清单",
                "未建立定期的合规复核机制"
            ],
            "recommendations": [
                "建议咨询专业的CRS合规顾问获取个性化建议",
                "定期关注CRS相关法规的更新和变化",
                "建立完善的合规管理体系和内控制度",
                "保持良好的文档记录和申报习惯"
            ],
            "riskDetailedAnalysis": {
                "金融账户穿透风险": "未能连接分析服务，该维度按通用规则估算。",
                "实体分类与结构风险": "未能连接分析服务，该维度按通用规则估算。",
                "税务居民身份协调": "未能连接分析服务，该维度按通用规则估算。",
                "控权人UBO暴露风险": "未能连接分析服务，该维度按通用规则估算。",
                "合规准备与后续行为": "未能连接分析服务，该维度按通用规则估算。"
            }
        },
        "actionPlan": {
            "immediate": ["整理名下金融账户与实体清单"],
            "shortTerm": ["完成税务居民身份自我认证", "咨询专业顾问"],
            "longTerm": ["建立年度合规复核机制"]
        },
        "summaryAndSuggestions": {
            "evaluationSummary": "由于分析服务暂不可用，本报告基于通用规则生成，整体风险水平为估算值。",
            "optimizationSuggestions": [
                "补充完整问卷信息后重新生成分析",
                "就具体架构安排咨询专业顾问"
            ],
            "professionalAdvice": "通用规则无法覆盖个性化情形，建议尽快获取专业的CRS合规意见。"
        }
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::normalizer::normalize;

    #[test]
    fn synthetic_output_normalizes_within_ranges() {
        for _ in 0..20 {
            let result = normalize(&generate_response());
            assert!((35..=65).contains(&result.overall_risk_level));
            for score in result.radar_scores.as_array() {
                assert!((3..=7).contains(&score));
            }
            assert!(!result.detailed_analysis.recommendations.is_empty());
            assert!(result
                .summary_and_suggestions
                .evaluation_summary
                .contains("通用规则"));
        }
    }
}
