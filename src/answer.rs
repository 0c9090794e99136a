use serde::{Deserialize, Serialize};

/// 答案内容：单选为标量，多选为集合
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Single(String),
    Multiple(Vec<String>),
}

impl AnswerValue {
    /// Normalizes the value to a set view regardless of arity.
    pub fn as_set(&self) -> Vec<&str> {
        match self {
            AnswerValue::Single(v) => vec![v.as_str()],
            AnswerValue::Multiple(vs) => vs.iter().map(String::as_str).collect(),
        }
    }

    /// Returns true if this value intersects `candidates`.
    pub fn contains_any(&self, candidates: &[String]) -> bool {
        let own = self.as_set();
        candidates.iter().any(|c| own.contains(&c.as_str()))
    }
}

/// One answered question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub question_id: String,
    pub value: AnswerValue,
}

/// A user's full submission for one survey. The answer order is the
/// submission order; cache fingerprints sort by question id so input
/// order never affects cache identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSet {
    pub survey_id: String,
    pub answers: Vec<Answer>,
}

impl AnswerSet {
    pub fn answer_for(&self, question_id: &str) -> Option<&Answer> {
        self.answers.iter().find(|a| a.question_id == question_id)
    }
}

/// Survey definition as far as the analysis layer needs it: question
/// titles for rendering human-readable answer text into the prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyQuestion {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyData {
    pub id: String,
    pub title: String,
    pub questions: Vec<SurveyQuestion>,
}

impl SurveyData {
    pub fn question_title(&self, question_id: &str) -> Option<&str> {
        self.questions
            .iter()
            .find(|q| q.id == question_id)
            .map(|q| q.title.as_str())
    }
}

/// Maximum rendered answer length injected into a prompt. Longer text is
/// truncated to keep the token budget bounded.
const MAX_ANSWER_LENGTH: usize = 1000;

/// Renders answers as human-readable text for the analysis prompt.
/// Answers without a matching question in the survey are skipped.
pub fn format_answers(answers: &AnswerSet, survey: &SurveyData) -> String {
    let mut formatted = String::new();

    for (index, answer) in answers.answers.iter().enumerate() {
        let Some(title) = survey.question_title(&answer.question_id) else {
            continue;
        };

        formatted.push_str(&format!("问题{}: {}\n", index + 1, title));
        match &answer.value {
            AnswerValue::Single(v) => formatted.push_str(&format!("回答: {}\n", v)),
            AnswerValue::Multiple(vs) => {
                formatted.push_str(&format!("回答: {}\n", vs.join(", ")))
            }
        }
        formatted.push('\n');
    }

    formatted
}

/// Substitutes the formatted answers into a prompt template, truncating
/// over-long answer text first.
pub fn render_prompt(template: &str, formatted_answers: &str) -> String {
    let truncated = if formatted_answers.chars().count() > MAX_ANSWER_LENGTH {
        let mut shortened: String = formatted_answers.chars().take(MAX_ANSWER_LENGTH).collect();
        shortened.push_str("...(答案已截断)");
        shortened
    } else {
        formatted_answers.to_string()
    };

    template.replace("{USER_ANSWERS}", &truncated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn survey() -> SurveyData {
        SurveyData {
            id: "bank_crs_01".into(),
            title: "CRS合规自测".into(),
            questions: vec![
                SurveyQuestion {
                    id: "q1".into(),
                    title: "您持有哪些类型的金融账户？".into(),
                },
                SurveyQuestion {
                    id: "q2".into(),
                    title: "您是否持有离岸架构？".into(),
                },
            ],
        }
    }

    #[test]
    fn formats_single_and_multi_answers() {
        let answers = AnswerSet {
            survey_id: "bank_crs_01".into(),
            answers: vec![
                Answer {
                    question_id: "q1".into(),
                    value: AnswerValue::Multiple(vec![
                        "personal_bank".into(),
                        "personal_securities".into(),
                    ]),
                },
                Answer {
                    question_id: "q2".into(),
                    value: AnswerValue::Single("offshore_company".into()),
                },
            ],
        };

        let text = format_answers(&answers, &survey());
        assert!(text.contains("问题1: 您持有哪些类型的金融账户？"));
        assert!(text.contains("回答: personal_bank, personal_securities"));
        assert!(text.contains("问题2: 您是否持有离岸架构？"));
        assert!(text.contains("回答: offshore_company"));
    }

    #[test]
    fn unknown_questions_are_skipped() {
        let answers = AnswerSet {
            survey_id: "bank_crs_01".into(),
            answers: vec![Answer {
                question_id: "q99".into(),
                value: AnswerValue::Single("yes".into()),
            }],
        };
        assert!(format_answers(&answers, &survey()).is_empty());
    }

    #[test]
    fn render_prompt_truncates_long_answers() {
        let long = "答".repeat(1200);
        let rendered = render_prompt("分析：{USER_ANSWERS}", &long);
        assert!(rendered.contains("...(答案已截断)"));
        // 1000 chars plus the marker, not 1200
        assert!(rendered.chars().count() < 1100);
    }

    #[test]
    fn contains_any_normalizes_scalars() {
        let single = AnswerValue::Single("offshore_company".into());
        assert!(single.contains_any(&["offshore_company".to_string()]));
        assert!(!single.contains_any(&["trust_structure".to_string()]));

        let multi = AnswerValue::Multiple(vec!["a".into(), "b".into()]);
        assert!(multi.contains_any(&["b".to_string(), "c".to_string()]));
    }
}
