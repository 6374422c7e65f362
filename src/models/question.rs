// src/models/question.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Question type tag shared by session questions and recorded attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    Mcq,
    Sata,
    Matrix,
    Cloze,
    Highlight,
    Bowtie,
}

/// The six question-content shapes the generation service produces.
///
/// The payload is a tagged union: deserializing validates the shape of each
/// variant's required fields in one place instead of ad hoc key checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "question_type", rename_all = "lowercase")]
pub enum QuestionContent {
    /// Single-answer multiple choice.
    Mcq {
        scenario: String,
        question: String,
        /// Option key (e.g. "A") to option text.
        options: BTreeMap<String, String>,
        correct_answer: String,
        rationale: String,
        #[serde(default)]
        incorrect_rationales: BTreeMap<String, String>,
    },
    /// Select-all-that-apply.
    Sata {
        scenario: String,
        question: String,
        options: BTreeMap<String, String>,
        correct_answers: Vec<String>,
        rationale: String,
        #[serde(default)]
        option_rationales: BTreeMap<String, String>,
    },
    /// Matrix / grid matching of row items to column options.
    Matrix {
        scenario: String,
        question: String,
        row_items: Vec<String>,
        column_options: Vec<String>,
        /// Row item to the correct column option.
        correct_matrix: BTreeMap<String, String>,
        rationale: String,
    },
    /// Cloze (dropdown fill-in-the-blank).
    Cloze {
        scenario: String,
        question_template: String,
        /// Blank key to its candidate choices.
        blanks: BTreeMap<String, Vec<String>>,
        /// Blank key to the correct choice.
        correct_answers: BTreeMap<String, String>,
        rationale: String,
    },
    /// Highlight the relevant phrases in a passage.
    Highlight {
        scenario: String,
        question: String,
        text_passage: String,
        correct_highlights: Vec<String>,
        rationale: String,
    },
    /// Bowtie: link a condition to its causes and interventions.
    Bowtie {
        scenario: String,
        condition: String,
        causes: Vec<String>,
        correct_causes: Vec<String>,
        interventions: Vec<String>,
        correct_interventions: Vec<String>,
        rationale: String,
    },
}

impl QuestionContent {
    pub fn kind(&self) -> QuestionKind {
        match self {
            QuestionContent::Mcq { .. } => QuestionKind::Mcq,
            QuestionContent::Sata { .. } => QuestionKind::Sata,
            QuestionContent::Matrix { .. } => QuestionKind::Matrix,
            QuestionContent::Cloze { .. } => QuestionKind::Cloze,
            QuestionContent::Highlight { .. } => QuestionKind::Highlight,
            QuestionContent::Bowtie { .. } => QuestionKind::Bowtie,
        }
    }

    pub fn scenario(&self) -> &str {
        match self {
            QuestionContent::Mcq { scenario, .. }
            | QuestionContent::Sata { scenario, .. }
            | QuestionContent::Matrix { scenario, .. }
            | QuestionContent::Cloze { scenario, .. }
            | QuestionContent::Highlight { scenario, .. }
            | QuestionContent::Bowtie { scenario, .. } => scenario,
        }
    }

    /// The question stem shown to the learner.
    pub fn stem(&self) -> &str {
        match self {
            QuestionContent::Mcq { question, .. }
            | QuestionContent::Sata { question, .. }
            | QuestionContent::Matrix { question, .. }
            | QuestionContent::Highlight { question, .. } => question,
            QuestionContent::Cloze { question_template, .. } => question_template,
            QuestionContent::Bowtie { condition, .. } => condition,
        }
    }

    pub fn rationale(&self) -> &str {
        match self {
            QuestionContent::Mcq { rationale, .. }
            | QuestionContent::Sata { rationale, .. }
            | QuestionContent::Matrix { rationale, .. }
            | QuestionContent::Cloze { rationale, .. }
            | QuestionContent::Highlight { rationale, .. }
            | QuestionContent::Bowtie { rationale, .. } => rationale,
        }
    }

    /// The scoring reference embedded in the payload, when the shape has a
    /// single canonical one. Callers provide the reference explicitly for the
    /// other shapes.
    pub fn default_correct_answer(&self) -> Option<String> {
        match self {
            QuestionContent::Mcq { correct_answer, .. } => Some(correct_answer.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mcq_payload_round_trips() {
        let raw = serde_json::json!({
            "question_type": "mcq",
            "scenario": "A 54-year-old is admitted with pneumonia.",
            "question": "Which finding is most concerning?",
            "options": {"A": "SpO2 88%", "B": "HR 92", "C": "Temp 37.9", "D": "RR 18"},
            "correct_answer": "A",
            "rationale": "Hypoxemia despite oxygen suggests progression to ARDS."
        });
        let content: QuestionContent = serde_json::from_value(raw).unwrap();
        assert_eq!(content.kind(), QuestionKind::Mcq);
        assert_eq!(content.default_correct_answer().as_deref(), Some("A"));
        assert!(content.rationale().contains("ARDS"));
    }

    #[test]
    fn missing_required_field_is_rejected() {
        // A bowtie payload without its intervention lists must not parse.
        let raw = serde_json::json!({
            "question_type": "bowtie",
            "scenario": "Post-op day 2.",
            "condition": "Sepsis",
            "causes": ["UTI"],
            "correct_causes": ["UTI"]
        });
        assert!(serde_json::from_value::<QuestionContent>(raw).is_err());
    }

    #[test]
    fn unknown_question_type_is_rejected() {
        let raw = serde_json::json!({
            "question_type": "essay",
            "scenario": "n/a",
            "question": "n/a"
        });
        assert!(serde_json::from_value::<QuestionContent>(raw).is_err());
    }
}
