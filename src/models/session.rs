// src/models/session.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::question::{QuestionContent, QuestionKind};
use crate::utils::text::topic_fallback_skill;

/// Question difficulty tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }

    /// One tier harder, saturating at advanced.
    pub fn step_up(self) -> Self {
        match self {
            Difficulty::Beginner => Difficulty::Intermediate,
            Difficulty::Intermediate | Difficulty::Advanced => Difficulty::Advanced,
        }
    }

    /// One tier easier, saturating at beginner.
    pub fn step_down(self) -> Self {
        match self {
            Difficulty::Advanced => Difficulty::Intermediate,
            Difficulty::Intermediate | Difficulty::Beginner => Difficulty::Beginner,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamMode {
    Practice,
    Timed,
    Adaptive,
}

/// Session lifecycle. Completed and abandoned are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
    Abandoned,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::InProgress)
    }
}

/// One question inside an exam session.
///
/// Answer fields are written exactly once, on submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamQuestion {
    pub question_id: String,
    pub topic: String,
    pub difficulty: Difficulty,
    pub question_type: QuestionKind,
    pub skill_ids: Vec<String>,
    pub content: QuestionContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_answer: Option<String>,
    /// Reference value the submitted answer is compared against.
    pub correct_answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_spent_seconds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answered_at: Option<DateTime<Utc>>,
}

impl ExamQuestion {
    pub fn is_answered(&self) -> bool {
        self.is_correct.is_some()
    }

    /// Skill ids for aggregation, falling back to the topic-derived synthetic
    /// id when the question carries no tags.
    pub fn effective_skill_ids(&self) -> Vec<String> {
        if self.skill_ids.is_empty() {
            vec![topic_fallback_skill(&self.topic)]
        } else {
            self.skill_ids.clone()
        }
    }
}

/// An exam session: ordered question list plus scoring state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamSession {
    pub session_id: String,
    pub learner_id: String,
    pub mode: ExamMode,
    /// Target count; appends past it are allowed and logged, not rejected.
    pub total_questions: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit_minutes: Option<u32>,
    #[serde(default)]
    pub questions: Vec<ExamQuestion>,
    #[serde(default)]
    pub current_question_index: usize,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    pub status: SessionStatus,
}

impl ExamSession {
    pub fn new(
        session_id: String,
        learner_id: String,
        mode: ExamMode,
        total_questions: u32,
        time_limit_minutes: Option<u32>,
    ) -> Self {
        ExamSession {
            session_id,
            learner_id,
            mode,
            total_questions,
            time_limit_minutes,
            questions: Vec::new(),
            current_question_index: 0,
            start_time: Utc::now(),
            end_time: None,
            score: None,
            status: SessionStatus::InProgress,
        }
    }

    pub fn correct_count(&self) -> u32 {
        self.questions
            .iter()
            .filter(|q| q.is_correct == Some(true))
            .count() as u32
    }

    /// Percentage score over all questions in the session, 0 when empty.
    pub fn compute_score(&self) -> f64 {
        let total = self.questions.len();
        if total == 0 {
            return 0.0;
        }
        f64::from(self.correct_count()) / total as f64 * 100.0
    }

    /// Difficulty for the next question in adaptive mode.
    ///
    /// Holds at intermediate until three questions have been answered, then
    /// looks at the three most recently answered questions (unanswered
    /// trailing questions are skipped): two or more correct escalates one
    /// tier from the most recent question's tier, one or fewer de-escalates,
    /// both saturating at the ends of the ladder.
    pub fn adaptive_next_difficulty(&self) -> Difficulty {
        let answered: Vec<&ExamQuestion> =
            self.questions.iter().filter(|q| q.is_answered()).collect();
        if answered.len() < 3 {
            return Difficulty::Intermediate;
        }
        let recent = &answered[answered.len() - 3..];
        let correct = recent.iter().filter(|q| q.is_correct == Some(true)).count();
        let current = recent[2].difficulty;
        if correct >= 2 {
            current.step_up()
        } else {
            current.step_down()
        }
    }

    /// Cross-tabulates correctness by difficulty, skill and topic.
    pub fn summary(&self) -> SessionSummary {
        let mut difficulty_performance: BTreeMap<Difficulty, Tally> = BTreeMap::new();
        for tier in [Difficulty::Beginner, Difficulty::Intermediate, Difficulty::Advanced] {
            difficulty_performance.insert(tier, Tally::default());
        }
        let mut skill_performance: BTreeMap<String, Tally> = BTreeMap::new();
        let mut topic_performance: BTreeMap<String, Tally> = BTreeMap::new();

        for question in &self.questions {
            let correct = question.is_correct == Some(true);
            if let Some(tally) = difficulty_performance.get_mut(&question.difficulty) {
                tally.record(correct);
            }
            for skill_id in question.effective_skill_ids() {
                skill_performance.entry(skill_id).or_default().record(correct);
            }
            topic_performance
                .entry(question.topic.clone())
                .or_default()
                .record(correct);
        }

        SessionSummary {
            session_id: self.session_id.clone(),
            mode: self.mode,
            score: self.score,
            difficulty_performance,
            skill_performance,
            topic_performance,
        }
    }
}

/// Correct/total pair used by the session summary tables.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Tally {
    pub correct: u32,
    pub total: u32,
}

impl Tally {
    fn record(&mut self, correct: bool) {
        self.total += 1;
        if correct {
            self.correct += 1;
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub mode: ExamMode,
    pub score: Option<f64>,
    pub difficulty_performance: BTreeMap<Difficulty, Tally>,
    pub skill_performance: BTreeMap<String, Tally>,
    pub topic_performance: BTreeMap<String, Tally>,
}

/// DTO for starting a session.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSessionRequest {
    #[validate(length(min = 1, max = 64))]
    pub learner_id: String,
    pub mode: ExamMode,
    #[validate(range(min = 1, max = 500))]
    pub total_questions: u32,
    #[serde(default)]
    pub time_limit_minutes: Option<u32>,
    /// Advisory focus list; forwarded to question generation, not enforced.
    #[serde(default)]
    pub focus_skills: Option<Vec<String>>,
}

/// DTO for appending a question to a session.
#[derive(Debug, Deserialize, Validate)]
pub struct AddQuestionRequest {
    #[serde(default)]
    pub question_id: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub topic: String,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    /// Skill tags; when empty or absent the auto-tagger fills them in.
    #[serde(default)]
    pub skill_ids: Vec<String>,
    pub content: QuestionContent,
    /// Scoring reference; defaults to the payload's own where it carries one.
    #[serde(default)]
    pub correct_answer: Option<String>,
}

/// DTO for answering a question.
#[derive(Debug, Deserialize)]
pub struct SubmitAnswerRequest {
    pub question_index: usize,
    pub user_answer: String,
    #[serde(default)]
    pub time_spent_seconds: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitAnswerResponse {
    pub is_correct: bool,
    pub correct_answer: String,
    pub rationale: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompleteSessionResponse {
    pub score: f64,
    pub correct: u32,
    pub total: u32,
    pub duration_minutes: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::QuestionContent;

    fn question(difficulty: Difficulty, answered: Option<bool>) -> ExamQuestion {
        ExamQuestion {
            question_id: "q".to_string(),
            topic: "sepsis".to_string(),
            difficulty,
            question_type: QuestionKind::Mcq,
            skill_ids: vec!["skill_sepsis_recognition".to_string()],
            content: QuestionContent::Mcq {
                scenario: "s".to_string(),
                question: "q".to_string(),
                options: Default::default(),
                correct_answer: "A".to_string(),
                rationale: "r".to_string(),
                incorrect_rationales: Default::default(),
            },
            user_answer: answered.map(|_| "A".to_string()),
            correct_answer: "A".to_string(),
            is_correct: answered,
            time_spent_seconds: None,
            answered_at: answered.map(|_| Utc::now()),
        }
    }

    fn session_with(questions: Vec<ExamQuestion>) -> ExamSession {
        let mut session = ExamSession::new(
            "exam_n1_1".to_string(),
            "n1".to_string(),
            ExamMode::Adaptive,
            10,
            None,
        );
        session.questions = questions;
        session
    }

    #[test]
    fn fewer_than_three_answered_holds_intermediate() {
        let session = session_with(vec![
            question(Difficulty::Advanced, Some(true)),
            question(Difficulty::Advanced, Some(true)),
            question(Difficulty::Advanced, None),
        ]);
        assert_eq!(session.adaptive_next_difficulty(), Difficulty::Intermediate);
    }

    #[test]
    fn two_of_three_correct_escalates() {
        let session = session_with(vec![
            question(Difficulty::Intermediate, Some(true)),
            question(Difficulty::Intermediate, Some(true)),
            question(Difficulty::Intermediate, Some(false)),
        ]);
        assert_eq!(session.adaptive_next_difficulty(), Difficulty::Advanced);
    }

    #[test]
    fn one_of_three_correct_de_escalates() {
        let session = session_with(vec![
            question(Difficulty::Advanced, Some(false)),
            question(Difficulty::Advanced, Some(false)),
            question(Difficulty::Advanced, Some(true)),
        ]);
        assert_eq!(session.adaptive_next_difficulty(), Difficulty::Intermediate);
    }

    #[test]
    fn escalation_saturates_at_advanced() {
        let session = session_with(vec![
            question(Difficulty::Advanced, Some(true)),
            question(Difficulty::Advanced, Some(true)),
            question(Difficulty::Advanced, Some(true)),
        ]);
        assert_eq!(session.adaptive_next_difficulty(), Difficulty::Advanced);
    }

    #[test]
    fn de_escalation_saturates_at_beginner() {
        let session = session_with(vec![
            question(Difficulty::Beginner, Some(false)),
            question(Difficulty::Beginner, Some(false)),
            question(Difficulty::Beginner, Some(false)),
        ]);
        assert_eq!(session.adaptive_next_difficulty(), Difficulty::Beginner);
    }

    #[test]
    fn unanswered_trailing_questions_are_skipped() {
        // Last added question is unanswered; the window is the three answered.
        let session = session_with(vec![
            question(Difficulty::Beginner, Some(true)),
            question(Difficulty::Intermediate, Some(true)),
            question(Difficulty::Intermediate, Some(false)),
            question(Difficulty::Advanced, None),
        ]);
        assert_eq!(session.adaptive_next_difficulty(), Difficulty::Advanced);
    }

    #[test]
    fn score_is_percentage_of_all_questions() {
        let session = session_with(vec![
            question(Difficulty::Intermediate, Some(true)),
            question(Difficulty::Intermediate, Some(false)),
            question(Difficulty::Intermediate, Some(true)),
            question(Difficulty::Intermediate, Some(true)),
        ]);
        assert!((session.compute_score() - 75.0).abs() < f64::EPSILON);
        assert_eq!(session_with(vec![]).compute_score(), 0.0);
    }

    #[test]
    fn summary_has_fixed_difficulty_buckets() {
        let session = session_with(vec![question(Difficulty::Intermediate, Some(true))]);
        let summary = session.summary();
        assert_eq!(summary.difficulty_performance.len(), 3);
        let mid = &summary.difficulty_performance[&Difficulty::Intermediate];
        assert_eq!((mid.correct, mid.total), (1, 1));
        let beginner = &summary.difficulty_performance[&Difficulty::Beginner];
        assert_eq!((beginner.correct, beginner.total), (0, 0));
    }
}
