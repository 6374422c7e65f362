// src/models/profile.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::question::QuestionKind;
use crate::models::session::{Difficulty, ExamMode};
use crate::models::skill::{ClinicalRole, ProficiencyLevel};
use crate::utils::text::{normalize_topic, skill_display_name, title_case, topic_fallback_skill};

/// A single scored question attempt. Append-only once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionAttempt {
    pub question_id: String,
    /// Never empty after recording: an empty tag set falls back to a
    /// topic-derived synthetic id.
    pub skill_ids: Vec<String>,
    pub topic: String,
    pub difficulty: Difficulty,
    pub question_type: QuestionKind,
    pub correct: bool,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_spent_seconds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exam_session_id: Option<String>,
}

/// Cumulative counters for one learner on one skill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillPerformance {
    pub skill_id: String,
    pub total_attempts: u32,
    pub correct_attempts: u32,
    pub accuracy: f64,
    pub last_attempted: DateTime<Utc>,
    pub proficiency_level: ProficiencyLevel,
}

/// Cumulative counters for one learner on one normalized topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicPerformance {
    pub topic: String,
    pub total_attempts: u32,
    pub correct_attempts: u32,
    pub accuracy: f64,
    pub last_attempted: DateTime<Utc>,
}

/// Record of a completed exam, appended to the profile on completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamRecord {
    pub exam_id: String,
    pub mode: ExamMode,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub score: f64,
    pub duration_minutes: f64,
    pub completed_at: DateTime<Utc>,
    pub topics_tested: Vec<String>,
    pub skills_tested: Vec<String>,
}

/// Durable per-learner record: full attempt history plus derived aggregates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnerProfile {
    pub learner_id: String,
    pub name: String,
    pub role: ClinicalRole,
    #[serde(default)]
    pub attempts: Vec<QuestionAttempt>,
    #[serde(default)]
    pub skill_performance: HashMap<String, SkillPerformance>,
    #[serde(default)]
    pub topic_performance: HashMap<String, TopicPerformance>,
    #[serde(default)]
    pub exam_history: Vec<ExamRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LearnerProfile {
    pub fn new(learner_id: &str, name: &str, role: ClinicalRole) -> Self {
        let now = Utc::now();
        LearnerProfile {
            learner_id: learner_id.to_string(),
            name: name.to_string(),
            role,
            attempts: Vec::new(),
            skill_performance: HashMap::new(),
            topic_performance: HashMap::new(),
            exam_history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Folds one attempt into the per-skill and per-topic aggregates and
    /// appends it to the history.
    ///
    /// Aggregates are updated incrementally from the stored counters, never
    /// recomputed from the history. An attempt without skill tags is recorded
    /// under a topic-derived synthetic id so no attempt is ever dropped.
    pub fn apply_attempt(&mut self, mut attempt: QuestionAttempt) {
        if attempt.skill_ids.is_empty() {
            attempt.skill_ids = vec![topic_fallback_skill(&attempt.topic)];
        }

        for skill_id in &attempt.skill_ids {
            let perf = self
                .skill_performance
                .entry(skill_id.clone())
                .or_insert_with(|| SkillPerformance {
                    skill_id: skill_id.clone(),
                    total_attempts: 0,
                    correct_attempts: 0,
                    accuracy: 0.0,
                    last_attempted: attempt.timestamp,
                    proficiency_level: ProficiencyLevel::Novice,
                });
            perf.total_attempts += 1;
            if attempt.correct {
                perf.correct_attempts += 1;
            }
            perf.accuracy = f64::from(perf.correct_attempts) / f64::from(perf.total_attempts);
            perf.last_attempted = attempt.timestamp;
            perf.proficiency_level =
                ProficiencyLevel::from_counters(perf.accuracy, perf.total_attempts);
        }

        let topic = normalize_topic(&attempt.topic);
        if !topic.is_empty() {
            let perf = self
                .topic_performance
                .entry(topic.clone())
                .or_insert_with(|| TopicPerformance {
                    topic,
                    total_attempts: 0,
                    correct_attempts: 0,
                    accuracy: 0.0,
                    last_attempted: attempt.timestamp,
                });
            perf.total_attempts += 1;
            if attempt.correct {
                perf.correct_attempts += 1;
            }
            perf.accuracy = f64::from(perf.correct_attempts) / f64::from(perf.total_attempts);
            perf.last_attempted = attempt.timestamp;
        }

        self.attempts.push(attempt);
        self.updated_at = Utc::now();
    }

    pub fn apply_exam_record(&mut self, record: ExamRecord) {
        self.exam_history.push(record);
        self.updated_at = Utc::now();
    }

    /// Skills with accuracy below 0.7 and at least one attempt, weakest first.
    pub fn skill_gaps(&self) -> Vec<SkillGapEntry> {
        let mut gaps: Vec<SkillGapEntry> = self
            .skill_performance
            .values()
            .filter(|p| p.accuracy < 0.7 && p.total_attempts >= 1)
            .map(SkillGapEntry::from_performance)
            .collect();
        gaps.sort_by(|a, b| a.accuracy.total_cmp(&b.accuracy));
        gaps
    }

    /// Skills with accuracy at or above 0.7 and at least one attempt,
    /// strongest first.
    pub fn strengths(&self) -> Vec<SkillGapEntry> {
        let mut strengths: Vec<SkillGapEntry> = self
            .skill_performance
            .values()
            .filter(|p| p.accuracy >= 0.7 && p.total_attempts >= 1)
            .map(SkillGapEntry::from_performance)
            .collect();
        strengths.sort_by(|a, b| b.accuracy.total_cmp(&a.accuracy));
        strengths
    }

    pub fn topic_strengths(&self) -> Vec<TopicPerformanceEntry> {
        let mut strengths: Vec<TopicPerformanceEntry> = self
            .topic_performance
            .values()
            .filter(|p| p.accuracy >= 0.7 && p.total_attempts >= 1)
            .map(TopicPerformanceEntry::from_performance)
            .collect();
        strengths.sort_by(|a, b| b.accuracy.total_cmp(&a.accuracy));
        strengths
    }

    pub fn topic_weaknesses(&self) -> Vec<TopicPerformanceEntry> {
        let mut weaknesses: Vec<TopicPerformanceEntry> = self
            .topic_performance
            .values()
            .filter(|p| p.accuracy < 0.7 && p.total_attempts >= 1)
            .map(TopicPerformanceEntry::from_performance)
            .collect();
        weaknesses.sort_by(|a, b| a.accuracy.total_cmp(&b.accuracy));
        weaknesses
    }

    /// Most recent exams first, capped at `limit`.
    pub fn recent_exams(&self, limit: usize) -> Vec<ExamRecord> {
        let mut exams = self.exam_history.clone();
        exams.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        exams.truncate(limit);
        exams
    }

    /// Projects the requested skill ids to accuracy percentages, 0 for
    /// skills the learner has never attempted.
    pub fn radar_chart_data(&self, skill_ids: &[String]) -> RadarChartData {
        let mut labels = Vec::with_capacity(skill_ids.len());
        let mut data = Vec::with_capacity(skill_ids.len());
        for skill_id in skill_ids {
            labels.push(skill_display_name(skill_id));
            let pct = self
                .skill_performance
                .get(skill_id)
                .map(|p| round1(p.accuracy * 100.0))
                .unwrap_or(0.0);
            data.push(pct);
        }
        RadarChartData { labels, data }
    }

    /// Aggregate dashboard snapshot.
    pub fn performance_report(&self) -> PerformanceReport {
        let total_questions = self.attempts.len();
        let correct_questions = self.attempts.iter().filter(|a| a.correct).count();
        let overall_accuracy = if total_questions > 0 {
            round1(correct_questions as f64 / total_questions as f64 * 100.0)
        } else {
            0.0
        };

        PerformanceReport {
            total_questions,
            correct_questions,
            overall_accuracy,
            skills_practiced: self.skill_performance.len(),
            topics_practiced: self.topic_performance.len(),
            exams_completed: self.exam_history.len(),
            skill_performance: self.skill_performance.clone(),
            topic_performance: self.topic_performance.clone(),
            topic_strengths: self.topic_strengths(),
            topic_weaknesses: self.topic_weaknesses(),
            skill_strengths: self.strengths(),
            skill_gaps: self.skill_gaps(),
            recent_exams: self.recent_exams(5),
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// One row of the skill gap / strength listings.
#[derive(Debug, Clone, Serialize)]
pub struct SkillGapEntry {
    pub skill_id: String,
    pub accuracy: f64,
    pub attempts: u32,
    pub proficiency: ProficiencyLevel,
}

impl SkillGapEntry {
    fn from_performance(perf: &SkillPerformance) -> Self {
        SkillGapEntry {
            skill_id: perf.skill_id.clone(),
            accuracy: perf.accuracy,
            attempts: perf.total_attempts,
            proficiency: perf.proficiency_level,
        }
    }
}

/// One row of the topic strength / weakness listings.
#[derive(Debug, Clone, Serialize)]
pub struct TopicPerformanceEntry {
    pub topic: String,
    pub accuracy: f64,
    pub attempts: u32,
    pub correct: u32,
}

impl TopicPerformanceEntry {
    fn from_performance(perf: &TopicPerformance) -> Self {
        TopicPerformanceEntry {
            topic: title_case(&perf.topic),
            accuracy: perf.accuracy,
            attempts: perf.total_attempts,
            correct: perf.correct_attempts,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RadarChartData {
    pub labels: Vec<String>,
    pub data: Vec<f64>,
}

/// Everything the dashboard needs in one payload.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceReport {
    pub total_questions: usize,
    pub correct_questions: usize,
    /// Percentage, rounded to one decimal.
    pub overall_accuracy: f64,
    pub skills_practiced: usize,
    pub topics_practiced: usize,
    pub exams_completed: usize,
    pub skill_performance: HashMap<String, SkillPerformance>,
    pub topic_performance: HashMap<String, TopicPerformance>,
    pub topic_strengths: Vec<TopicPerformanceEntry>,
    pub topic_weaknesses: Vec<TopicPerformanceEntry>,
    pub skill_strengths: Vec<SkillGapEntry>,
    pub skill_gaps: Vec<SkillGapEntry>,
    pub recent_exams: Vec<ExamRecord>,
}

/// DTO for registering a learner.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateLearnerRequest {
    #[validate(length(min = 1, max = 64))]
    pub learner_id: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub role: ClinicalRole,
}

/// DTO for recording an attempt outside an exam session.
#[derive(Debug, Deserialize, Validate)]
pub struct RecordAttemptRequest {
    #[validate(length(min = 1, max = 128))]
    pub question_id: String,
    #[serde(default)]
    pub skill_ids: Vec<String>,
    #[validate(length(min = 1, max = 200))]
    pub topic: String,
    pub difficulty: Difficulty,
    pub question_type: QuestionKind,
    pub correct: bool,
    #[serde(default)]
    pub time_spent_seconds: Option<u32>,
}

impl RecordAttemptRequest {
    pub fn into_attempt(self) -> QuestionAttempt {
        QuestionAttempt {
            question_id: self.question_id,
            skill_ids: self.skill_ids,
            topic: self.topic,
            difficulty: self.difficulty,
            question_type: self.question_type,
            correct: self.correct,
            timestamp: Utc::now(),
            time_spent_seconds: self.time_spent_seconds,
            exam_session_id: None,
        }
    }
}
