// src/recommend.rs

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::Serialize;

use crate::error::AppError;
use crate::models::profile::ExamRecord;
use crate::ontology::SkillOntology;
use crate::store::ProfileStore;
use crate::utils::text::skill_display_name;

/// Accuracy below this marks a skill or topic as a weak area.
const WEAK_AREA_THRESHOLD: f64 = 0.7;

/// Pure derivation layer over the profile store: study guidance, focused
/// exam plans and milestone progress. Owns no state of its own.
pub struct RecommendationEngine {
    profiles: Arc<ProfileStore>,
    ontology: Arc<SkillOntology>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationSource {
    Topic,
    Skill,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeakSkill {
    pub skill_id: String,
    pub skill_name: String,
    pub category: String,
    pub accuracy: f64,
    pub attempts: u32,
    pub improvement_needed: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeakTopic {
    pub topic: String,
    pub accuracy: f64,
    pub attempts: u32,
    pub correct: u32,
    pub improvement_needed: f64,
    pub priority: Priority,
}

#[derive(Debug, Clone, Serialize)]
pub struct StrongTopic {
    pub topic: String,
    pub accuracy: f64,
    pub attempts: u32,
    pub correct: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopicRecommendation {
    /// Display label: a topic name or a skill name.
    pub skill_name: String,
    pub recommended_topics: Vec<String>,
    pub current_accuracy: String,
    pub target_accuracy: String,
    pub recommended_questions: u32,
    pub priority: Priority,
    #[serde(rename = "type")]
    pub source: RecommendationSource,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopicFocus {
    pub num_questions: u32,
    pub current_accuracy: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkillFocus {
    pub skill_name: String,
    pub num_questions: u32,
    pub current_accuracy: String,
}

/// Question-distribution plan for a focused exam.
#[derive(Debug, Clone, Serialize)]
pub struct FocusedExamPlan {
    pub focus: String,
    pub message: String,
    pub skill_distribution: BTreeMap<String, SkillFocus>,
    pub topic_distribution: BTreeMap<String, TopicFocus>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recommended_topics: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MilestoneStatus {
    pub current: String,
    pub next: String,
    pub progress: String,
    pub description: String,
}

/// Aggregate payload for the study dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct ComprehensiveRecommendations {
    pub has_data: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_accuracy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_questions: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exams_completed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topics_practiced: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone: Option<MilestoneStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weak_topics: Option<Vec<WeakTopic>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strong_topics: Option<Vec<StrongTopic>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weak_skills: Option<Vec<WeakSkill>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<Vec<TopicRecommendation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focused_exam: Option<FocusedExamPlan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_exams: Option<Vec<ExamRecord>>,
}

impl RecommendationEngine {
    pub fn new(profiles: Arc<ProfileStore>, ontology: Arc<SkillOntology>) -> Self {
        RecommendationEngine { profiles, ontology }
    }

    /// Up to five skills below the threshold, weakest first.
    pub async fn get_weak_skills(
        &self,
        learner_id: &str,
        threshold: f64,
    ) -> Result<Vec<WeakSkill>, AppError> {
        let gaps = self.profiles.get_skill_gaps(learner_id).await?;

        let mut weak: Vec<WeakSkill> = gaps
            .into_iter()
            .filter(|gap| gap.accuracy < threshold)
            .map(|gap| {
                let (skill_name, category) = match self.ontology.get_skill(&gap.skill_id) {
                    Some(skill) => (skill.name.clone(), skill.category.label().to_string()),
                    None => (skill_display_name(&gap.skill_id), "General".to_string()),
                };
                WeakSkill {
                    skill_id: gap.skill_id,
                    skill_name,
                    category,
                    accuracy: gap.accuracy,
                    attempts: gap.attempts,
                    improvement_needed: threshold - gap.accuracy,
                }
            })
            .collect();
        weak.truncate(5);
        Ok(weak)
    }

    /// Up to five topics below the threshold, weakest first.
    pub async fn get_weak_topics(
        &self,
        learner_id: &str,
        threshold: f64,
    ) -> Result<Vec<WeakTopic>, AppError> {
        let weaknesses = self.profiles.get_topic_weaknesses(learner_id).await?;

        let mut weak: Vec<WeakTopic> = weaknesses
            .into_iter()
            .filter(|t| t.accuracy < threshold)
            .map(|t| WeakTopic {
                priority: if t.accuracy < 0.5 {
                    Priority::High
                } else {
                    Priority::Medium
                },
                improvement_needed: threshold - t.accuracy,
                topic: t.topic,
                accuracy: t.accuracy,
                attempts: t.attempts,
                correct: t.correct,
            })
            .collect();
        weak.truncate(5);
        Ok(weak)
    }

    /// Up to five topics at or above the threshold, strongest first.
    pub async fn get_strong_topics(
        &self,
        learner_id: &str,
        threshold: f64,
    ) -> Result<Vec<StrongTopic>, AppError> {
        let strengths = self.profiles.get_topic_strengths(learner_id).await?;

        let mut strong: Vec<StrongTopic> = strengths
            .into_iter()
            .filter(|t| t.accuracy >= threshold)
            .map(|t| StrongTopic {
                topic: t.topic,
                accuracy: t.accuracy,
                attempts: t.attempts,
                correct: t.correct,
            })
            .collect();
        strong.truncate(5);
        Ok(strong)
    }

    /// Merged study recommendations: weak topics first, then weak skills,
    /// deduplicated case-insensitively by display label, capped at eight.
    pub async fn get_recommended_topics(
        &self,
        learner_id: &str,
    ) -> Result<Vec<TopicRecommendation>, AppError> {
        let weak_topics = self.get_weak_topics(learner_id, WEAK_AREA_THRESHOLD).await?;
        let weak_skills = self.get_weak_skills(learner_id, WEAK_AREA_THRESHOLD).await?;

        let mut recommendations = Vec::new();

        for topic in &weak_topics {
            recommendations.push(TopicRecommendation {
                skill_name: topic.topic.clone(),
                recommended_topics: vec![topic.topic.clone()],
                current_accuracy: pct(topic.accuracy),
                target_accuracy: "80%".to_string(),
                recommended_questions: 5,
                priority: topic.priority,
                source: RecommendationSource::Topic,
            });
        }

        for weak in &weak_skills {
            let Some(skill) = self.ontology.get_skill(&weak.skill_id) else {
                continue;
            };
            let topics =
                skill_focus_topics(&weak.skill_id).unwrap_or_else(|| vec![skill.name.clone()]);
            recommendations.push(TopicRecommendation {
                skill_name: skill.name.clone(),
                recommended_topics: topics,
                current_accuracy: pct(weak.accuracy),
                target_accuracy: "80%".to_string(),
                recommended_questions: 5,
                priority: if weak.accuracy < 0.5 {
                    Priority::High
                } else {
                    Priority::Medium
                },
                source: RecommendationSource::Skill,
            });
        }

        let mut seen = HashSet::new();
        let mut unique: Vec<TopicRecommendation> = recommendations
            .into_iter()
            .filter(|rec| seen.insert(rec.skill_name.to_lowercase()))
            .collect();
        unique.truncate(8);
        Ok(unique)
    }

    /// Question-distribution plan biased toward the learner's weakest areas.
    pub async fn generate_focused_exam(
        &self,
        learner_id: &str,
        num_questions: u32,
    ) -> Result<FocusedExamPlan, AppError> {
        let weak_topics = self.get_weak_topics(learner_id, WEAK_AREA_THRESHOLD).await?;
        let weak_skills = self.get_weak_skills(learner_id, WEAK_AREA_THRESHOLD).await?;
        Ok(build_focused_plan(&weak_topics, &weak_skills, num_questions))
    }

    /// First unmet milestone on the fixed ladder, with progress toward it.
    pub async fn get_next_milestone(&self, learner_id: &str) -> Result<MilestoneStatus, AppError> {
        let report = self.profiles.get_all_performance_data(learner_id).await?;
        Ok(milestone_from_counters(
            report.total_questions,
            report.topics_practiced,
            report.exams_completed,
            report.overall_accuracy,
        ))
    }

    /// Everything the study dashboard needs in one call.
    pub async fn get_comprehensive_recommendations(
        &self,
        learner_id: &str,
    ) -> Result<ComprehensiveRecommendations, AppError> {
        let report = self.profiles.get_all_performance_data(learner_id).await?;

        if report.total_questions == 0 {
            return Ok(ComprehensiveRecommendations {
                has_data: false,
                message: Some(
                    "Complete some questions to get personalized recommendations.".to_string(),
                ),
                overall_accuracy: None,
                total_questions: None,
                exams_completed: None,
                topics_practiced: None,
                milestone: None,
                weak_topics: None,
                strong_topics: None,
                weak_skills: None,
                recommendations: None,
                focused_exam: None,
                recent_exams: None,
            });
        }

        Ok(ComprehensiveRecommendations {
            has_data: true,
            message: None,
            overall_accuracy: Some(report.overall_accuracy),
            total_questions: Some(report.total_questions),
            exams_completed: Some(report.exams_completed),
            topics_practiced: Some(report.topics_practiced),
            milestone: Some(self.get_next_milestone(learner_id).await?),
            weak_topics: Some(self.get_weak_topics(learner_id, WEAK_AREA_THRESHOLD).await?),
            strong_topics: Some(self.get_strong_topics(learner_id, WEAK_AREA_THRESHOLD).await?),
            weak_skills: Some(self.get_weak_skills(learner_id, WEAK_AREA_THRESHOLD).await?),
            recommendations: Some(self.get_recommended_topics(learner_id).await?),
            focused_exam: Some(self.generate_focused_exam(learner_id, 10).await?),
            recent_exams: Some(report.recent_exams),
        })
    }
}

fn pct(accuracy: f64) -> String {
    format!("{:.0}%", accuracy * 100.0)
}

/// Curated study topics for catalog skills; falls back to the skill name.
fn skill_focus_topics(skill_id: &str) -> Option<Vec<String>> {
    let topics: &[&str] = match skill_id {
        "skill_ards_recognition" => &["ARDS", "respiratory distress"],
        "skill_vent_setup" => &["mechanical ventilation", "ventilator settings"],
        "skill_vent_monitoring" => &["ABG interpretation", "ventilator alarms"],
        "skill_sepsis_recognition" => &["sepsis", "septic shock"],
        "skill_sepsis_management" => &["sepsis bundle", "fluid resuscitation"],
        "skill_medication_admin" => &["medication safety", "IV administration"],
        "skill_critical_drug_management" => &["vasoactive drugs", "high-alert medications"],
        _ => return None,
    };
    Some(topics.iter().map(|t| t.to_string()).collect())
}

/// Splits `num_questions` across up to three weak topics and two weak
/// skills, at least two questions per area, topics first.
fn build_focused_plan(
    weak_topics: &[WeakTopic],
    weak_skills: &[WeakSkill],
    num_questions: u32,
) -> FocusedExamPlan {
    if weak_topics.is_empty() && weak_skills.is_empty() {
        return FocusedExamPlan {
            focus: "comprehensive_review".to_string(),
            message: "No major gaps identified. This will be a comprehensive review.".to_string(),
            skill_distribution: BTreeMap::new(),
            topic_distribution: BTreeMap::new(),
            recommended_topics: Vec::new(),
        };
    }

    let total_weak = (weak_topics.len() + weak_skills.len()) as u32;
    let questions_per_area = (num_questions / total_weak.max(1)).max(2);

    let mut topic_distribution = BTreeMap::new();
    for topic in weak_topics.iter().take(3) {
        topic_distribution.insert(
            topic.topic.clone(),
            TopicFocus {
                num_questions: questions_per_area,
                current_accuracy: pct(topic.accuracy),
            },
        );
    }

    let mut skill_distribution = BTreeMap::new();
    for skill in weak_skills.iter().take(2) {
        skill_distribution.insert(
            skill.skill_id.clone(),
            SkillFocus {
                skill_name: skill.skill_name.clone(),
                num_questions: questions_per_area,
                current_accuracy: pct(skill.accuracy),
            },
        );
    }

    let focus_areas: Vec<String> = weak_topics
        .iter()
        .take(3)
        .map(|t| t.topic.clone())
        .chain(weak_skills.iter().take(2).map(|s| s.skill_name.clone()))
        .collect();

    FocusedExamPlan {
        focus: "gap_remediation".to_string(),
        message: format!(
            "This exam focuses on your {} weakest areas: {}",
            focus_areas.len(),
            focus_areas.join(", ")
        ),
        skill_distribution,
        topic_distribution,
        recommended_topics: focus_areas,
    }
}

/// Walks the fixed milestone ladder and reports the first unmet milestone.
fn milestone_from_counters(
    total_questions: usize,
    topics_practiced: usize,
    exams_completed: usize,
    overall_accuracy: f64,
) -> MilestoneStatus {
    struct Gate {
        name: &'static str,
        met: bool,
        progress: String,
        description: &'static str,
    }

    let gates = [
        Gate {
            name: "Beginner",
            met: total_questions >= 5,
            progress: format!("{}/5 questions", total_questions.min(5)),
            description: "Answer 5 questions",
        },
        Gate {
            name: "Explorer",
            met: topics_practiced >= 3,
            progress: format!("{}/3 topics", topics_practiced.min(3)),
            description: "Practice 3 different topics",
        },
        Gate {
            name: "Committed",
            met: exams_completed >= 3,
            progress: format!("{}/3 exams", exams_completed.min(3)),
            description: "Complete 3 exams",
        },
        Gate {
            name: "Proficient",
            met: total_questions >= 25 && overall_accuracy >= 70.0,
            progress: format!(
                "{}/25 questions, {:.0}%/70% accuracy",
                total_questions, overall_accuracy
            ),
            description: "Answer 25 questions with 70%+ accuracy",
        },
        Gate {
            name: "Expert",
            met: total_questions >= 50 && overall_accuracy >= 85.0,
            progress: format!(
                "{}/50 questions, {:.0}%/85% accuracy",
                total_questions, overall_accuracy
            ),
            description: "Answer 50 questions with 85%+ accuracy",
        },
        Gate {
            name: "Master",
            met: total_questions >= 100 && overall_accuracy >= 90.0,
            progress: format!(
                "{}/100 questions, {:.0}%/90% accuracy",
                total_questions, overall_accuracy
            ),
            description: "Answer 100 questions with 90%+ accuracy",
        },
    ];

    let mut current = "Novice".to_string();
    for gate in gates {
        if gate.met {
            current = gate.name.to_string();
        } else {
            return MilestoneStatus {
                current,
                next: gate.name.to_string(),
                progress: gate.progress,
                description: gate.description.to_string(),
            };
        }
    }

    MilestoneStatus {
        current,
        next: "Master".to_string(),
        progress: "Complete".to_string(),
        description: "You've mastered all milestones!".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_learner_starts_at_novice() {
        let status = milestone_from_counters(0, 0, 0, 0.0);
        assert_eq!(status.current, "Novice");
        assert_eq!(status.next, "Beginner");
        assert_eq!(status.progress, "0/5 questions");
    }

    #[test]
    fn milestone_walk_stops_at_first_unmet_gate() {
        // 30 questions at 75%, 4 topics, 3 exams: Proficient met, Expert not.
        let status = milestone_from_counters(30, 4, 3, 75.0);
        assert_eq!(status.current, "Proficient");
        assert_eq!(status.next, "Expert");
        assert_eq!(status.progress, "30/50 questions, 75%/85% accuracy");
    }

    #[test]
    fn explorer_gate_blocks_on_topic_variety() {
        let status = milestone_from_counters(10, 1, 0, 90.0);
        assert_eq!(status.current, "Beginner");
        assert_eq!(status.next, "Explorer");
        assert_eq!(status.progress, "1/3 topics");
    }

    #[test]
    fn completed_ladder_reports_master() {
        let status = milestone_from_counters(120, 6, 5, 92.0);
        assert_eq!(status.current, "Master");
        assert_eq!(status.progress, "Complete");
    }

    fn weak_topic(topic: &str, accuracy: f64) -> WeakTopic {
        WeakTopic {
            topic: topic.to_string(),
            accuracy,
            attempts: 4,
            correct: (4.0 * accuracy) as u32,
            improvement_needed: 0.7 - accuracy,
            priority: if accuracy < 0.5 { Priority::High } else { Priority::Medium },
        }
    }

    fn weak_skill(id: &str, name: &str, accuracy: f64) -> WeakSkill {
        WeakSkill {
            skill_id: id.to_string(),
            skill_name: name.to_string(),
            category: "Clinical Assessment".to_string(),
            accuracy,
            attempts: 4,
            improvement_needed: 0.7 - accuracy,
        }
    }

    #[test]
    fn focused_plan_without_gaps_is_comprehensive_review() {
        let plan = build_focused_plan(&[], &[], 10);
        assert_eq!(plan.focus, "comprehensive_review");
        assert!(plan.topic_distribution.is_empty());
        assert!(plan.skill_distribution.is_empty());
    }

    #[test]
    fn focused_plan_splits_evenly_with_floor_of_two() {
        let topics = vec![weak_topic("Sepsis", 0.4), weak_topic("Ards", 0.5)];
        let skills = vec![weak_skill("skill_vent_setup", "Ventilator Setup", 0.6)];
        let plan = build_focused_plan(&topics, &skills, 10);

        assert_eq!(plan.focus, "gap_remediation");
        // 10 questions over 3 areas: 3 per area.
        assert_eq!(plan.topic_distribution["Sepsis"].num_questions, 3);
        assert_eq!(plan.skill_distribution["skill_vent_setup"].num_questions, 3);
        assert_eq!(plan.recommended_topics.len(), 3);

        // With many areas the floor of two questions holds.
        let many: Vec<WeakTopic> = (0..5)
            .map(|i| weak_topic(&format!("Topic {}", i), 0.3))
            .collect();
        let plan = build_focused_plan(&many, &skills, 10);
        assert!(plan.topic_distribution.values().all(|t| t.num_questions == 2));
        // Only the three weakest topics and two skills are planned.
        assert_eq!(plan.topic_distribution.len(), 3);
    }
}
