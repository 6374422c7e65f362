// src/store/profile.rs

use std::collections::HashMap;

use sqlx::SqlitePool;
use tokio::sync::RwLock;

use crate::error::AppError;
use crate::models::profile::{
    ExamRecord, LearnerProfile, PerformanceReport, QuestionAttempt, RadarChartData,
    SkillGapEntry, TopicPerformanceEntry,
};
use crate::models::skill::ClinicalRole;

/// Durable store of learner profiles.
///
/// Every profile is a self-contained JSON document keyed by learner id:
/// all documents are loaded at startup and each mutation rewrites the
/// learner's document before it becomes observable. The write guard is held
/// across the read-modify-write so aggregate updates are serialized.
pub struct ProfileStore {
    pool: SqlitePool,
    profiles: RwLock<HashMap<String, LearnerProfile>>,
}

impl ProfileStore {
    /// Loads every stored profile into memory.
    pub async fn load(pool: SqlitePool) -> Result<Self, AppError> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT learner_id, doc FROM learner_profiles")
                .fetch_all(&pool)
                .await?;

        let mut profiles = HashMap::with_capacity(rows.len());
        for (learner_id, doc) in rows {
            match serde_json::from_str::<LearnerProfile>(&doc) {
                Ok(profile) => {
                    profiles.insert(learner_id, profile);
                }
                Err(e) => {
                    tracing::error!("Skipping unreadable profile {}: {}", learner_id, e);
                }
            }
        }
        tracing::info!("Loaded {} learner profiles", profiles.len());

        Ok(ProfileStore {
            pool,
            profiles: RwLock::new(profiles),
        })
    }

    /// Rewrites the learner's full document.
    async fn persist(&self, profile: &LearnerProfile) -> Result<(), AppError> {
        let doc = serde_json::to_string(profile)?;
        sqlx::query(
            "INSERT INTO learner_profiles (learner_id, doc, updated_at) VALUES (?1, ?2, ?3) \
             ON CONFLICT(learner_id) DO UPDATE SET doc = excluded.doc, updated_at = excluded.updated_at",
        )
        .bind(&profile.learner_id)
        .bind(&doc)
        .bind(profile.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Creates a profile with zeroed aggregates. Returns the existing profile
    /// unchanged if the id is already taken (idempotent by id, not an error).
    pub async fn create_profile(
        &self,
        learner_id: &str,
        name: &str,
        role: ClinicalRole,
    ) -> Result<LearnerProfile, AppError> {
        let mut profiles = self.profiles.write().await;
        if let Some(existing) = profiles.get(learner_id) {
            return Ok(existing.clone());
        }

        let profile = LearnerProfile::new(learner_id, name, role);
        self.persist(&profile).await?;
        profiles.insert(learner_id.to_string(), profile.clone());
        Ok(profile)
    }

    pub async fn get_profile(&self, learner_id: &str) -> Result<LearnerProfile, AppError> {
        let profiles = self.profiles.read().await;
        profiles
            .get(learner_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Profile not found: {}", learner_id)))
    }

    /// Folds an attempt into the profile.
    ///
    /// The attempt, all touched skill aggregates and the topic aggregate
    /// commit together: the updated document is persisted before the
    /// in-memory copy is replaced, so a failed write leaves nothing
    /// observable.
    pub async fn record_attempt(
        &self,
        learner_id: &str,
        attempt: QuestionAttempt,
    ) -> Result<(), AppError> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .get(learner_id)
            .ok_or_else(|| AppError::NotFound(format!("Profile not found: {}", learner_id)))?;

        let mut updated = profile.clone();
        updated.apply_attempt(attempt);
        self.persist(&updated).await?;
        profiles.insert(learner_id.to_string(), updated);
        Ok(())
    }

    pub async fn record_exam_completion(
        &self,
        learner_id: &str,
        record: ExamRecord,
    ) -> Result<(), AppError> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .get(learner_id)
            .ok_or_else(|| AppError::NotFound(format!("Profile not found: {}", learner_id)))?;

        let mut updated = profile.clone();
        updated.apply_exam_record(record);
        self.persist(&updated).await?;
        profiles.insert(learner_id.to_string(), updated);
        Ok(())
    }

    pub async fn get_skill_gaps(&self, learner_id: &str) -> Result<Vec<SkillGapEntry>, AppError> {
        Ok(self.get_profile(learner_id).await?.skill_gaps())
    }

    pub async fn get_strengths(&self, learner_id: &str) -> Result<Vec<SkillGapEntry>, AppError> {
        Ok(self.get_profile(learner_id).await?.strengths())
    }

    pub async fn get_topic_strengths(
        &self,
        learner_id: &str,
    ) -> Result<Vec<TopicPerformanceEntry>, AppError> {
        Ok(self.get_profile(learner_id).await?.topic_strengths())
    }

    pub async fn get_topic_weaknesses(
        &self,
        learner_id: &str,
    ) -> Result<Vec<TopicPerformanceEntry>, AppError> {
        Ok(self.get_profile(learner_id).await?.topic_weaknesses())
    }

    pub async fn get_exam_history(
        &self,
        learner_id: &str,
        limit: usize,
    ) -> Result<Vec<ExamRecord>, AppError> {
        Ok(self.get_profile(learner_id).await?.recent_exams(limit))
    }

    pub async fn get_radar_chart_data(
        &self,
        learner_id: &str,
        skill_ids: &[String],
    ) -> Result<RadarChartData, AppError> {
        Ok(self.get_profile(learner_id).await?.radar_chart_data(skill_ids))
    }

    pub async fn get_all_performance_data(
        &self,
        learner_id: &str,
    ) -> Result<PerformanceReport, AppError> {
        Ok(self.get_profile(learner_id).await?.performance_report())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::QuestionKind;
    use crate::models::session::Difficulty;
    use chrono::Utc;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn store() -> ProfileStore {
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("failed to open in-memory database");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("failed to migrate");
        ProfileStore::load(pool).await.expect("failed to load store")
    }

    fn attempt(skill: &str, correct: bool) -> QuestionAttempt {
        QuestionAttempt {
            question_id: "q1".to_string(),
            skill_ids: vec![skill.to_string()],
            topic: "sepsis".to_string(),
            difficulty: Difficulty::Intermediate,
            question_type: QuestionKind::Mcq,
            correct,
            timestamp: Utc::now(),
            time_spent_seconds: Some(30),
            exam_session_id: None,
        }
    }

    #[tokio::test]
    async fn create_is_idempotent_by_id() {
        let store = store().await;
        let first = store
            .create_profile("n1", "Dana", ClinicalRole::IcuNurse)
            .await
            .unwrap();
        store
            .record_attempt("n1", attempt("skill_sepsis_recognition", true))
            .await
            .unwrap();

        // A second create with different details returns the existing record.
        let second = store
            .create_profile("n1", "Someone Else", ClinicalRole::Physician)
            .await
            .unwrap();
        assert_eq!(second.name, first.name);
        assert_eq!(second.attempts.len(), 1);
    }

    #[tokio::test]
    async fn record_attempt_requires_profile() {
        let store = store().await;
        let err = store
            .record_attempt("ghost", attempt("skill_sepsis_recognition", true))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn aggregates_survive_reload() {
        let pool = {
            let store = store().await;
            store
                .create_profile("n1", "Dana", ClinicalRole::IcuNurse)
                .await
                .unwrap();
            for i in 0..4 {
                store
                    .record_attempt("n1", attempt("skill_sepsis_recognition", i != 0))
                    .await
                    .unwrap();
            }
            store.pool.clone()
        };

        // A fresh store over the same database sees the same counters.
        let reloaded = ProfileStore::load(pool).await.unwrap();
        let profile = reloaded.get_profile("n1").await.unwrap();
        let perf = &profile.skill_performance["skill_sepsis_recognition"];
        assert_eq!(perf.total_attempts, 4);
        assert_eq!(perf.correct_attempts, 3);
    }

    #[tokio::test]
    async fn gap_listing_is_sorted_ascending() {
        let store = store().await;
        store
            .create_profile("n1", "Dana", ClinicalRole::IcuNurse)
            .await
            .unwrap();
        for _ in 0..2 {
            store
                .record_attempt("n1", attempt("skill_vent_setup", false))
                .await
                .unwrap();
        }
        store
            .record_attempt("n1", attempt("skill_sepsis_recognition", false))
            .await
            .unwrap();
        store
            .record_attempt("n1", attempt("skill_sepsis_recognition", true))
            .await
            .unwrap();

        let gaps = store.get_skill_gaps("n1").await.unwrap();
        assert_eq!(gaps.len(), 2);
        assert_eq!(gaps[0].skill_id, "skill_vent_setup");
        assert!(gaps[0].accuracy <= gaps[1].accuracy);
    }
}
