// src/store/session.rs

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::Utc;
use sqlx::SqlitePool;
use tokio::sync::RwLock;

use crate::error::AppError;
use crate::models::profile::{ExamRecord, QuestionAttempt};
use crate::models::question::QuestionContent;
use crate::models::session::{
    CompleteSessionResponse, Difficulty, ExamMode, ExamQuestion, ExamSession, SessionStatus,
    SessionSummary, SubmitAnswerResponse,
};
use crate::store::ProfileStore;
use crate::utils::text::topic_fallback_skill;

/// Owns exam sessions and drives their state machine.
///
/// Sessions are persisted as full JSON documents keyed by session id, loaded
/// at startup and rewritten on every mutation. Answer submissions and exam
/// completions are forwarded to the profile store best-effort: the session's
/// own persisted record stays authoritative when forwarding fails.
pub struct ExamSessionManager {
    pool: SqlitePool,
    profiles: Arc<ProfileStore>,
    sessions: RwLock<HashMap<String, ExamSession>>,
}

impl ExamSessionManager {
    /// Loads every stored session into memory.
    pub async fn load(pool: SqlitePool, profiles: Arc<ProfileStore>) -> Result<Self, AppError> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT session_id, doc FROM exam_sessions")
                .fetch_all(&pool)
                .await?;

        let mut sessions = HashMap::with_capacity(rows.len());
        for (session_id, doc) in rows {
            match serde_json::from_str::<ExamSession>(&doc) {
                Ok(session) => {
                    sessions.insert(session_id, session);
                }
                Err(e) => {
                    tracing::error!("Skipping unreadable session {}: {}", session_id, e);
                }
            }
        }
        tracing::info!("Loaded {} exam sessions", sessions.len());

        Ok(ExamSessionManager {
            pool,
            profiles,
            sessions: RwLock::new(sessions),
        })
    }

    /// Rewrites the session's full document.
    async fn persist(&self, session: &ExamSession) -> Result<(), AppError> {
        let doc = serde_json::to_string(session)?;
        sqlx::query(
            "INSERT INTO exam_sessions (session_id, learner_id, doc, updated_at) VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(session_id) DO UPDATE SET doc = excluded.doc, updated_at = excluded.updated_at",
        )
        .bind(&session.session_id)
        .bind(&session.learner_id)
        .bind(&doc)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Starts a session. The id is derived from the learner id and creation
    /// timestamp, with a numeric suffix if that ever collides.
    pub async fn create_session(
        &self,
        learner_id: &str,
        mode: ExamMode,
        total_questions: u32,
        time_limit_minutes: Option<u32>,
    ) -> Result<ExamSession, AppError> {
        let mut sessions = self.sessions.write().await;

        let base = format!("exam_{}_{}", learner_id, Utc::now().format("%Y%m%d_%H%M%S"));
        let mut session_id = base.clone();
        let mut suffix = 1;
        while sessions.contains_key(&session_id) {
            suffix += 1;
            session_id = format!("{}_{}", base, suffix);
        }

        let session = ExamSession::new(
            session_id.clone(),
            learner_id.to_string(),
            mode,
            total_questions,
            time_limit_minutes,
        );
        self.persist(&session).await?;
        sessions.insert(session_id, session.clone());
        Ok(session)
    }

    pub async fn get_session(&self, session_id: &str) -> Result<ExamSession, AppError> {
        let sessions = self.sessions.read().await;
        sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Session not found: {}", session_id)))
    }

    /// All sessions belonging to a learner, most recently started first.
    pub async fn get_learner_sessions(&self, learner_id: &str) -> Vec<ExamSession> {
        let sessions = self.sessions.read().await;
        let mut found: Vec<ExamSession> = sessions
            .values()
            .filter(|s| s.learner_id == learner_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        found
    }

    /// Appends a question to an in-progress session and returns its index.
    ///
    /// An empty skill tag set is normalized to the topic-derived synthetic
    /// id. Appends past `total_questions` are allowed but logged.
    pub async fn add_question_to_session(
        &self,
        session_id: &str,
        question_id: String,
        topic: String,
        difficulty: Difficulty,
        skill_ids: Vec<String>,
        content: QuestionContent,
        correct_answer: String,
    ) -> Result<usize, AppError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get(session_id)
            .ok_or_else(|| AppError::NotFound(format!("Session not found: {}", session_id)))?;
        if session.status.is_terminal() {
            return Err(AppError::Conflict(format!(
                "Session {} is no longer in progress",
                session_id
            )));
        }

        let mut updated = session.clone();
        if updated.questions.len() as u32 >= updated.total_questions {
            tracing::warn!(
                "Session {} already has its target of {} questions",
                session_id,
                updated.total_questions
            );
        }

        let skill_ids = if skill_ids.is_empty() {
            vec![topic_fallback_skill(&topic)]
        } else {
            skill_ids
        };

        let question = ExamQuestion {
            question_id,
            topic,
            difficulty,
            question_type: content.kind(),
            skill_ids,
            content,
            user_answer: None,
            correct_answer,
            is_correct: None,
            time_spent_seconds: None,
            answered_at: None,
        };
        updated.questions.push(question);
        let index = updated.questions.len() - 1;

        self.persist(&updated).await?;
        sessions.insert(session_id.to_string(), updated);
        Ok(index)
    }

    /// Scores an answer against the stored reference (exact, case-sensitive
    /// string match), persists the session, then forwards the attempt to the
    /// learner profile. Forwarding failures are logged and swallowed.
    ///
    /// A question can be answered once; resubmission is rejected.
    pub async fn submit_answer(
        &self,
        session_id: &str,
        question_index: usize,
        user_answer: &str,
        time_spent_seconds: Option<u32>,
    ) -> Result<SubmitAnswerResponse, AppError> {
        let (response, attempt, learner_id);
        {
            let mut sessions = self.sessions.write().await;
            let session = sessions
                .get(session_id)
                .ok_or_else(|| AppError::NotFound(format!("Session not found: {}", session_id)))?;
            if session.status.is_terminal() {
                return Err(AppError::Conflict(format!(
                    "Session {} is no longer in progress",
                    session_id
                )));
            }
            if question_index >= session.questions.len() {
                return Err(AppError::OutOfRange(format!(
                    "Question index {} out of range",
                    question_index
                )));
            }
            if session.questions[question_index].is_answered() {
                return Err(AppError::Conflict(format!(
                    "Question {} was already answered",
                    question_index
                )));
            }

            let mut updated = session.clone();
            let now = Utc::now();
            {
                let question = &mut updated.questions[question_index];
                question.user_answer = Some(user_answer.to_string());
                question.time_spent_seconds = time_spent_seconds;
                question.answered_at = Some(now);
                question.is_correct = Some(user_answer == question.correct_answer);
            }
            updated.current_question_index = question_index + 1;

            let question = &updated.questions[question_index];
            response = SubmitAnswerResponse {
                is_correct: question.is_correct == Some(true),
                correct_answer: question.correct_answer.clone(),
                rationale: question.content.rationale().to_string(),
            };
            attempt = QuestionAttempt {
                question_id: question.question_id.clone(),
                skill_ids: question.effective_skill_ids(),
                topic: question.topic.clone(),
                difficulty: question.difficulty,
                question_type: question.question_type,
                correct: question.is_correct == Some(true),
                timestamp: now,
                time_spent_seconds,
                exam_session_id: Some(session_id.to_string()),
            };
            learner_id = updated.learner_id.clone();

            self.persist(&updated).await?;
            sessions.insert(session_id.to_string(), updated);
        }

        // Best-effort: the session record of correctness is already durable.
        if let Err(e) = self.profiles.record_attempt(&learner_id, attempt).await {
            tracing::warn!(
                "Failed to record attempt for learner {} from session {}: {}",
                learner_id,
                session_id,
                e
            );
        }

        Ok(response)
    }

    /// Finalizes an in-progress session: stamps the end time, computes the
    /// score, transitions to completed and appends an exam record to the
    /// learner profile (best-effort). Completing twice is rejected.
    pub async fn complete_session(
        &self,
        session_id: &str,
    ) -> Result<CompleteSessionResponse, AppError> {
        let (response, record, learner_id);
        {
            let mut sessions = self.sessions.write().await;
            let session = sessions
                .get(session_id)
                .ok_or_else(|| AppError::NotFound(format!("Session not found: {}", session_id)))?;
            if session.status.is_terminal() {
                return Err(AppError::Conflict(format!(
                    "Session {} was already finalized",
                    session_id
                )));
            }

            let mut updated = session.clone();
            let end_time = Utc::now();
            updated.end_time = Some(end_time);
            updated.status = SessionStatus::Completed;

            let total = updated.questions.len() as u32;
            let correct = updated.correct_count();
            let score = updated.compute_score();
            updated.score = Some(score);

            let duration_minutes = round2(
                (end_time - updated.start_time).num_seconds() as f64 / 60.0,
            );

            let mut topics = BTreeSet::new();
            let mut skills = BTreeSet::new();
            for question in &updated.questions {
                topics.insert(question.topic.clone());
                for skill_id in question.effective_skill_ids() {
                    skills.insert(skill_id);
                }
            }

            record = ExamRecord {
                exam_id: session_id.to_string(),
                mode: updated.mode,
                total_questions: total,
                correct_answers: correct,
                score,
                duration_minutes,
                completed_at: end_time,
                topics_tested: topics.into_iter().collect(),
                skills_tested: skills.into_iter().collect(),
            };
            response = CompleteSessionResponse {
                score,
                correct,
                total,
                duration_minutes,
            };
            learner_id = updated.learner_id.clone();

            self.persist(&updated).await?;
            sessions.insert(session_id.to_string(), updated);
        }

        if let Err(e) = self
            .profiles
            .record_exam_completion(&learner_id, record)
            .await
        {
            tracing::warn!(
                "Failed to record exam completion for learner {} from session {}: {}",
                learner_id,
                session_id,
                e
            );
        }

        Ok(response)
    }

    /// Cross-tabulated correctness for a session.
    pub async fn get_session_summary(&self, session_id: &str) -> Result<SessionSummary, AppError> {
        Ok(self.get_session(session_id).await?.summary())
    }

    /// Difficulty the next question should use in adaptive mode.
    pub async fn get_adaptive_next_difficulty(
        &self,
        session_id: &str,
    ) -> Result<Difficulty, AppError> {
        Ok(self.get_session(session_id).await?.adaptive_next_difficulty())
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
