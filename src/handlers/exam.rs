// src/handlers/exam.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    models::session::{
        AddQuestionRequest, CreateSessionRequest, Difficulty, ExamMode, SubmitAnswerRequest,
    },
    state::AppState,
    store::ExamSessionManager,
};

/// Starts an exam session.
pub async fn create_exam(
    State(exams): State<Arc<ExamSessionManager>>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let session = exams
        .create_session(
            &payload.learner_id,
            payload.mode,
            payload.total_questions,
            payload.time_limit_minutes,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "session_id": session.session_id,
            "mode": session.mode,
            "total_questions": session.total_questions,
            "time_limit_minutes": session.time_limit_minutes,
            "focus_skills": payload.focus_skills,
        })),
    ))
}

pub async fn get_exam(
    State(exams): State<Arc<ExamSessionManager>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let session = exams.get_session(&session_id).await?;
    Ok(Json(json!({ "success": true, "session": session })))
}

/// Appends a question to a session.
///
/// In adaptive mode the difficulty is chosen from recent performance and
/// overrides the requested one. Questions arriving without skill tags are
/// run through the auto-tagger; if that also yields nothing, the session
/// manager falls back to a topic-derived synthetic id.
pub async fn add_question(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(payload): Json<AddQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let session = state.exams.get_session(&session_id).await?;

    let difficulty = if session.mode == ExamMode::Adaptive {
        state.exams.get_adaptive_next_difficulty(&session_id).await?
    } else {
        payload.difficulty.unwrap_or(Difficulty::Intermediate)
    };

    let mut skill_tags = Vec::new();
    let mut skill_ids = payload.skill_ids;
    if skill_ids.is_empty() {
        skill_tags = state.tagger.tag(&payload.topic, &payload.content);
        skill_ids = skill_tags.iter().map(|t| t.skill_id.clone()).collect();
    }

    let correct_answer = payload
        .correct_answer
        .or_else(|| payload.content.default_correct_answer())
        .ok_or_else(|| {
            AppError::BadRequest("correct_answer is required for this question type".to_string())
        })?;

    let question_id = payload
        .question_id
        .unwrap_or_else(|| format!("q_{}_{}", session_id, session.questions.len() + 1));

    let question_index = state
        .exams
        .add_question_to_session(
            &session_id,
            question_id.clone(),
            payload.topic,
            difficulty,
            skill_ids,
            payload.content,
            correct_answer,
        )
        .await?;

    Ok(Json(json!({
        "success": true,
        "question_index": question_index,
        "question_id": question_id,
        "difficulty": difficulty,
        "skill_tags": skill_tags,
    })))
}

/// Scores an answer for one question of the session.
pub async fn submit_answer(
    State(exams): State<Arc<ExamSessionManager>>,
    Path(session_id): Path<String>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let result = exams
        .submit_answer(
            &session_id,
            payload.question_index,
            &payload.user_answer,
            payload.time_spent_seconds,
        )
        .await?;

    Ok(Json(json!({
        "success": true,
        "is_correct": result.is_correct,
        "correct_answer": result.correct_answer,
        "rationale": result.rationale,
    })))
}

/// Finalizes a session and reports the score.
pub async fn complete_exam(
    State(exams): State<Arc<ExamSessionManager>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let result = exams.complete_session(&session_id).await?;

    Ok(Json(json!({
        "success": true,
        "score": result.score,
        "correct": result.correct,
        "total": result.total,
        "duration_minutes": result.duration_minutes,
    })))
}

/// Correctness broken down by difficulty, skill and topic.
pub async fn get_summary(
    State(exams): State<Arc<ExamSessionManager>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let summary = exams.get_session_summary(&session_id).await?;
    Ok(Json(summary))
}
