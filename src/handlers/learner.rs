// src/handlers/learner.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    models::profile::{CreateLearnerRequest, RecordAttemptRequest},
    store::{ExamSessionManager, ProfileStore},
};

/// Registers a learner profile.
///
/// Creating an id that already exists returns the existing profile
/// unchanged rather than failing.
pub async fn create_learner(
    State(profiles): State<Arc<ProfileStore>>,
    Json(payload): Json<CreateLearnerRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let profile = profiles
        .create_profile(&payload.learner_id, &payload.name, payload.role)
        .await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

pub async fn get_learner(
    State(profiles): State<Arc<ProfileStore>>,
    Path(learner_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let profile = profiles.get_profile(&learner_id).await?;
    Ok(Json(profile))
}

/// Records a standalone attempt (one made outside an exam session).
pub async fn record_attempt(
    State(profiles): State<Arc<ProfileStore>>,
    Path(learner_id): Path<String>,
    Json(payload): Json<RecordAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    profiles
        .record_attempt(&learner_id, payload.into_attempt())
        .await?;
    Ok(Json(json!({ "success": true })))
}

/// Full performance dashboard for a learner.
pub async fn get_performance(
    State(profiles): State<Arc<ProfileStore>>,
    Path(learner_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let report = profiles.get_all_performance_data(&learner_id).await?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct RadarParams {
    /// Comma-separated skill ids.
    pub skill_ids: String,
}

/// Accuracy percentages for the requested skills, for radar charts.
/// Skills the learner has not attempted project to zero.
pub async fn get_radar(
    State(profiles): State<Arc<ProfileStore>>,
    Path(learner_id): Path<String>,
    Query(params): Query<RadarParams>,
) -> Result<impl IntoResponse, AppError> {
    let skill_ids: Vec<String> = params
        .skill_ids
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let data = profiles.get_radar_chart_data(&learner_id, &skill_ids).await?;
    Ok(Json(data))
}

/// Most recent completed exams, newest first.
pub async fn get_exam_history(
    State(profiles): State<Arc<ProfileStore>>,
    Path(learner_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let exams = profiles.get_exam_history(&learner_id, 10).await?;
    Ok(Json(json!({ "exams": exams })))
}

/// All exam sessions started by a learner, newest first.
pub async fn get_sessions(
    State(exams): State<Arc<ExamSessionManager>>,
    Path(learner_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let sessions = exams.get_learner_sessions(&learner_id).await;
    Ok(Json(sessions))
}
