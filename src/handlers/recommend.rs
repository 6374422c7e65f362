// src/handlers/recommend.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;

use crate::{error::AppError, recommend::RecommendationEngine};

const DEFAULT_THRESHOLD: f64 = 0.7;

#[derive(Debug, Deserialize)]
pub struct ThresholdParams {
    pub threshold: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct FocusedExamParams {
    pub num_questions: Option<u32>,
}

/// Merged topic and skill study recommendations.
pub async fn get_recommendations(
    State(recommender): State<Arc<RecommendationEngine>>,
    Path(learner_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let recommendations = recommender.get_recommended_topics(&learner_id).await?;
    Ok(Json(recommendations))
}

/// Everything the study dashboard needs in one payload.
pub async fn get_full_recommendations(
    State(recommender): State<Arc<RecommendationEngine>>,
    Path(learner_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let full = recommender
        .get_comprehensive_recommendations(&learner_id)
        .await?;
    Ok(Json(full))
}

pub async fn get_weak_skills(
    State(recommender): State<Arc<RecommendationEngine>>,
    Path(learner_id): Path<String>,
    Query(params): Query<ThresholdParams>,
) -> Result<impl IntoResponse, AppError> {
    let threshold = params.threshold.unwrap_or(DEFAULT_THRESHOLD);
    let weak = recommender.get_weak_skills(&learner_id, threshold).await?;
    Ok(Json(weak))
}

pub async fn get_weak_topics(
    State(recommender): State<Arc<RecommendationEngine>>,
    Path(learner_id): Path<String>,
    Query(params): Query<ThresholdParams>,
) -> Result<impl IntoResponse, AppError> {
    let threshold = params.threshold.unwrap_or(DEFAULT_THRESHOLD);
    let weak = recommender.get_weak_topics(&learner_id, threshold).await?;
    Ok(Json(weak))
}

pub async fn get_strong_topics(
    State(recommender): State<Arc<RecommendationEngine>>,
    Path(learner_id): Path<String>,
    Query(params): Query<ThresholdParams>,
) -> Result<impl IntoResponse, AppError> {
    let threshold = params.threshold.unwrap_or(DEFAULT_THRESHOLD);
    let strong = recommender.get_strong_topics(&learner_id, threshold).await?;
    Ok(Json(strong))
}

/// Question-distribution plan targeting the learner's weakest areas.
pub async fn generate_focused_exam(
    State(recommender): State<Arc<RecommendationEngine>>,
    Path(learner_id): Path<String>,
    Query(params): Query<FocusedExamParams>,
) -> Result<impl IntoResponse, AppError> {
    let num_questions = params.num_questions.unwrap_or(10);
    let plan = recommender
        .generate_focused_exam(&learner_id, num_questions)
        .await?;
    Ok(Json(plan))
}

/// Current and next milestone on the progression ladder.
pub async fn get_milestone(
    State(recommender): State<Arc<RecommendationEngine>>,
    Path(learner_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let milestone = recommender.get_next_milestone(&learner_id).await?;
    Ok(Json(milestone))
}
