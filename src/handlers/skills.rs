// src/handlers/skills.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;

use crate::{
    error::AppError,
    models::question::QuestionContent,
    models::skill::{ClinicalRole, Skill, SkillCategory},
    ontology::SkillOntology,
    tagger::QuestionTagger,
};

#[derive(Debug, Deserialize)]
pub struct ListSkillsParams {
    pub role: Option<ClinicalRole>,
    pub category: Option<SkillCategory>,
}

/// Lists catalog skills, optionally filtered by role and category.
pub async fn list_skills(
    State(ontology): State<Arc<SkillOntology>>,
    Query(params): Query<ListSkillsParams>,
) -> Result<impl IntoResponse, AppError> {
    let skills: Vec<Skill> = ontology
        .all_skills()
        .into_iter()
        .filter(|s| params.role.map_or(true, |role| s.required_roles.contains(&role)))
        .filter(|s| params.category.map_or(true, |category| s.category == category))
        .cloned()
        .collect();
    Ok(Json(skills))
}

pub async fn get_skill(
    State(ontology): State<Arc<SkillOntology>>,
    Path(skill_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let skill = ontology
        .get_skill(&skill_id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("Skill not found: {}", skill_id)))?;
    Ok(Json(skill))
}

/// Category-grouped view of the whole catalog.
pub async fn get_skill_tree(
    State(ontology): State<Arc<SkillOntology>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(ontology.skill_tree()))
}

pub async fn list_competencies(
    State(ontology): State<Arc<SkillOntology>>,
) -> Result<impl IntoResponse, AppError> {
    let competencies: Vec<_> = ontology
        .all_competencies()
        .into_iter()
        .cloned()
        .collect();
    Ok(Json(competencies))
}

pub async fn get_competency(
    State(ontology): State<Arc<SkillOntology>>,
    Path(comp_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let competency = ontology
        .get_competency(&comp_id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("Competency not found: {}", comp_id)))?;
    Ok(Json(competency))
}

#[derive(Debug, Deserialize)]
pub struct TagPreviewRequest {
    pub topic: String,
    pub content: QuestionContent,
}

/// Previews the skill tags the auto-tagger would assign to a question.
pub async fn tag_question(
    State(tagger): State<Arc<QuestionTagger>>,
    Json(payload): Json<TagPreviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    let tags = tagger.tag(&payload.topic, &payload.content);
    Ok(Json(tags))
}
