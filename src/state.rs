// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::SqlitePool;

use crate::error::AppError;
use crate::ontology::SkillOntology;
use crate::recommend::RecommendationEngine;
use crate::store::{ExamSessionManager, ProfileStore};
use crate::tagger::QuestionTagger;

/// Shared handles to the core collaborators.
///
/// Everything is constructed once here and injected by reference; no
/// component reaches for a global registry.
#[derive(Clone)]
pub struct AppState {
    pub profiles: Arc<ProfileStore>,
    pub exams: Arc<ExamSessionManager>,
    pub ontology: Arc<SkillOntology>,
    pub tagger: Arc<QuestionTagger>,
    pub recommender: Arc<RecommendationEngine>,
}

impl AppState {
    /// Loads stores from the database and wires the collaborators.
    pub async fn build(pool: SqlitePool) -> Result<Self, AppError> {
        let ontology = Arc::new(SkillOntology::new());
        let tagger = Arc::new(QuestionTagger::new(ontology.clone()));
        let profiles = Arc::new(ProfileStore::load(pool.clone()).await?);
        let exams = Arc::new(ExamSessionManager::load(pool, profiles.clone()).await?);
        let recommender = Arc::new(RecommendationEngine::new(
            profiles.clone(),
            ontology.clone(),
        ));

        Ok(AppState {
            profiles,
            exams,
            ontology,
            tagger,
            recommender,
        })
    }
}

impl FromRef<AppState> for Arc<ProfileStore> {
    fn from_ref(state: &AppState) -> Self {
        state.profiles.clone()
    }
}

impl FromRef<AppState> for Arc<ExamSessionManager> {
    fn from_ref(state: &AppState) -> Self {
        state.exams.clone()
    }
}

impl FromRef<AppState> for Arc<SkillOntology> {
    fn from_ref(state: &AppState) -> Self {
        state.ontology.clone()
    }
}

impl FromRef<AppState> for Arc<QuestionTagger> {
    fn from_ref(state: &AppState) -> Self {
        state.tagger.clone()
    }
}

impl FromRef<AppState> for Arc<RecommendationEngine> {
    fn from_ref(state: &AppState) -> Self {
        state.recommender.clone()
    }
}
