// src/routes.rs

use axum::{
    Router, http::Method,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{exam, learner, recommend, skills},
    state::AppState,
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (learner, exam, skills).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (stores, ontology, tagger, recommender).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let learner_routes = Router::new()
        .route("/create", post(learner::create_learner))
        .route("/{learner_id}", get(learner::get_learner))
        .route("/{learner_id}/attempt", post(learner::record_attempt))
        .route("/{learner_id}/performance", get(learner::get_performance))
        .route("/{learner_id}/radar", get(learner::get_radar))
        .route("/{learner_id}/exams", get(learner::get_exam_history))
        .route("/{learner_id}/sessions", get(learner::get_sessions))
        // Recommendation surface, derived from the profile store
        .route("/{learner_id}/recommendations", get(recommend::get_recommendations))
        .route(
            "/{learner_id}/recommendations/full",
            get(recommend::get_full_recommendations),
        )
        .route("/{learner_id}/weak-skills", get(recommend::get_weak_skills))
        .route("/{learner_id}/weak-topics", get(recommend::get_weak_topics))
        .route("/{learner_id}/strong-topics", get(recommend::get_strong_topics))
        .route("/{learner_id}/focused-exam", post(recommend::generate_focused_exam))
        .route("/{learner_id}/milestone", get(recommend::get_milestone));

    let exam_routes = Router::new()
        .route("/create", post(exam::create_exam))
        .route("/{session_id}", get(exam::get_exam))
        .route("/{session_id}/question", post(exam::add_question))
        .route("/{session_id}/submit", post(exam::submit_answer))
        .route("/{session_id}/complete", post(exam::complete_exam))
        .route("/{session_id}/summary", get(exam::get_summary));

    let skills_routes = Router::new()
        .route("/", get(skills::list_skills))
        .route("/tree", get(skills::get_skill_tree))
        .route("/competencies", get(skills::list_competencies))
        .route("/competencies/{comp_id}", get(skills::get_competency))
        .route("/tag", post(skills::tag_question))
        .route("/{skill_id}", get(skills::get_skill));

    Router::new()
        .nest("/api/learner", learner_routes)
        .nest("/api/exam", exam_routes)
        .nest("/api/skills", skills_routes)
        // axum 0.8 nesting matches the skills catalog at `/api/skills` but not the
        // trailing-slash form `/api/skills/`; register the latter explicitly so the
        // intended catalog endpoint is reachable at both paths.
        .route("/api/skills/", get(skills::list_skills))
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
