// tests/api_tests.rs

use clinprep_backend::{routes, state::AppState};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
async fn spawn_app() -> String {
    // Each test run gets its own throwaway database file.
    let db_path = std::env::temp_dir().join(format!("clinprep-test-{}.db", uuid::Uuid::new_v4()));
    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))
        .expect("invalid sqlite URL")
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("Failed to open test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let state = AppState::build(pool)
        .await
        .expect("Failed to build application state");
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

#[tokio::test]
async fn health_check_404() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Act
    let response = client
        .get(&format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn create_learner_works() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(&format!("{}/api/learner/create", address))
        .json(&serde_json::json!({
            "learner_id": "nurse_01",
            "name": "Dana Reyes",
            "role": "ICU Nurse"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 201);
    let profile: serde_json::Value = response.json().await.unwrap();
    assert_eq!(profile["learner_id"], "nurse_01");
    assert_eq!(profile["role"], "ICU Nurse");
    assert_eq!(profile["attempts"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn create_learner_fails_validation() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Act: empty learner id
    let response = client
        .post(&format!("{}/api/learner/create", address))
        .json(&serde_json::json!({
            "learner_id": "",
            "name": "Dana Reyes",
            "role": "ICU Nurse"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn create_learner_is_idempotent_by_id() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    for name in ["Dana Reyes", "Somebody Else"] {
        let response = client
            .post(&format!("{}/api/learner/create", address))
            .json(&serde_json::json!({
                "learner_id": "nurse_01",
                "name": name,
                "role": "ICU Nurse"
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 201);
    }

    // The second create did not overwrite the first registration.
    let profile: serde_json::Value = client
        .get(&format!("{}/api/learner/nurse_01", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(profile["name"], "Dana Reyes");
}

#[tokio::test]
async fn unknown_learner_is_404() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(&format!("{}/api/learner/ghost", address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    // Recording against a missing profile surfaces the same error.
    let response = client
        .post(&format!("{}/api/learner/ghost/attempt", address))
        .json(&serde_json::json!({
            "question_id": "q1",
            "skill_ids": ["skill_sepsis_recognition"],
            "topic": "sepsis",
            "difficulty": "intermediate",
            "question_type": "mcq",
            "correct": true
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn attempts_drive_performance_and_radar() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    client
        .post(&format!("{}/api/learner/create", address))
        .json(&serde_json::json!({
            "learner_id": "nurse_02",
            "name": "Ira Okafor",
            "role": "Registered Nurse"
        }))
        .send()
        .await
        .unwrap();

    // 4 of 5 correct on one skill.
    for i in 0..5 {
        let response = client
            .post(&format!("{}/api/learner/nurse_02/attempt", address))
            .json(&serde_json::json!({
                "question_id": format!("q{}", i),
                "skill_ids": ["skill_sepsis_recognition"],
                "topic": "Sepsis",
                "difficulty": "intermediate",
                "question_type": "mcq",
                "correct": i != 0,
                "time_spent_seconds": 42
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
    }

    let report: serde_json::Value = client
        .get(&format!("{}/api/learner/nurse_02/performance", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(report["total_questions"], 5);
    assert_eq!(report["correct_questions"], 4);
    assert_eq!(report["overall_accuracy"], 80.0);
    assert_eq!(report["topics_practiced"], 1);
    let perf = &report["skill_performance"]["skill_sepsis_recognition"];
    assert_eq!(perf["total_attempts"], 5);
    assert_eq!(perf["proficiency_level"], "advanced");

    // Radar projects untracked skills to zero.
    let radar: serde_json::Value = client
        .get(&format!(
            "{}/api/learner/nurse_02/radar?skill_ids=skill_sepsis_recognition,skill_vent_setup",
            address
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(radar["data"][0], 80.0);
    assert_eq!(radar["data"][1], 0.0);
}

#[tokio::test]
async fn untagged_attempt_gets_synthetic_skill() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    client
        .post(&format!("{}/api/learner/create", address))
        .json(&serde_json::json!({
            "learner_id": "nurse_03",
            "name": "Sam Liu",
            "role": "Emergency Room Nurse"
        }))
        .send()
        .await
        .unwrap();

    client
        .post(&format!("{}/api/learner/nurse_03/attempt", address))
        .json(&serde_json::json!({
            "question_id": "q1",
            "skill_ids": [],
            "topic": "Wound Care",
            "difficulty": "beginner",
            "question_type": "mcq",
            "correct": true
        }))
        .send()
        .await
        .unwrap();

    let profile: serde_json::Value = client
        .get(&format!("{}/api/learner/nurse_03", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(profile["attempts"][0]["skill_ids"][0], "topic_wound_care");
    assert!(profile["skill_performance"]["topic_wound_care"].is_object());
}

#[tokio::test]
async fn skill_catalog_endpoints_work() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let skills: Vec<serde_json::Value> = client
        .get(&format!("{}/api/skills/", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(skills.iter().any(|s| s["id"] == "skill_ards_recognition"));

    // Role filter narrows the catalog.
    let rn_skills: Vec<serde_json::Value> = client
        .get(&format!("{}/api/skills/?role=Registered%20Nurse", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(rn_skills.len() < skills.len());

    let skill: serde_json::Value = client
        .get(&format!("{}/api/skills/skill_vent_setup", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(skill["category"], "Technical Skills");

    let missing = client
        .get(&format!("{}/api/skills/skill_unknown", address))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 404);

    let tree: serde_json::Value = client
        .get(&format!("{}/api/skills/tree", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(tree["Clinical Assessment"].as_array().unwrap().len() >= 2);

    let competencies: Vec<serde_json::Value> = client
        .get(&format!("{}/api/skills/competencies", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(competencies.len(), 2);
}

#[tokio::test]
async fn tag_preview_scores_keyword_overlap() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let tags: Vec<serde_json::Value> = client
        .post(&format!("{}/api/skills/tag", address))
        .json(&serde_json::json!({
            "topic": "sepsis",
            "content": {
                "question_type": "mcq",
                "scenario": "A patient with a urinary infection becomes hypotensive; sepsis is suspected.",
                "question": "Which action is first?",
                "options": {"A": "Fluids", "B": "Wait"},
                "correct_answer": "A",
                "rationale": "Early fluids are part of the bundle."
            }
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert!(tags.iter().any(|t| t["skill_id"] == "skill_sepsis_recognition"));
    for tag in &tags {
        assert!(tag["confidence"].as_f64().unwrap() > 0.3);
    }
}
