mod common;

use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use common::{register_and_login, send, setup_app, setup_app_with, test_config};

#[tokio::test]
async fn health_is_public() {
    let app = setup_app(true);
    let (status, body) = send(&app, "GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn protected_routes_require_token() {
    let app = setup_app(true);

    let (status, body) = send(&app, "GET", "/api/test-history", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = send(&app, "GET", "/api/check-auth", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = register_and_login(&app, "mia").await;
    let (status, body) = send(&app, "GET", "/api/check-auth", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["authenticated"], true);
    assert_eq!(body["data"]["username"], "mia");
}

#[tokio::test]
async fn register_rejects_invalid_and_duplicate_users() {
    let app = setup_app(true);

    let (status, body) = send(
        &app,
        "POST",
        "/api/register",
        None,
        Some(json!({"username": "mi", "email": "not-an-email", "password": "123"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    register_and_login(&app, "mia").await;
    let (status, _) = send(
        &app,
        "POST",
        "/api/register",
        None,
        Some(json!({"username": "mia", "email": "mia2@example.com", "password": "secret123"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/api/login",
        None,
        Some(json!({"username": "mia", "password": "wrong-password"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn full_test_lifecycle() {
    let app = setup_app(true);
    let token = register_and_login(&app, "mia").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/start-test",
        Some(&token),
        Some(json!({"subject": "Math", "topic": "Fractions", "question_count": 3})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let test = &body["data"];
    assert_eq!(test["status"], "in_progress");
    assert_eq!(test["total_questions"], 3);
    assert_eq!(test["time_limit_seconds"], 180);
    assert_eq!(test["questions"].as_array().unwrap().len(), 3);
    assert!(test["questions"][0].get("correct_answers").is_none());
    assert_eq!(test["questions"][1]["multiple_correct"], true);
    let test_id = test["test_id"].as_str().unwrap().to_string();

    for (index, answers) in [(0, json!(["A"])), (1, json!(["C", "B"])), (2, json!(["B"]))] {
        let (status, body) = send(
            &app,
            "POST",
            "/api/save-answer",
            Some(&token),
            Some(json!({"test_id": test_id, "question_index": index, "user_answers": answers})),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["data"]["saved"], true);
    }

    let (status, body) = send(&app, "GET", &format!("/api/tests/{}", test_id), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["answered_count"], 3);

    let (status, body) = send(
        &app,
        "POST",
        "/api/finish-test",
        Some(&token),
        Some(json!({"test_id": test_id})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let result = body["data"].clone();
    assert_eq!(result["score"], 66.7);
    assert_eq!(result["correct_count"], 2);
    assert_eq!(result["incorrect_count"], 1);
    assert_eq!(result["performance_tier"], "average");
    assert_eq!(result["feedback_generated"], true);
    assert_eq!(result["outcomes"][1]["selected"], json!(["B", "C"]));
    assert_eq!(result["outcomes"][2]["is_correct"], false);

    let (status, body) = send(
        &app,
        "POST",
        "/api/finish-test",
        Some(&token),
        Some(json!({"test_id": test_id})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], result);

    let (status, body) = send(
        &app,
        "POST",
        "/api/save-answer",
        Some(&token),
        Some(json!({"test_id": test_id, "question_index": 2, "user_answers": ["A"]})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_state");

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/test-results/{}", test_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["score"], 66.7);

    let (status, body) = send(
        &app,
        "POST",
        "/api/retake-test",
        Some(&token),
        Some(json!({"test_id": test_id})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let retake_id = body["data"]["test_id"].as_str().unwrap().to_string();
    assert_ne!(retake_id, test_id);
    assert_eq!(body["data"]["status"], "in_progress");
    assert_eq!(body["data"]["questions"][0]["question"], "Fractions question 1");

    for (index, answers) in [(0, json!(["A"])), (1, json!(["B", "C"])), (2, json!(["A"]))] {
        send(
            &app,
            "POST",
            "/api/save-answer",
            Some(&token),
            Some(json!({"test_id": retake_id, "question_index": index, "answers": answers})),
        )
        .await;
    }
    let (_, body) = send(
        &app,
        "POST",
        "/api/finish-test",
        Some(&token),
        Some(json!({"test_id": retake_id})),
    )
    .await;
    assert_eq!(body["data"]["score"], 100.0);
    assert_eq!(body["data"]["performance_tier"], "excellent");

    let (status, body) = send(&app, "GET", "/api/test-history?limit=5", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let history = body["data"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["test_id"], retake_id.as_str());
    assert_eq!(history[1]["correct_answers"], 2);
    assert_eq!(history[1]["total_questions"], 3);

    let (_, body) = send(&app, "GET", "/api/profile", Some(&token), None).await;
    assert_eq!(body["data"]["tests_taken"], 2);
    assert_eq!(body["data"]["strongest_subject"], "Math");
}

#[tokio::test]
async fn invalid_answers_are_rejected() {
    let app = setup_app(true);
    let token = register_and_login(&app, "leo").await;

    let (_, body) = send(
        &app,
        "POST",
        "/api/start-test",
        Some(&token),
        Some(json!({"subject": "Biology", "topic": "Cells", "count": 2})),
    )
    .await;
    let test_id = body["data"]["test_id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "POST",
        "/api/save-answer",
        Some(&token),
        Some(json!({"test_id": test_id, "question_index": 5, "user_answers": ["A"]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, _) = send(
        &app,
        "POST",
        "/api/save-answer",
        Some(&token),
        Some(json!({"test_id": test_id, "question_index": 0, "user_answers": ["X"]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/api/start-test",
        Some(&token),
        Some(json!({"subject": "Biology", "topic": "Cells", "question_count": 50})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "POST",
        "/api/finish-test",
        Some(&token),
        Some(json!({"test_id": Uuid::new_v4()})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, body) = send(
        &app,
        "POST",
        "/api/finish-test",
        Some(&token),
        Some(json!({"wrong": "shape"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn tests_are_invisible_to_other_users() {
    let app = setup_app(true);
    let owner = register_and_login(&app, "mia").await;
    let stranger = register_and_login(&app, "leo").await;

    let (_, body) = send(
        &app,
        "POST",
        "/api/start-test",
        Some(&owner),
        Some(json!({"subject": "Math", "topic": "Fractions", "question_count": 1})),
    )
    .await;
    let test_id = body["data"]["test_id"].as_str().unwrap().to_string();

    let (status, _) = send(&app, "GET", &format!("/api/tests/{}", test_id), Some(&stranger), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "POST",
        "/api/save-answer",
        Some(&stranger),
        Some(json!({"test_id": test_id, "question_index": 0, "user_answers": ["A"]})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn feedback_outage_still_produces_result() {
    let app = setup_app(false);
    let token = register_and_login(&app, "mia").await;

    let (_, body) = send(
        &app,
        "POST",
        "/api/start-test",
        Some(&token),
        Some(json!({"subject": "Math", "topic": "Fractions", "question_count": 1})),
    )
    .await;
    let test_id = body["data"]["test_id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "POST",
        "/api/finish-test",
        Some(&token),
        Some(json!({"test_id": test_id})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["score"], 0.0);
    assert_eq!(body["data"]["performance_tier"], "poor");
    assert_eq!(body["data"]["feedback_generated"], false);
    assert!(body["data"]["feedback"]["overall_assessment"]
        .as_str()
        .unwrap()
        .contains("0 of 1"));
}

#[tokio::test]
async fn submit_answer_reports_correctness_right_away() {
    let app = setup_app(true);
    let token = register_and_login(&app, "mia").await;

    let (_, body) = send(
        &app,
        "POST",
        "/api/start-test",
        Some(&token),
        Some(json!({"subject": "Math", "topic": "Fractions", "question_count": 3})),
    )
    .await;
    let test_id = body["data"]["test_id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "POST",
        "/api/submit-answer",
        Some(&token),
        Some(json!({"test_id": test_id, "question_index": 0, "user_answer": "a"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["is_correct"], true);
    assert_eq!(body["data"]["score"], 1.0);
    assert_eq!(body["data"]["feedback"], "All correct answers selected!");

    let (status, body) = send(
        &app,
        "POST",
        "/api/submit-answer-multiple",
        Some(&token),
        Some(json!({"test_id": test_id, "question_index": 1, "user_answers": ["B", "D"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["is_correct"], false);
    assert_eq!(body["data"]["score"], 0.5);
    assert_eq!(body["data"]["correct_answers"], json!(["B", "C"]));
    assert_eq!(body["data"]["explanation"], "Worked solution");
    assert_eq!(body["data"]["feedback"], "1 of 2 correct answers found.");

    let (_, body) = send(
        &app,
        "POST",
        "/api/finish-test",
        Some(&token),
        Some(json!({"test_id": test_id})),
    )
    .await;
    assert_eq!(body["data"]["correct_count"], 1);
    assert_eq!(body["data"]["outcomes"][1]["selected"], json!(["B", "D"]));

    let (status, body) = send(
        &app,
        "POST",
        "/api/submit-answer",
        Some(&token),
        Some(json!({"test_id": test_id, "question_index": 2, "user_answer": "A"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_state");
}

#[tokio::test]
async fn malformed_path_and_query_use_the_error_envelope() {
    let app = setup_app(true);
    let token = register_and_login(&app, "mia").await;

    for uri in ["/api/tests/not-a-uuid", "/api/test-results/42", "/api/flashcards/abc"] {
        let (status, body) = send(&app, "GET", uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "validation_error");
        assert!(!body["message"].as_str().unwrap().is_empty());
    }

    let (status, body) = send(&app, "GET", "/api/test-history?limit=abc", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn generation_endpoints_are_rate_limited() {
    let mut config = test_config();
    config.generation_rps = 1;
    let app = setup_app_with(config, true);
    let token = register_and_login(&app, "mia").await;

    let mut limited = None;
    for _ in 0..3 {
        let (status, body) = send(
            &app,
            "POST",
            "/api/start-test",
            Some(&token),
            Some(json!({"subject": "Math", "topic": "Fractions", "question_count": 1})),
        )
        .await;
        if status == StatusCode::TOO_MANY_REQUESTS {
            limited = Some(body);
            break;
        }
        assert_eq!(status, StatusCode::OK, "{}", body);
    }

    let body = limited.expect("third request within one window is limited");
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "rate_limited");
    assert_eq!(body["retryable"], true);

    let (status, _) = send(&app, "GET", "/api/test-history", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
}
