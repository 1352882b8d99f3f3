use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::test_dto::{
    HistoryQuery, SaveAnswerRequest, SaveAnswerResponse, StartTestRequest, SubmitAnswerRequest,
    TestIdRequest,
};
use crate::dto::ApiResponse;
use crate::middleware::auth::Claims;
use crate::models::answer::AnswerCheck;
use crate::models::result::{HistoryEntry, TestResult};
use crate::models::test::{TestProgress, TestView};
use crate::AppState;

#[axum::debug_handler]
pub async fn start_test(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<StartTestRequest>, JsonRejection>,
) -> crate::error::Result<ApiResponse<TestView>> {
    let Json(req) = payload?;
    req.validate()?;
    let test = state
        .test_service
        .start(claims.sub, &req.subject, &req.topic, req.question_count)
        .await?;
    Ok(ApiResponse::with_message(test.to_view(), "Test started"))
}

#[axum::debug_handler]
pub async fn save_answer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<SaveAnswerRequest>, JsonRejection>,
) -> crate::error::Result<ApiResponse<SaveAnswerResponse>> {
    let Json(req) = payload?;
    let answer = state
        .test_service
        .save_answer(claims.sub, req.test_id, req.question_index, &req.user_answers)
        .await?;
    Ok(ApiResponse::ok(SaveAnswerResponse {
        saved: true,
        question_index: answer.question_index,
        selected: answer.selected,
    }))
}

/// Saves an answer and grades that question immediately.
#[axum::debug_handler]
pub async fn submit_answer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<SubmitAnswerRequest>, JsonRejection>,
) -> crate::error::Result<ApiResponse<AnswerCheck>> {
    let Json(req) = payload?;
    let keys = req.user_answers.into_keys();
    let check = state
        .test_service
        .submit_answer(claims.sub, req.test_id, req.question_index, &keys)
        .await?;
    Ok(ApiResponse::ok(check))
}

#[axum::debug_handler]
pub async fn finish_test(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<TestIdRequest>, JsonRejection>,
) -> crate::error::Result<ApiResponse<TestResult>> {
    let Json(req) = payload?;
    let result = state.test_service.finish(claims.sub, req.test_id).await?;
    Ok(ApiResponse::with_message(result, "Test finished"))
}

#[axum::debug_handler]
pub async fn retake_test(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<TestIdRequest>, JsonRejection>,
) -> crate::error::Result<ApiResponse<TestView>> {
    let Json(req) = payload?;
    let test = state.test_service.retake(claims.sub, req.test_id).await?;
    Ok(ApiResponse::with_message(test.to_view(), "Retake started"))
}

#[axum::debug_handler]
pub async fn get_test(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    id: Result<Path<Uuid>, PathRejection>,
) -> crate::error::Result<ApiResponse<TestProgress>> {
    let Path(id) = id?;
    let progress = state.test_service.status(claims.sub, id).await?;
    Ok(ApiResponse::ok(progress))
}

#[axum::debug_handler]
pub async fn get_result(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    id: Result<Path<Uuid>, PathRejection>,
) -> crate::error::Result<ApiResponse<TestResult>> {
    let Path(id) = id?;
    let result = state.test_service.result(claims.sub, id).await?;
    Ok(ApiResponse::ok(result))
}

#[axum::debug_handler]
pub async fn history(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> crate::error::Result<ApiResponse<Vec<HistoryEntry>>> {
    let Query(query) = query?;
    let entries = state.test_service.history(claims.sub, query.limit).await?;
    Ok(ApiResponse::ok(entries))
}
