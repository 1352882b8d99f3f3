use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::study_dto::{
    ExerciseRequest, ExerciseSet, FlashcardRequest, ProfileUpdateRequest, SchoolContextRequest,
};
use crate::dto::ApiResponse;
use crate::middleware::auth::Claims;
use crate::models::flashcard::FlashcardSet;
use crate::models::profile::LearningProfile;
use crate::models::school_context::SchoolContext;
use crate::services::study_service::ProfileUpdate;
use crate::AppState;

#[axum::debug_handler]
pub async fn set_school_context(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<SchoolContextRequest>, JsonRejection>,
) -> crate::error::Result<ApiResponse<SchoolContext>> {
    let Json(req) = payload?;
    req.validate()?;
    let context = state
        .study_service
        .set_school_context(claims.sub, req.into())
        .await?;
    Ok(ApiResponse::with_message(context, "School context saved"))
}

#[axum::debug_handler]
pub async fn get_school_context(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> crate::error::Result<ApiResponse<Option<SchoolContext>>> {
    let context = state.study_service.get_school_context(claims.sub).await?;
    Ok(ApiResponse::ok(context))
}

#[axum::debug_handler]
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<ProfileUpdateRequest>, JsonRejection>,
) -> crate::error::Result<ApiResponse<SchoolContext>> {
    let Json(req) = payload?;
    req.validate()?;
    let context = state
        .study_service
        .update_profile(
            claims.sub,
            ProfileUpdate {
                grade: req.grade,
                school_type: req.school_type,
                state: req.state,
            },
        )
        .await?;
    Ok(ApiResponse::with_message(context, "Profile updated"))
}

#[axum::debug_handler]
pub async fn profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> crate::error::Result<ApiResponse<LearningProfile>> {
    let profile = state.study_service.learning_profile(claims.sub).await?;
    Ok(ApiResponse::ok(profile))
}

#[axum::debug_handler]
pub async fn generate_exercises(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<ExerciseRequest>, JsonRejection>,
) -> crate::error::Result<ApiResponse<ExerciseSet>> {
    let Json(req) = payload?;
    req.validate()?;
    let exercises = state
        .study_service
        .generate_exercises(claims.sub, &req.subject, &req.topic, req.count)
        .await?;
    let message = format!("{} exercises generated", exercises.len());
    Ok(ApiResponse::with_message(
        ExerciseSet {
            subject: req.subject,
            topic: req.topic,
            exercises,
        },
        message,
    ))
}

#[axum::debug_handler]
pub async fn create_flashcards(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<FlashcardRequest>, JsonRejection>,
) -> crate::error::Result<ApiResponse<FlashcardSet>> {
    let Json(req) = payload?;
    req.validate()?;
    let set = state
        .study_service
        .create_flashcards(claims.sub, &req.subject, &req.topic, req.count)
        .await?;
    Ok(ApiResponse::ok(set))
}

#[axum::debug_handler]
pub async fn list_flashcards(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> crate::error::Result<ApiResponse<Vec<FlashcardSet>>> {
    let sets = state.study_service.list_flashcards(claims.sub).await?;
    Ok(ApiResponse::ok(sets))
}

#[axum::debug_handler]
pub async fn get_flashcards(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    id: Result<Path<Uuid>, PathRejection>,
) -> crate::error::Result<ApiResponse<FlashcardSet>> {
    let Path(id) = id?;
    let set = state.study_service.get_flashcards(claims.sub, id).await?;
    Ok(ApiResponse::ok(set))
}
