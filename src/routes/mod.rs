pub mod auth;
pub mod health;
pub mod study;
pub mod test_routes;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, patch, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::auth::require_bearer_auth;
use crate::middleware::rate_limit::{rps_middleware, RateLimiter};
use crate::AppState;

const MAX_BODY_BYTES: usize = 1024 * 1024;

pub fn app_router(state: AppState) -> Router {
    let limiter = RateLimiter::new(state.config.generation_rps);
    let limited = from_fn_with_state(limiter, rps_middleware);

    let public_api = Router::new()
        .route("/api/health", get(health::health))
        .route("/api/register", post(auth::register))
        .route("/api/login", post(auth::login));

    let protected_api = Router::new()
        .route("/api/check-auth", get(auth::check_auth))
        .route("/api/set-school-context", post(study::set_school_context))
        .route("/api/school-context", get(study::get_school_context))
        .route("/api/update-profile", patch(study::update_profile))
        .route("/api/profile", get(study::profile))
        .route(
            "/api/generate-exercises",
            post(study::generate_exercises).route_layer(limited.clone()),
        )
        .route(
            "/api/flashcards",
            post(study::create_flashcards)
                .route_layer(limited.clone())
                .get(study::list_flashcards),
        )
        .route("/api/flashcards/:id", get(study::get_flashcards))
        .route(
            "/api/start-test",
            post(test_routes::start_test).route_layer(limited),
        )
        .route("/api/save-answer", post(test_routes::save_answer))
        .route("/api/submit-answer", post(test_routes::submit_answer))
        .route("/api/submit-answer-multiple", post(test_routes::submit_answer))
        .route("/api/finish-test", post(test_routes::finish_test))
        .route("/api/retake-test", post(test_routes::retake_test))
        .route("/api/tests/:id", get(test_routes::get_test))
        .route("/api/test-results/:id", get(test_routes::get_result))
        .route("/api/test-history", get(test_routes::history))
        .route_layer(from_fn_with_state(state.clone(), require_bearer_auth));

    public_api
        .merge(protected_api)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}
