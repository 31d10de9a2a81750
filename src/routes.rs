// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{boss, challenge, character, health, realm},
    state::AppState,
};

/// Assembles the main application router.
///
/// * Realm catalogue, characters, attempts and bosses live under `/api`.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    let realm_routes = Router::new()
        .route("/", get(realm::list_realms))
        .route("/{realm_id}/challenges", get(realm::list_challenges));

    let challenge_routes = Router::new()
        .route("/{challenge_id}/start", post(challenge::start_challenge))
        .route("/{challenge_id}/submit", post(challenge::submit_answer))
        .route("/{challenge_id}/abandon", post(challenge::abandon_challenge))
        .route("/{challenge_id}/hints/{index}", get(challenge::get_hint))
        .route("/{challenge_id}/attempt", get(challenge::attempt_stats));

    let character_routes = Router::new()
        .route(
            "/",
            get(character::get_character).post(character::initialize_character),
        )
        .route("/realm", get(character::current_realm))
        .route("/level-up", post(character::level_up))
        .nest("/challenges", challenge_routes)
        .route(
            "/realms/{realm_id}/generate",
            post(challenge::generate_challenge),
        )
        .route(
            "/realms/{realm_id}/bosses/{boss_id}/start",
            post(boss::start_boss),
        )
        .route(
            "/realms/{realm_id}/bosses/{boss_id}/resolve",
            post(boss::resolve_boss),
        );

    Router::new()
        .route("/api/health", get(health::health))
        .route("/api/stats/attempts", get(challenge::tracker_summary))
        .route(
            "/api/challenges/{challenge_id}/score",
            post(challenge::score_answer),
        )
        .nest("/api/realms", realm_routes)
        .nest("/api/characters/{user_id}", character_routes)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
