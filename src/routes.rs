// src/routes.rs

use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{
    catch_panic::CatchPanicLayer, cors::CorsLayer, set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::{
    config::Config,
    error::{expose_internal_errors, panic_response, rate_limit_envelope},
    handlers::{courses, questions, sessions, system},
    state::AppState,
};

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ACCEPT,
            header::AUTHORIZATION,
            header::CACHE_CONTROL,
            header::CONTENT_TYPE,
        ])
}

/// Per-IP rate limiting for `/api`. Needs the server to provide `ConnectInfo<SocketAddr>`.
fn rate_limited(api: Router<AppState>, config: &Config) -> Router<AppState> {
    if !config.rate_limit_enabled() {
        return api;
    }

    let governor_conf = GovernorConfigBuilder::default()
        .per_second(config.rate_limit_per_second)
        .burst_size(config.rate_limit_burst)
        .finish();

    match governor_conf {
        Some(conf) => api
            .layer(GovernorLayer::new(Arc::new(conf)))
            .layer(middleware::map_response(rate_limit_envelope)),
        None => {
            tracing::warn!("Invalid rate limit settings, rate limiting disabled");
            api
        }
    }
}

/// Assembles the main application router.
///
/// * Nests the course, session and question routers under `/api`.
/// * Applies global middleware (panic catcher, security headers, Trace, CORS).
/// * Injects global state (store + config).
pub fn create_router(state: AppState) -> Router {
    let config = state.config.clone();

    let course_routes = Router::new()
        .route("/", get(courses::list_courses).post(courses::create_course))
        .route(
            "/{id}",
            get(courses::get_course)
                .put(courses::update_course)
                .delete(courses::delete_course),
        );

    let session_routes = Router::new()
        .route("/", post(sessions::create_session))
        .route("/{session_id}", get(sessions::get_session))
        .route("/{session_id}/end", put(sessions::end_session))
        .route("/course/{course_id}", get(sessions::list_course_sessions))
        .route(
            "/course/{course_id}/active",
            get(sessions::get_active_session),
        );

    let question_routes = Router::new()
        .route("/", post(questions::create_question))
        .route("/{id}", axum::routing::delete(questions::delete_question))
        .route("/{id}/status", put(questions::update_question_status))
        .route(
            "/session/{session_id}",
            get(questions::list_session_questions),
        )
        .route(
            "/session/{session_id}/by-student",
            get(questions::questions_by_student),
        );

    let api_routes = Router::new()
        .nest("/courses", course_routes)
        .nest("/sessions", session_routes)
        .nest("/questions", question_routes);

    let mut app = Router::new()
        .route("/", get(system::welcome))
        .route("/health", get(system::health))
        .nest("/api", rate_limited(api_routes, &config))
        .fallback(system::not_found)
        .layer(CatchPanicLayer::custom(panic_response));

    // Inside the header and CORS layers so exposed 500s still get them
    if config.is_development() {
        app = app.layer(middleware::map_response(expose_internal_errors));
    }

    app
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::X_FRAME_OPTIONS,
                    HeaderValue::from_static("DENY"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::X_XSS_PROTECTION,
                    HeaderValue::from_static("1; mode=block"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::REFERRER_POLICY,
                    HeaderValue::from_static("strict-origin-when-cross-origin"),
                )),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config))
        .with_state(state)
}
