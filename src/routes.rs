// src/routes.rs

use std::path::Path;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::{
    handlers::{activity, auth, chat, content, documents, quiz},
    state::AppState,
    utils::jwt::{auth_middleware, teacher_middleware},
};

/// HTML pages and the file each one serves.
const PAGES: [(&str, &str); 6] = [
    ("/", "index.html"),
    ("/summary", "summary.html"),
    ("/mcq", "mcq.html"),
    ("/chatbot", "chatbot.html"),
    ("/contact", "contact.html"),
    ("/analytics", "analytics.html"),
];

/// Multipart framing overhead allowed on top of the upload limit.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Assembles the main application router.
///
/// * `/api/auth/*`: registration and login.
/// * `/api/*`: everything else, behind `auth_middleware`.
/// * Pages and `/static/*` from the static directory.
pub fn create_router(state: AppState) -> Router {
    let origins = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect::<Vec<_>>();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .merge(
            Router::new()
                .route("/logout", post(auth::logout))
                .layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        );

    let teacher_routes = Router::new()
        .route("/students", get(auth::list_students))
        .layer(middleware::from_fn(teacher_middleware));

    let protected_routes = Router::new()
        .route("/summarize", post(content::summarize))
        .route("/generate_mcqs", post(content::generate_mcqs))
        .route("/grade", post(content::grade))
        .route("/ask-ai", post(chat::ask_ai))
        .route("/submit_mcqs", post(quiz::submit_mcqs))
        .route("/get_analytics/{student}", get(quiz::get_analytics))
        .route("/analytics/{student}/stats", get(quiz::get_stats))
        .route("/documents", get(documents::list_documents))
        .route("/documents/stats", get(documents::document_stats))
        .route("/documents/{hash}", get(documents::get_document))
        .route("/summaries", get(activity::list_summaries))
        .route("/activity", get(activity::list_activity))
        .merge(teacher_routes)
        // Auth runs before the teacher check.
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let api_routes = Router::new()
        .route("/health", get(activity::health))
        .nest("/auth", auth_routes)
        .merge(protected_routes);

    let static_dir = Path::new(&state.config.static_dir);
    let mut router = Router::new()
        .nest("/api", api_routes)
        .nest_service("/static", ServeDir::new(static_dir));
    for (route, file) in PAGES {
        router = router.route_service(route, ServeFile::new(static_dir.join(file)));
    }

    router
        .layer(DefaultBodyLimit::max(
            state.config.max_upload_bytes + FORM_OVERHEAD_BYTES,
        ))
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
