use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    middleware,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use fable_api::auth::{self, AppState, AppStateInner, LoginThrottle};
use fable_api::middleware::require_auth;
use fable_api::{activity, comments, likes, posts, prefs};
use fable_core::prefs::PrefStore;
use fable_gateway::connection;
use fable_gateway::dispatcher::Dispatcher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fable=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("FABLE_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("FABLE_DB_PATH").unwrap_or_else(|_| "fable.db".into());
    let content_dir = std::env::var("FABLE_CONTENT_DIR").unwrap_or_else(|_| "data".into());
    let prefs_path =
        std::env::var("FABLE_PREFS_PATH").unwrap_or_else(|_| "preferences.json".into());
    let host = std::env::var("FABLE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("FABLE_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init storage and content
    let db = fable_db::Database::open(&PathBuf::from(&db_path))?;
    let content = posts::ContentLibrary::load(&PathBuf::from(&content_dir))?;

    // Shared state
    let dispatcher = Dispatcher::new();
    let state: AppState = Arc::new(AppStateInner {
        db,
        content,
        dispatcher,
        jwt_secret,
        throttle: LoginThrottle::new(),
        prefs: PrefStore::new(prefs_path),
    });

    // Routes
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/posts", get(posts::list_posts))
        .route("/posts/{post_id}", get(posts::get_post))
        // Reading comments is public; posting requires a session.
        .route(
            "/posts/{post_id}/comments",
            post(comments::post_comment)
                .route_layer(middleware::from_fn(require_auth))
                .get(comments::get_comments),
        )
        .route(
            "/preferences",
            get(prefs::get_preferences).put(prefs::put_preferences),
        )
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/auth/profile", put(auth::update_profile))
        .route("/comments/{comment_id}", delete(comments::delete_comment))
        .route(
            "/posts/{post_id}/like",
            put(likes::like_post).delete(likes::unlike_post),
        )
        .route("/posts/{post_id}/likes", get(likes::like_status))
        .route(
            "/posts/{post_id}/bookmark",
            put(likes::bookmark_post)
                .delete(likes::remove_bookmark)
                .get(likes::bookmark_status),
        )
        .route("/bookmarks", get(likes::list_bookmarks))
        .route("/activity/read", post(activity::record_reading))
        .route("/activity/stats", get(activity::get_stats))
        .route("/activity/history", get(activity::get_history))
        .route("/activity/achievements", get(activity::list_achievements))
        .layer(middleware::from_fn(require_auth))
        .with_state(state.clone());

    let ws_route = Router::new()
        .route("/gateway", get(ws_upgrade))
        .with_state(state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Fable server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let dispatcher = state.dispatcher.clone();
    let jwt_secret = state.jwt_secret.clone();
    ws.on_upgrade(move |socket| connection::handle_connection(socket, dispatcher, jwt_secret))
}
