use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::error;

use fable_core::prefs::Preferences;

use crate::auth::AppState;

/// `GET /preferences` — current display settings; defaults when nothing
/// has been saved yet.
pub async fn get_preferences(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.prefs.load())
}

/// `PUT /preferences` — replace the stored preferences object. Fields the
/// client omits fall back to their defaults on the next load.
pub async fn put_preferences(
    State(state): State<AppState>,
    Json(preferences): Json<Preferences>,
) -> Result<impl IntoResponse, StatusCode> {
    state.prefs.save(&preferences).map_err(|e| {
        error!("Failed to save preferences: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(preferences))
}
