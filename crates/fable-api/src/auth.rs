use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

use fable_core::prefs::PrefStore;
use fable_db::Database;
use fable_gateway::dispatcher::Dispatcher;
use fable_types::api::{
    Claims, LoginRequest, RegisterRequest, SessionResponse, UpdateProfileRequest,
};

use crate::posts::ContentLibrary;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub content: ContentLibrary,
    pub dispatcher: Dispatcher,
    pub jwt_secret: String,
    pub throttle: LoginThrottle,
    pub prefs: PrefStore,
}

/// The fixed, enumerated set of user-facing auth failures. Every variant
/// maps to exactly one message; unknown email and wrong password share one
/// on purpose.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("This email is already registered")]
    EmailInUse,
    #[error("Invalid email address")]
    InvalidEmail,
    #[error("Password must be at least 6 characters")]
    WeakPassword,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Display name cannot be empty")]
    EmptyDisplayName,
    #[error("Too many failed attempts. Please try again later")]
    TooManyAttempts,
    #[error("An error occurred")]
    Internal,
}

impl AuthError {
    fn status(&self) -> StatusCode {
        match self {
            AuthError::EmailInUse => StatusCode::CONFLICT,
            AuthError::InvalidEmail | AuthError::WeakPassword | AuthError::EmptyDisplayName => {
                StatusCode::BAD_REQUEST
            }
            AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,
            AuthError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AuthError> {
    if !is_valid_email(&req.email) {
        return Err(AuthError::InvalidEmail);
    }
    if req.password.len() < 6 {
        return Err(AuthError::WeakPassword);
    }

    if state
        .db
        .get_user_by_email(&req.email)
        .map_err(internal)?
        .is_some()
    {
        return Err(AuthError::EmailInUse);
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Password hashing failed: {}", e);
            AuthError::Internal
        })?
        .to_string();

    let user_id = Uuid::new_v4();
    let display_name = req
        .display_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());

    state
        .db
        .create_user(&user_id.to_string(), &req.email, &password_hash, display_name)
        .map_err(internal)?;

    let name = visible_name(&req.email, display_name);
    let token = create_token(&state.jwt_secret, user_id, &req.email, &name).map_err(internal)?;

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            user_id,
            email: req.email,
            name,
            token: Some(token),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    if state.throttle.is_blocked(&req.email) {
        return Err(AuthError::TooManyAttempts);
    }

    let Some(user) = state.db.get_user_by_email(&req.email).map_err(internal)? else {
        state.throttle.record_failure(&req.email);
        return Err(AuthError::InvalidCredentials);
    };

    let parsed_hash = PasswordHash::new(&user.password).map_err(|e| {
        error!("Corrupt password hash for {}: {}", user.id, e);
        AuthError::Internal
    })?;

    if Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .is_err()
    {
        state.throttle.record_failure(&req.email);
        return Err(AuthError::InvalidCredentials);
    }

    state.throttle.clear(&req.email);

    let user_id: Uuid = user.id.parse().map_err(internal)?;
    let name = visible_name(&user.email, user.display_name.as_deref());
    let token = create_token(&state.jwt_secret, user_id, &user.email, &name).map_err(internal)?;

    Ok(Json(SessionResponse {
        user_id,
        email: user.email,
        name,
        token: Some(token),
    }))
}

/// Session verification: the middleware already validated the token, so
/// just reflect the stored identity.
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AuthError> {
    let user = state
        .db
        .get_user_by_id(&claims.sub.to_string())
        .map_err(internal)?
        .ok_or(AuthError::InvalidCredentials)?;

    Ok(Json(SessionResponse {
        user_id: claims.sub,
        name: visible_name(&user.email, user.display_name.as_deref()),
        email: user.email,
        token: None,
    }))
}

/// Update the display name. The name is embedded in the token claims, so a
/// fresh token is returned with the response.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let display_name = req.display_name.trim();
    if display_name.is_empty() {
        return Err(AuthError::EmptyDisplayName);
    }

    let updated = state
        .db
        .update_display_name(&claims.sub.to_string(), display_name)
        .map_err(internal)?;
    if !updated {
        return Err(AuthError::InvalidCredentials);
    }

    let token =
        create_token(&state.jwt_secret, claims.sub, &claims.email, display_name).map_err(internal)?;

    Ok(Json(SessionResponse {
        user_id: claims.sub,
        email: claims.email,
        name: display_name.to_string(),
        token: Some(token),
    }))
}

fn create_token(secret: &str, user_id: Uuid, email: &str, name: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        name: name.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

fn visible_name(email: &str, display_name: Option<&str>) -> String {
    match display_name {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => email.split('@').next().unwrap_or(email).to_string(),
    }
}

fn internal<E: std::fmt::Display>(e: E) -> AuthError {
    error!("Auth storage failure: {}", e);
    AuthError::Internal
}

/// Minimal syntax check: something@domain.tld with no whitespace, matching
/// what the sign-up form enforces client-side.
fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

const THROTTLE_MAX_FAILURES: usize = 5;
const THROTTLE_WINDOW: Duration = Duration::from_secs(15 * 60);

/// Sliding-window failed-login tracker behind the "too many attempts"
/// error. In-memory only; restarting the server forgets the counters.
pub struct LoginThrottle {
    failures: Mutex<HashMap<String, Vec<Instant>>>,
}

impl LoginThrottle {
    pub fn new() -> Self {
        Self {
            failures: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_blocked(&self, email: &str) -> bool {
        let mut failures = self.failures.lock().expect("throttle lock poisoned");
        let Some(attempts) = failures.get_mut(email) else {
            return false;
        };
        attempts.retain(|t| t.elapsed() < THROTTLE_WINDOW);
        attempts.len() >= THROTTLE_MAX_FAILURES
    }

    pub fn record_failure(&self, email: &str) {
        let mut failures = self.failures.lock().expect("throttle lock poisoned");
        failures
            .entry(email.to_string())
            .or_default()
            .push(Instant::now());
    }

    pub fn clear(&self, email: &str) {
        let mut failures = self.failures.lock().expect("throttle lock poisoned");
        failures.remove(email);
    }
}

impl Default for LoginThrottle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_syntax_check() {
        assert!(is_valid_email("reader@example.com"));
        assert!(is_valid_email("a.b+c@sub.example.org"));
        assert!(!is_valid_email("readerexample.com"));
        assert!(!is_valid_email("reader@example"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("reader@.com"));
        assert!(!is_valid_email("rea der@example.com"));
    }

    #[test]
    fn throttle_blocks_after_repeated_failures() {
        let throttle = LoginThrottle::new();
        for _ in 0..THROTTLE_MAX_FAILURES {
            assert!(!throttle.is_blocked("a@b.com"));
            throttle.record_failure("a@b.com");
        }
        assert!(throttle.is_blocked("a@b.com"));
        // Other accounts are unaffected.
        assert!(!throttle.is_blocked("c@d.com"));
    }

    #[test]
    fn successful_login_clears_failures() {
        let throttle = LoginThrottle::new();
        for _ in 0..THROTTLE_MAX_FAILURES {
            throttle.record_failure("a@b.com");
        }
        throttle.clear("a@b.com");
        assert!(!throttle.is_blocked("a@b.com"));
    }
}
