use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use axum::routing::{delete, get, post, put};
use axum::Router;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::AppError;

pub mod auth;
pub mod contact;
pub mod customers;
pub mod dashboard;
pub mod medicines;
pub mod purchases;
pub mod sales;
pub mod suppliers;

pub const SESSION_COOKIE: &str = "session";

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
}

/// Builds the full route table. Everything except login/register and the
/// public contact form requires a valid session (enforced per-handler via the
/// [`AuthUser`] extractor).
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard::summary))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/medicines", get(medicines::list).post(medicines::create))
        .route("/medicines/categories", get(medicines::categories))
        .route(
            "/medicines/:id",
            get(medicines::detail)
                .put(medicines::update)
                .delete(medicines::remove),
        )
        .route("/suppliers", get(suppliers::list).post(suppliers::create))
        .route(
            "/suppliers/:id",
            put(suppliers::update).delete(suppliers::remove),
        )
        .route("/customers", get(customers::list).post(customers::create))
        .route(
            "/customers/:id",
            put(customers::update).delete(customers::remove),
        )
        .route("/purchases", get(purchases::list).post(purchases::create))
        .route(
            "/purchases/:id",
            put(purchases::update).delete(purchases::remove),
        )
        .route("/sales", get(sales::list).post(sales::create))
        .route("/sales/:id", put(sales::update).delete(sales::remove))
        .route("/contact", get(contact::list).post(contact::submit))
        .route("/contact/:id", delete(contact::remove))
        .with_state(state)
}

/// The signed-in user, resolved from the `session` cookie.
pub struct AuthUser {
    pub id: i64,
    pub username: String,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers).ok_or(AppError::Unauthorized)?;

        let user: Option<(i64, String)> = sqlx::query_as(
            "SELECT u.id, u.username FROM sessions s \
             JOIN users u ON u.id = s.user_id \
             WHERE s.token = $1 AND s.expires_at > $2",
        )
        .bind(&token)
        .bind(Utc::now().naive_utc())
        .fetch_optional(&state.pool)
        .await?;

        match user {
            Some((id, username)) => Ok(AuthUser { id, username }),
            None => Err(AppError::Unauthorized),
        }
    }
}

/// Extracts the session token from the `Cookie` header, if any.
pub(crate) fn session_token(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|part| {
        let (name, value) = part.trim().split_once('=')?;
        (name == SESSION_COOKIE && !value.is_empty()).then(|| value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn session_token_parses_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session=abc-123; lang=en"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("abc-123"));
    }

    #[test]
    fn session_token_absent_or_empty() {
        assert_eq!(session_token(&HeaderMap::new()), None);

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("session="));
        assert_eq!(session_token(&headers), None);
    }
}
