use askama::Template;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{AppendHeaders, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;

use crate::auth::session;
use crate::db;
use crate::error::{AppError, AppResult};
use crate::flash::{self, Flash};
use crate::routes::home::page;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", get(signup_page).post(signup_submit))
        .route("/login", get(login_page).post(login_submit))
        .route("/logout", post(logout))
}

#[derive(Template)]
#[template(path = "pages/signup.html")]
pub struct SignupTemplate {
    pub flash: Option<&'static str>,
}

#[derive(Template)]
#[template(path = "pages/login.html")]
pub struct LoginTemplate {
    pub flash: Option<&'static str>,
}

#[derive(Deserialize)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub image_url: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

fn session_cookie(name: &str, token: &str, max_age_hours: u64) -> String {
    let max_age_secs = max_age_hours * 3600;
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        name, token, max_age_secs
    )
}

fn clear_session_cookie(name: &str) -> String {
    format!("{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0", name)
}

/// 302 to `/` carrying a fresh session cookie.
fn login_redirect(state: &AppState, user_id: i64) -> AppResult<Response> {
    let token = session::create_session(&state.db, user_id, state.config.auth.session_hours)?;
    Ok((
        StatusCode::FOUND,
        [
            (header::LOCATION, "/".to_string()),
            (
                header::SET_COOKIE,
                session_cookie(
                    &state.config.auth.cookie_name,
                    &token,
                    state.config.auth.session_hours,
                ),
            ),
        ],
    )
        .into_response())
}

pub async fn signup_page(headers: HeaderMap) -> Response {
    let pending = flash::take(&headers);
    page(
        SignupTemplate {
            flash: pending.map(|f| f.text()),
        },
        pending.is_some(),
    )
}

pub async fn signup_submit(
    State(state): State<AppState>,
    Form(form): Form<SignupForm>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let image_url = form.image_url.as_deref().filter(|s| !s.trim().is_empty());

    match db::users::signup(&conn, &form.username, &form.email, &form.password, image_url) {
        Ok(user) => {
            tracing::info!("New user signed up: {}", user.username);
            login_redirect(&state, user.id)
        }
        Err(AppError::Conflict(_)) => Ok(flash::redirect_with_flash("/signup", Flash::Taken)),
        Err(AppError::BadRequest(_)) => {
            Ok(flash::redirect_with_flash("/signup", Flash::SignupInvalid))
        }
        Err(e) => Err(e),
    }
}

pub async fn login_page(headers: HeaderMap) -> Response {
    let pending = flash::take(&headers);
    page(
        LoginTemplate {
            flash: pending.map(|f| f.text()),
        },
        pending.is_some(),
    )
}

pub async fn login_submit(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    let conn = state.db.get()?;

    match db::users::authenticate(&conn, &form.username, &form.password)? {
        Some(user) => {
            tracing::info!("User logged in: {}", user.username);
            login_redirect(&state, user.id)
        }
        None => Ok(flash::redirect_with_flash(
            "/login",
            Flash::InvalidCredentials,
        )),
    }
}

/// POST /logout — delete the session and clear its cookie.
pub async fn logout(
    State(state): State<AppState>,
    request: axum::http::Request<axum::body::Body>,
) -> AppResult<Response> {
    let (parts, _body) = request.into_parts();

    let cookie_name = state.config.auth.cookie_name.clone();
    if let Some(token) = crate::extractors::get_cookie_value(&parts, &cookie_name) {
        let _ = session::delete_session(&state.db, token);
    }

    Ok((
        StatusCode::FOUND,
        AppendHeaders([
            (header::LOCATION, "/login".to_string()),
            (header::SET_COOKIE, clear_session_cookie(&cookie_name)),
            (header::SET_COOKIE, flash::set_cookie(Flash::LoggedOut)),
        ]),
    )
        .into_response())
}
