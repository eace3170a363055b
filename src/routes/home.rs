use askama::Template;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::db;
use crate::error::AppResult;
use crate::extractors::MaybeUser;
use crate::flash;
use crate::routes::messages::{message_views, MessageView};
use crate::state::AppState;

#[derive(Template)]
#[template(path = "pages/home_anon.html")]
pub struct HomeAnonTemplate {
    pub flash: Option<&'static str>,
}

#[derive(Template)]
#[template(path = "pages/home.html")]
pub struct HomeTemplate {
    pub flash: Option<&'static str>,
    pub username: String,
    pub user_id: i64,
    pub feed: Vec<MessageView>,
}

/// Wrapper to render askama templates as axum responses
pub struct Html<T: Template>(pub T);

impl<T: Template> IntoResponse for Html<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!("Template render error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
            }
        }
    }
}

/// Render a page, clearing the one-shot flash cookie if one was consumed.
pub fn page<T: Template>(template: T, had_flash: bool) -> Response {
    if had_flash {
        (
            [(header::SET_COOKIE, flash::clear_cookie())],
            Html(template),
        )
            .into_response()
    } else {
        Html(template).into_response()
    }
}

/// GET / — landing page for anonymous visitors, home feed for
/// authenticated users.
pub async fn index(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    headers: HeaderMap,
) -> AppResult<Response> {
    let pending = flash::take(&headers);
    let flash_text = pending.map(|f| f.text());

    let Some(user) = maybe_user.0 else {
        return Ok(page(HomeAnonTemplate { flash: flash_text }, pending.is_some()));
    };

    let conn = state.db.get()?;
    let feed = db::messages::timeline(&conn, user.id)?;
    let feed = message_views(&conn, &feed)?;

    Ok(page(
        HomeTemplate {
            flash: flash_text,
            username: user.username,
            user_id: user.id,
            feed,
        },
        pending.is_some(),
    ))
}
