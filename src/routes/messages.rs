use askama::Template;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use rusqlite::Connection;
use serde::Deserialize;

use crate::db;
use crate::db::models::Message;
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser};
use crate::flash::{self, Flash};
use crate::routes::home::Html;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/messages/new", post(create))
        .route("/messages/{id}", get(show))
        .route("/messages/{id}/delete", post(delete))
        .route("/messages/{id}/add_like", post(add_like))
        .route("/messages/{id}/remove_like", post(remove_like))
}

/// A message joined with its author, ready for rendering.
pub struct MessageView {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub image_url: String,
    pub text: String,
    pub date: String,
    pub likes: i64,
}

pub fn message_view(conn: &Connection, msg: &Message) -> AppResult<MessageView> {
    let author = db::users::find(conn, msg.user_id)?
        .ok_or_else(|| AppError::Internal("Message author missing".into()))?;
    Ok(MessageView {
        id: msg.id,
        user_id: author.id,
        username: author.username,
        image_url: author.image_url,
        text: msg.text.clone(),
        date: msg.display_date(),
        likes: db::messages::like_count(conn, msg.id)?,
    })
}

pub fn message_views(conn: &Connection, msgs: &[Message]) -> AppResult<Vec<MessageView>> {
    msgs.iter().map(|m| message_view(conn, m)).collect()
}

#[derive(Template)]
#[template(path = "pages/message_show.html")]
pub struct MessageShowTemplate {
    pub message: MessageView,
    pub viewer_owns: bool,
    pub viewer_likes: bool,
    pub signed_in: bool,
}

#[derive(Deserialize)]
pub struct MessageForm {
    pub text: String,
}

/// POST /messages/new — create a message for the session user;
/// 302 to the author's profile on success.
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<MessageForm>,
) -> AppResult<Response> {
    let conn = state.db.get()?;

    match db::messages::create(&conn, user.id, &form.text) {
        Ok(_) => Ok(flash::redirect(&format!("/users/{}", user.id))),
        Err(AppError::BadRequest(_)) => {
            Ok(flash::redirect_with_flash("/", Flash::MessageTooLong))
        }
        Err(e) => Err(e),
    }
}

/// GET /messages/{id} — show one message; 404 if absent.
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    maybe_user: MaybeUser,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let message = db::messages::find(&conn, id)?.ok_or(AppError::NotFound)?;

    let (viewer_owns, viewer_likes, signed_in) = match &maybe_user.0 {
        Some(viewer) => (
            viewer.id == message.user_id,
            db::users::likes_message(&conn, viewer.id, message.id)?,
            true,
        ),
        None => (false, false, false),
    };

    Ok(Html(MessageShowTemplate {
        message: message_view(&conn, &message)?,
        viewer_owns,
        viewer_likes,
        signed_in,
    })
    .into_response())
}

/// POST /messages/{id}/delete — owners only; anyone else gets the
/// unauthorized treatment and the message survives.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    user: CurrentUser,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let message = db::messages::find(&conn, id)?.ok_or(AppError::NotFound)?;

    if message.user_id != user.id {
        return Ok(flash::unauthorized_redirect());
    }

    db::messages::delete(&conn, message.id)?;
    Ok(flash::redirect(&format!("/users/{}", user.id)))
}

/// POST /messages/{id}/add_like — idempotent like.
pub async fn add_like(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    user: CurrentUser,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let message = db::messages::find(&conn, id)?.ok_or(AppError::NotFound)?;

    db::users::like(&conn, user.id, message.id)?;
    Ok(flash::redirect("/"))
}

/// POST /messages/{id}/remove_like — idempotent unlike.
pub async fn remove_like(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    user: CurrentUser,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let message = db::messages::find(&conn, id)?.ok_or(AppError::NotFound)?;

    db::users::unlike(&conn, user.id, message.id)?;
    Ok(flash::redirect("/"))
}
