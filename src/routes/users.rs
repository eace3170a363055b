use askama::Template;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;

use crate::db;
use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser};
use crate::flash;
use crate::routes::home::Html;
use crate::routes::messages::{message_views, MessageView};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(index))
        .route("/users/{id}", get(show))
        .route("/users/{id}/following", get(following))
        .route("/users/{id}/followers", get(followers))
        .route("/users/{id}/likes", get(likes))
        .route("/users/follow/{id}", post(follow))
        .route("/users/stop-following/{id}", post(stop_following))
}

/// Card shown in user listings.
pub struct UserCard {
    pub id: i64,
    pub username: String,
    pub image_url: String,
    pub bio: Option<String>,
}

impl From<User> for UserCard {
    fn from(u: User) -> Self {
        UserCard {
            id: u.id,
            username: u.username,
            image_url: u.image_url,
            bio: u.bio,
        }
    }
}

#[derive(Template)]
#[template(path = "pages/users_index.html")]
pub struct UsersIndexTemplate {
    pub q: String,
    pub users: Vec<UserCard>,
}

#[derive(Template)]
#[template(path = "pages/user_show.html")]
pub struct UserShowTemplate {
    pub profile: UserCard,
    pub location: Option<String>,
    pub header_image_url: String,
    pub message_count: usize,
    pub following_count: usize,
    pub follower_count: usize,
    pub messages: Vec<MessageView>,
    pub viewer_follows: bool,
    pub viewer_is_self: bool,
    pub signed_in: bool,
}

#[derive(Template)]
#[template(path = "pages/follow_list.html")]
pub struct FollowListTemplate {
    pub profile: UserCard,
    pub title: &'static str,
    pub users: Vec<UserCard>,
}

#[derive(Template)]
#[template(path = "pages/likes.html")]
pub struct LikesTemplate {
    pub profile: UserCard,
    pub messages: Vec<MessageView>,
}

#[derive(Deserialize)]
pub struct UsersQuery {
    pub q: Option<String>,
}

/// GET /users — list all users, or search by username substring with ?q=.
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<UsersQuery>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let q = query.q.unwrap_or_default();
    let term = if q.trim().is_empty() {
        None
    } else {
        Some(q.trim())
    };

    let users = db::users::list(&conn, term)?
        .into_iter()
        .map(UserCard::from)
        .collect();

    Ok(Html(UsersIndexTemplate { q, users }).into_response())
}

/// GET /users/{id} — profile page with the user's messages.
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    maybe_user: MaybeUser,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let user = db::users::find(&conn, id)?.ok_or(AppError::NotFound)?;

    let messages = db::messages::for_user(&conn, user.id)?;
    let messages = message_views(&conn, &messages)?;
    let following_count = db::users::following(&conn, user.id)?.len();
    let follower_count = db::users::followers(&conn, user.id)?.len();

    let (viewer_follows, viewer_is_self, signed_in) = match &maybe_user.0 {
        Some(viewer) => (
            db::users::is_following(&conn, viewer.id, user.id)?,
            viewer.id == user.id,
            true,
        ),
        None => (false, false, false),
    };

    Ok(Html(UserShowTemplate {
        location: user.location.clone(),
        header_image_url: user.header_image_url.clone(),
        profile: user.into(),
        message_count: messages.len(),
        following_count,
        follower_count,
        messages,
        viewer_follows,
        viewer_is_self,
        signed_in,
    })
    .into_response())
}

/// GET /users/{id}/following — who this user follows. Requires auth.
pub async fn following(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    _viewer: CurrentUser,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let user = db::users::find(&conn, id)?.ok_or(AppError::NotFound)?;
    let users = db::users::following(&conn, user.id)?
        .into_iter()
        .map(UserCard::from)
        .collect();

    Ok(Html(FollowListTemplate {
        profile: user.into(),
        title: "Following",
        users,
    })
    .into_response())
}

/// GET /users/{id}/followers — who follows this user. Requires auth.
pub async fn followers(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    _viewer: CurrentUser,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let user = db::users::find(&conn, id)?.ok_or(AppError::NotFound)?;
    let users = db::users::followers(&conn, user.id)?
        .into_iter()
        .map(UserCard::from)
        .collect();

    Ok(Html(FollowListTemplate {
        profile: user.into(),
        title: "Followers",
        users,
    })
    .into_response())
}

/// GET /users/{id}/likes — messages this user has liked. Requires auth.
pub async fn likes(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    _viewer: CurrentUser,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let user = db::users::find(&conn, id)?.ok_or(AppError::NotFound)?;
    let messages = db::users::liked_messages(&conn, user.id)?;
    let messages = message_views(&conn, &messages)?;

    Ok(Html(LikesTemplate {
        profile: user.into(),
        messages,
    })
    .into_response())
}

/// POST /users/follow/{id} — current user starts following the target.
pub async fn follow(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    viewer: CurrentUser,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let target = db::users::find(&conn, id)?.ok_or(AppError::NotFound)?;
    db::users::follow(&conn, viewer.id, target.id)?;

    Ok(flash::redirect(&format!("/users/{}/following", viewer.id)))
}

/// POST /users/stop-following/{id} — current user unfollows the target.
pub async fn stop_following(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    viewer: CurrentUser,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let target = db::users::find(&conn, id)?.ok_or(AppError::NotFound)?;
    db::users::unfollow(&conn, viewer.id, target.id)?;

    Ok(flash::redirect(&format!("/users/{}/following", viewer.id)))
}
