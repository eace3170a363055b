use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::models::{Message, User};
use crate::error::{AppError, AppResult};

/// Avatar used when signup does not provide an image URL.
pub const DEFAULT_IMAGE_URL: &str = "/static/images/default-pic.png";

fn map_user(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        image_url: row.get(4)?,
        header_image_url: row.get(5)?,
        bio: row.get(6)?,
        location: row.get(7)?,
        created_at: row.get(8)?,
    })
}

const USER_COLUMNS: &str =
    "id, username, email, password_hash, image_url, header_image_url, bio, location, created_at";

// Same column list qualified with the table name, for queries that join
// against tables sharing column names (e.g. follows.created_at).
const QUALIFIED_USER_COLUMNS: &str = "users.id, users.username, users.email, \
     users.password_hash, users.image_url, users.header_image_url, users.bio, \
     users.location, users.created_at";

/// Create a new account with a bcrypt-hashed password.
///
/// Empty username or password is rejected before persistence; a duplicate
/// username or email surfaces the unique-constraint failure as
/// `AppError::Conflict`.
pub fn signup(
    conn: &Connection,
    username: &str,
    email: &str,
    password: &str,
    image_url: Option<&str>,
) -> AppResult<User> {
    if username.trim().is_empty() {
        return Err(AppError::BadRequest("Username must not be empty".into()));
    }
    if password.trim().is_empty() {
        return Err(AppError::BadRequest("Password must not be empty".into()));
    }

    let hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {e}")))?;

    conn.execute(
        "INSERT INTO users (username, email, password_hash, image_url) VALUES (?1, ?2, ?3, ?4)",
        params![
            username,
            email,
            hash,
            image_url.unwrap_or(DEFAULT_IMAGE_URL)
        ],
    )?;

    let id = conn.last_insert_rowid();
    find(conn, id)?.ok_or_else(|| AppError::Internal("User vanished after insert".into()))
}

/// Verify credentials. Bad credentials (unknown username or wrong password)
/// are `Ok(None)`, never an error.
pub fn authenticate(conn: &Connection, username: &str, password: &str) -> AppResult<Option<User>> {
    let user = find_by_username(conn, username)?;
    match user {
        Some(u) if bcrypt::verify(password, &u.password_hash).unwrap_or(false) => Ok(Some(u)),
        _ => Ok(None),
    }
}

pub fn find(conn: &Connection, id: i64) -> AppResult<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id],
            map_user,
        )
        .optional()?;
    Ok(user)
}

pub fn find_by_username(conn: &Connection, username: &str) -> AppResult<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
            params![username],
            map_user,
        )
        .optional()?;
    Ok(user)
}

/// List all users, or only those whose username contains `q`.
pub fn list(conn: &Connection, q: Option<&str>) -> AppResult<Vec<User>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users \
         WHERE ?1 IS NULL OR username LIKE '%' || ?1 || '%' \
         ORDER BY username"
    ))?;
    let users = stmt
        .query_map(params![q], map_user)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(users)
}

// -- Follow edges --

/// Record that `follower_id` follows `followed_id`. Idempotent.
pub fn follow(conn: &Connection, follower_id: i64, followed_id: i64) -> AppResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO follows (follower_id, followed_id) VALUES (?1, ?2)",
        params![follower_id, followed_id],
    )?;
    Ok(())
}

/// Remove the follow edge. Idempotent.
pub fn unfollow(conn: &Connection, follower_id: i64, followed_id: i64) -> AppResult<()> {
    conn.execute(
        "DELETE FROM follows WHERE follower_id = ?1 AND followed_id = ?2",
        params![follower_id, followed_id],
    )?;
    Ok(())
}

pub fn is_following(conn: &Connection, follower_id: i64, followed_id: i64) -> AppResult<bool> {
    let found: bool = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM follows WHERE follower_id = ?1 AND followed_id = ?2)",
        params![follower_id, followed_id],
        |row| row.get(0),
    )?;
    Ok(found)
}

pub fn is_followed_by(conn: &Connection, user_id: i64, other_id: i64) -> AppResult<bool> {
    is_following(conn, other_id, user_id)
}

/// Users that `user_id` follows.
pub fn following(conn: &Connection, user_id: i64) -> AppResult<Vec<User>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {QUALIFIED_USER_COLUMNS} FROM users \
         JOIN follows ON follows.followed_id = users.id \
         WHERE follows.follower_id = ?1 \
         ORDER BY users.username"
    ))?;
    let users = stmt
        .query_map(params![user_id], map_user)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(users)
}

/// Users following `user_id`.
pub fn followers(conn: &Connection, user_id: i64) -> AppResult<Vec<User>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {QUALIFIED_USER_COLUMNS} FROM users \
         JOIN follows ON follows.follower_id = users.id \
         WHERE follows.followed_id = ?1 \
         ORDER BY users.username"
    ))?;
    let users = stmt
        .query_map(params![user_id], map_user)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(users)
}

// -- Like edges --

/// Record that the user likes the message. Idempotent: liking an
/// already-liked message leaves exactly one row.
pub fn like(conn: &Connection, user_id: i64, message_id: i64) -> AppResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO likes (user_id, message_id) VALUES (?1, ?2)",
        params![user_id, message_id],
    )?;
    Ok(())
}

/// Remove the like edge. Idempotent.
pub fn unlike(conn: &Connection, user_id: i64, message_id: i64) -> AppResult<()> {
    conn.execute(
        "DELETE FROM likes WHERE user_id = ?1 AND message_id = ?2",
        params![user_id, message_id],
    )?;
    Ok(())
}

pub fn likes_message(conn: &Connection, user_id: i64, message_id: i64) -> AppResult<bool> {
    let found: bool = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM likes WHERE user_id = ?1 AND message_id = ?2)",
        params![user_id, message_id],
        |row| row.get(0),
    )?;
    Ok(found)
}

/// Messages the user has liked, newest like first.
pub fn liked_messages(conn: &Connection, user_id: i64) -> AppResult<Vec<Message>> {
    let mut stmt = conn.prepare(
        "SELECT m.id, m.user_id, m.text, m.created_at FROM messages m \
         JOIN likes l ON l.message_id = m.id \
         WHERE l.user_id = ?1 \
         ORDER BY l.created_at DESC, m.id DESC",
    )?;
    let messages = stmt
        .query_map(params![user_id], |row| {
            Ok(Message {
                id: row.get(0)?,
                user_id: row.get(1)?,
                text: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(messages)
}
