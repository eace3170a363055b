use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::models::Message;
use crate::error::{AppError, AppResult};

/// Maximum message length, matching the CHECK constraint on the table.
pub const MAX_LENGTH: usize = 140;

fn map_message(row: &Row) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        user_id: row.get(1)?,
        text: row.get(2)?,
        created_at: row.get(3)?,
    })
}

pub fn create(conn: &Connection, user_id: i64, text: &str) -> AppResult<Message> {
    if text.trim().is_empty() {
        return Err(AppError::BadRequest("Message must not be empty".into()));
    }
    if text.chars().count() > MAX_LENGTH {
        return Err(AppError::BadRequest(format!(
            "Message must be at most {MAX_LENGTH} characters"
        )));
    }

    conn.execute(
        "INSERT INTO messages (user_id, text) VALUES (?1, ?2)",
        params![user_id, text],
    )?;

    let id = conn.last_insert_rowid();
    find(conn, id)?.ok_or_else(|| AppError::Internal("Message vanished after insert".into()))
}

pub fn find(conn: &Connection, id: i64) -> AppResult<Option<Message>> {
    let message = conn
        .query_row(
            "SELECT id, user_id, text, created_at FROM messages WHERE id = ?1",
            params![id],
            map_message,
        )
        .optional()?;
    Ok(message)
}

/// Delete a message; its likes go with it via the FK cascade.
pub fn delete(conn: &Connection, id: i64) -> AppResult<()> {
    conn.execute("DELETE FROM messages WHERE id = ?1", params![id])?;
    Ok(())
}

/// A user's own messages, newest first.
pub fn for_user(conn: &Connection, user_id: i64) -> AppResult<Vec<Message>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, text, created_at FROM messages \
         WHERE user_id = ?1 ORDER BY created_at DESC, id DESC",
    )?;
    let messages = stmt
        .query_map(params![user_id], map_message)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(messages)
}

/// Home feed: messages from the user and everyone they follow,
/// newest first, capped at 100.
pub fn timeline(conn: &Connection, user_id: i64) -> AppResult<Vec<Message>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, text, created_at FROM messages \
         WHERE user_id = ?1 \
            OR user_id IN (SELECT followed_id FROM follows WHERE follower_id = ?1) \
         ORDER BY created_at DESC, id DESC LIMIT 100",
    )?;
    let messages = stmt
        .query_map(params![user_id], map_message)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(messages)
}

pub fn like_count(conn: &Connection, message_id: i64) -> AppResult<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM likes WHERE message_id = ?1",
        params![message_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{test_pool, users};

    #[test]
    fn create_and_find_a_message() {
        let pool = test_pool();
        let conn = pool.get().unwrap();

        let u = users::signup(&conn, "testing", "testing@email.com", "password", None).unwrap();
        let msg = create(&conn, u.id, "texting").unwrap();
        assert_eq!(msg.text, "texting");
        assert_eq!(msg.user_id, u.id);

        let found = find(&conn, msg.id).unwrap().unwrap();
        assert_eq!(found.text, "texting");
    }

    #[test]
    fn create_rejects_empty_and_oversized_text() {
        let pool = test_pool();
        let conn = pool.get().unwrap();

        let u = users::signup(&conn, "testing", "testing@email.com", "password", None).unwrap();

        let err = create(&conn, u.id, "   ").unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let long = "x".repeat(MAX_LENGTH + 1);
        let err = create(&conn, u.id, &long).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        // Exactly at the limit is fine
        let ok = "x".repeat(MAX_LENGTH);
        create(&conn, u.id, &ok).unwrap();
    }

    #[test]
    fn find_returns_none_for_unknown_id() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        assert!(find(&conn, 295875356).unwrap().is_none());
    }

    #[test]
    fn delete_removes_message_and_its_likes() {
        let pool = test_pool();
        let conn = pool.get().unwrap();

        let u = users::signup(&conn, "testing", "testing@email.com", "password", None).unwrap();
        let other = users::signup(&conn, "testtest", "email@email.com", "pass", None).unwrap();
        let msg = create(&conn, u.id, "texting").unwrap();
        users::like(&conn, other.id, msg.id).unwrap();

        delete(&conn, msg.id).unwrap();

        assert!(find(&conn, msg.id).unwrap().is_none());
        assert!(!users::likes_message(&conn, other.id, msg.id).unwrap());
    }

    #[test]
    fn timeline_includes_self_and_followed_users_only() {
        let pool = test_pool();
        let conn = pool.get().unwrap();

        let u1 = users::signup(&conn, "test1", "t1@test.com", "password", None).unwrap();
        let u2 = users::signup(&conn, "test2", "t2@test.com", "password", None).unwrap();
        let u3 = users::signup(&conn, "test3", "t3@test.com", "password", None).unwrap();

        create(&conn, u1.id, "mine").unwrap();
        create(&conn, u2.id, "followed").unwrap();
        create(&conn, u3.id, "stranger").unwrap();

        users::follow(&conn, u1.id, u2.id).unwrap();

        let feed = timeline(&conn, u1.id).unwrap();
        let texts: Vec<&str> = feed.iter().map(|m| m.text.as_str()).collect();
        assert!(texts.contains(&"mine"));
        assert!(texts.contains(&"followed"));
        assert!(!texts.contains(&"stranger"));
    }

    #[test]
    fn like_count_tracks_edges() {
        let pool = test_pool();
        let conn = pool.get().unwrap();

        let u = users::signup(&conn, "testing", "testing@email.com", "password", None).unwrap();
        let other = users::signup(&conn, "testtest", "email@email.com", "pass", None).unwrap();
        let msg = create(&conn, u.id, "texting").unwrap();

        assert_eq!(like_count(&conn, msg.id).unwrap(), 0);
        users::like(&conn, other.id, msg.id).unwrap();
        assert_eq!(like_count(&conn, msg.id).unwrap(), 1);
    }
}
