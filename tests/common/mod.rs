//! Shared helpers for the HTTP view tests: each test spawns the real
//! router over a throwaway database on an ephemeral port and drives it
//! with reqwest.

use tempfile::TempDir;

use warble::auth::session;
use warble::config::Config;
use warble::db;
use warble::db::models::User;
use warble::routes;
use warble::state::{AppState, DbPool};

pub struct TestApp {
    pub base_url: String,
    pub db: DbPool,
    pub config: Config,
    _data_dir: TempDir,
}

pub async fn spawn_app() -> TestApp {
    let data_dir = TempDir::new().unwrap();
    let db_path = data_dir.path().join("test.db");
    let pool = db::create_pool(&db_path).expect("Failed to create test database");
    db::run_migrations(&pool).expect("Failed to run migrations");

    let config = Config::default();
    let state = AppState {
        db: pool.clone(),
        config: config.clone(),
    };
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        base_url: format!("http://{}", addr),
        db: pool,
        config,
        _data_dir: data_dir,
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Seed a user directly through the model layer.
    pub fn signup(&self, username: &str, email: &str, password: &str) -> User {
        let conn = self.db.get().unwrap();
        db::users::signup(&conn, username, email, password, None).unwrap()
    }

    /// Cookie header value for a fresh session belonging to `user_id`.
    pub fn session_cookie(&self, user_id: i64) -> String {
        let token = session::create_session(&self.db, user_id, 1).unwrap();
        format!("{}={}", self.config.auth.cookie_name, token)
    }

    pub fn count(&self, sql: &str) -> i64 {
        let conn = self.db.get().unwrap();
        conn.query_row(sql, [], |row| row.get(0)).unwrap()
    }
}

/// Client that follows redirects and keeps cookies, like a browser.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .unwrap()
}

/// Client that stops at the first response, for asserting on redirects.
pub fn client_no_redirect() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}
