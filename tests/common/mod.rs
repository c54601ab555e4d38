use std::{
    net::{SocketAddr, TcpListener},
    sync::Arc,
    time::Duration,
};

use foodgram::{config::RecipesCountMode, init_db, serve, Config};
use rand::{distributions::Alphanumeric, Rng};
use serde_json::{json, Value};
use sqlx::SqlitePool;

pub const PIXEL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

pub fn get_random_free_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

pub struct TestApp {
    pub base: String,
    pub pool: SqlitePool,
    pub client: reqwest::Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub async fn add_ingredient(&self, name: &str, unit: &str) -> i64 {
        sqlx::query_scalar(
            "INSERT INTO ingredients (name, measurement_unit) VALUES ($1, $2) RETURNING id",
        )
        .bind(name)
        .bind(unit)
        .fetch_one(&self.pool)
        .await
        .unwrap()
    }

    pub async fn tag_id(&self, slug: &str) -> i64 {
        sqlx::query_scalar("SELECT id FROM tags WHERE slug = $1")
            .bind(slug)
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    /// Registers a user and returns `(id, token)`.
    pub async fn signup(&self, username: &str) -> (i64, String) {
        let created: Value = self
            .client
            .post(self.url("/api/users/"))
            .json(&json!({
                "email": format!("{username}@example.com"),
                "username": username,
                "first_name": "Test",
                "last_name": "User",
                "password": "secret-pass",
            }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let token: Value = self
            .client
            .post(self.url("/api/auth/token/login/"))
            .json(&json!({
                "email": format!("{username}@example.com"),
                "password": "secret-pass",
            }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        (
            created["id"].as_i64().unwrap(),
            token["auth_token"].as_str().unwrap().to_owned(),
        )
    }
}

pub async fn spawn_app() -> TestApp {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();
    let config = Config {
        database_url: "sqlite::memory:".to_owned(),
        jwt_secret: "integration-secret".to_owned(),
        bind_address: get_random_free_port(),
        media_root: std::env::temp_dir().join(format!("foodgram-it-{suffix}")),
        media_url: "/media".to_owned(),
        page_size: 6,
        recipes_count_mode: RecipesCountMode::Total,
    };
    let pool = init_db(&config).await.unwrap();
    let base = format!("http://{}", config.bind_address);
    tokio::spawn(serve(pool.clone(), Arc::new(config)));

    let client = reqwest::Client::new();
    for _ in 0..50 {
        if client
            .get(format!("{base}/check_health"))
            .send()
            .await
            .is_ok()
        {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    TestApp { base, pool, client }
}
