//! Shared fixtures for the in-crate tests.
//!
//! Users created here get an unusable password hash so that tests which
//! never log in skip argon2 entirely.

use rand::{distributions::Alphanumeric, Rng};
use sqlx::{Sqlite, SqlitePool};

use crate::{
    config::{Config, RecipesCountMode},
    data_formats::{IngredientAmountRequest, RecipeDraft, RegisterRequest},
    db_helpers::create_recipe_in_db,
};

pub const TEST_IMAGE_URL: &str = "/media/recipes_images/test.png";

/// Configuration pointing at an in-memory database and a scratch media dir.
pub fn test_config() -> Config {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();
    Config {
        database_url: "sqlite::memory:".to_owned(),
        jwt_secret: "test-secret".to_owned(),
        bind_address: ([127, 0, 0, 1], 0).into(),
        media_root: std::env::temp_dir().join(format!("foodgram-test-{suffix}")),
        media_url: "/media".to_owned(),
        page_size: 6,
        recipes_count_mode: RecipesCountMode::Total,
    }
}

/// Fresh migrated in-memory database.
pub async fn setup_test_db() -> SqlitePool {
    crate::init_db(&test_config()).await.unwrap()
}

pub async fn create_user(pool: &SqlitePool, username: &str) -> i64 {
    sqlx::query_scalar::<Sqlite, i64>(
        r#"
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, '!')
        RETURNING id
        "#,
    )
    .bind(format!("{username}@example.com"))
    .bind(username)
    .bind(username.to_uppercase())
    .bind("Tester")
    .fetch_one(pool)
    .await
    .unwrap()
}

pub fn registration(username: &str) -> RegisterRequest {
    RegisterRequest {
        email: format!("{username}@example.com"),
        username: username.to_owned(),
        first_name: "Test".to_owned(),
        last_name: "User".to_owned(),
        password: "secret-pass".to_owned(),
    }
}

/// Returns the id of the ingredient, inserting it on first use.
pub async fn create_ingredient(pool: &SqlitePool, name: &str, unit: &str) -> i64 {
    sqlx::query("INSERT OR IGNORE INTO ingredients (name, measurement_unit) VALUES ($1, $2)")
        .bind(name)
        .bind(unit)
        .execute(pool)
        .await
        .unwrap();
    sqlx::query_scalar::<Sqlite, i64>(
        "SELECT id FROM ingredients WHERE name = $1 AND measurement_unit = $2",
    )
    .bind(name)
    .bind(unit)
    .fetch_one(pool)
    .await
    .unwrap()
}

/// Id of one of the seeded tags.
pub async fn tag_id(pool: &SqlitePool, slug: &str) -> i64 {
    sqlx::query_scalar::<Sqlite, i64>("SELECT id FROM tags WHERE slug = $1")
        .bind(slug)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub fn draft(name: &str, ingredients: &[(i64, i64)], tags: &[i64]) -> RecipeDraft {
    RecipeDraft {
        name: Some(name.to_owned()),
        text: Some(format!("How to make {name}")),
        cooking_time: Some(10),
        ingredients: ingredients
            .iter()
            .map(|&(id, amount)| IngredientAmountRequest { id, amount })
            .collect(),
        tags: tags.to_vec(),
        image: None,
    }
}

pub async fn create_recipe(
    pool: &SqlitePool,
    author: i64,
    name: &str,
    ingredients: &[(i64, i64)],
    tags: &[i64],
) -> i64 {
    create_recipe_in_db(pool, author, &draft(name, ingredients, tags), TEST_IMAGE_URL)
        .await
        .unwrap()
}
