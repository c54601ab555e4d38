mod authentication;
pub mod config;
mod data_formats;
mod db_helpers;
mod errors;
mod handlers;
mod media;
mod models;
#[cfg(test)]
mod test_utils;

use std::{str::FromStr, sync::Arc};

use anyhow::Context;
pub use anyhow::Result;
use axum::http::StatusCode;
use axum::{routing::*, Extension, Json, Router};
pub use config::Config;
pub use data_formats::*;
use handlers::*;
use sqlx::{
    migrate::MigrateDatabase,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Sqlite, SqlitePool,
};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::info;

pub type JsonResponse<T> = (StatusCode, Json<T>);

/// Opens the database and serves the API on the configured address.
pub async fn run_app(config: Config) -> Result<()> {
    let db = init_db(&config).await?;
    serve(db, Arc::new(config)).await
}

pub async fn serve(db: SqlitePool, config: Arc<Config>) -> Result<()> {
    let address = config.bind_address;
    let app = make_router(db, config);
    info!("Server started on {}", address);
    axum::Server::bind(&address)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}

fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

pub async fn init_db(config: &Config) -> Result<SqlitePool> {
    let db_url = &config.database_url;
    let pool_options = if is_memory_url(db_url) {
        // Every connection to a private in-memory database sees a new, empty one.
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
            info!("Creating database {}", db_url);
            Sqlite::create_database(db_url)
                .await
                .with_context(|| format!("Failed to create database {db_url}"))?;
        } else {
            info!("Database already exists");
        }
        SqlitePoolOptions::new()
    };
    let options = SqliteConnectOptions::from_str(db_url)
        .with_context(|| format!("Invalid DATABASE_URL {db_url}"))?
        .foreign_keys(true);
    let pool = pool_options.connect_with(options).await?;
    info!("Running Migrations");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    info!("Migrations completed");
    Ok(pool)
}

pub fn make_router(db: SqlitePool, config: Arc<Config>) -> Router {
    let api = Router::new()
        .route("/auth/token/login/", post(login_user))
        .route("/auth/token/logout/", post(logout_user))
        .route("/users/", get(list_users).post(register_user))
        .route("/users/me/", get(get_current_user))
        .route("/users/set_password/", post(set_password))
        .route("/users/subscriptions/", get(list_subscriptions))
        .route("/users/:id/", get(get_user))
        .route("/users/:id/subscribe/", post(subscribe).delete(unsubscribe))
        .route("/tags/", get(list_tags))
        .route("/tags/:id/", get(get_tag))
        .route("/ingredients/", get(list_ingredients))
        .route("/ingredients/:id/", get(get_ingredient))
        .route("/recipes/", get(list_recipes).post(create_recipe))
        .route(
            "/recipes/download_shopping_cart/",
            get(download_shopping_cart),
        )
        .route(
            "/recipes/:id/",
            get(get_recipe).patch(update_recipe).delete(delete_recipe),
        )
        .route(
            "/recipes/:id/favorite/",
            post(add_favorite).delete(remove_favorite),
        )
        .route(
            "/recipes/:id/shopping_cart/",
            post(add_to_shopping_cart).delete(remove_from_shopping_cart),
        );

    let mut router = Router::new()
        .route("/check_health", get(alive))
        .nest("/api", api);
    if config.media_url.starts_with('/') && config.media_url.len() > 1 {
        router = router.nest_service(&config.media_url, ServeDir::new(&config.media_root));
    }
    router
        .fallback(not_found)
        .layer(Extension(Arc::new(db)))
        .layer(Extension(config))
        .layer(TraceLayer::new_for_http())
}
