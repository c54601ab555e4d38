use sqlx::{Sqlite, SqliteConnection, SqlitePool};

use crate::{
    config::RecipesCountMode,
    data_formats::{RecipeShortResponse, SubscriptionResponse, UserResponse},
    errors::RequestError,
    models::User,
};

use super::{get_recent_recipes_by_author, is_subscribed};

/// How an author's recipes are exposed in a subscription entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscriptionView {
    pub recipes_limit: Option<i64>,
    pub count_mode: RecipesCountMode,
}

pub(crate) async fn build_subscription_response(
    conn: &mut SqliteConnection,
    viewer: Option<i64>,
    author: User,
    view: SubscriptionView,
) -> Result<SubscriptionResponse, RequestError> {
    let following = is_subscribed(conn, viewer, author.id).await?;
    let recipes = get_recent_recipes_by_author(conn, author.id, view.recipes_limit).await?;
    let recipes_count = match view.count_mode {
        RecipesCountMode::Limited => recipes.len() as i64,
        RecipesCountMode::Total => {
            sqlx::query_scalar::<Sqlite, i64>("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
                .bind(author.id)
                .fetch_one(&mut *conn)
                .await?
        }
    };
    Ok(SubscriptionResponse::new(
        UserResponse::new(author, following),
        recipes.into_iter().map(RecipeShortResponse::from).collect(),
        recipes_count,
    ))
}

/// Authors the user follows, in the order they were followed.
pub async fn list_followed_authors_in_db(
    pool: &SqlitePool,
    user_id: i64,
) -> Result<Vec<User>, RequestError> {
    let mut conn = pool.acquire().await?;
    let result = sqlx::query_as::<Sqlite, User>(
        r#"
        SELECT users.id, users.email, users.username, users.first_name, users.last_name,
               users.password, users.created_at
        FROM follows
        JOIN users ON users.id = follows.author_id
        WHERE follows.user_id = $1
        ORDER BY follows.created_at, follows.id
        "#,
    )
    .bind(user_id)
    .fetch_all(&mut conn)
    .await?;
    Ok(result)
}

pub async fn hydrate_subscriptions_in_db(
    pool: &SqlitePool,
    viewer: i64,
    authors: Vec<User>,
    view: SubscriptionView,
) -> Result<Vec<SubscriptionResponse>, RequestError> {
    let mut conn = pool.acquire().await?;
    let mut result = Vec::with_capacity(authors.len());
    for author in authors {
        result.push(build_subscription_response(&mut conn, Some(viewer), author, view).await?);
    }
    Ok(result)
}
