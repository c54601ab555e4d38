use sqlx::{Sqlite, SqliteConnection};

use crate::{errors::RequestError, models::User};

mod ingredient_helpers;
mod profile_helpers;
mod recipe_helpers;
mod relation_helpers;
mod shopping_list_helpers;
mod tag_helpers;
mod user_helpers;

pub use ingredient_helpers::*;
pub use profile_helpers::*;
pub use recipe_helpers::*;
pub use relation_helpers::*;
pub use shopping_list_helpers::*;
pub use tag_helpers::*;
pub use user_helpers::*;

const USER_COLUMNS: &str = "id, email, username, first_name, last_name, password, created_at";

// ----------------- Helper Functions -----------------

pub async fn get_user_by_id(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<User>, RequestError> {
    let result = sqlx::query_as::<Sqlite, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(result)
}

pub async fn get_user_by_email(
    conn: &mut SqliteConnection,
    email: &str,
) -> Result<Option<User>, RequestError> {
    let result = sqlx::query_as::<Sqlite, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
    ))
    .bind(email)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(result)
}

/// Whether `viewer` follows `author`; anonymous viewers follow nobody.
pub async fn is_subscribed(
    conn: &mut SqliteConnection,
    viewer: Option<i64>,
    author_id: i64,
) -> Result<bool, RequestError> {
    let Some(viewer) = viewer else {
        return Ok(false);
    };
    let result = sqlx::query_scalar::<Sqlite, bool>(
        "SELECT EXISTS (SELECT 1 FROM follows WHERE user_id = $1 AND author_id = $2)",
    )
    .bind(viewer)
    .bind(author_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(result)
}
