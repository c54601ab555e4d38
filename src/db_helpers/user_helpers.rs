use sqlx::{Sqlite, SqlitePool};
use tracing::info;

use crate::{
    authentication::{hash_password_argon2, verify_password_argon2},
    data_formats::{RegisterRequest, UserResponse},
    errors::{is_unique_violation, RequestError, ValidationErrors},
    models::User,
};

use super::{get_user_by_email, get_user_by_id, USER_COLUMNS};

pub async fn insert_user(pool: &SqlitePool, user: RegisterRequest) -> Result<User, RequestError> {
    user.validate()?;
    let password = hash_password_argon2(user.password)
        .await
        .map_err(|_| RequestError::ServerError)?;

    let mut tx = pool.begin().await?;
    let result = sqlx::query_as::<Sqlite, User>(&format!(
        r#"
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(&user.email)
    .bind(&user.username)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(password)
    .fetch_one(&mut tx)
    .await;

    let created = match result {
        Ok(created) => created,
        Err(e) if is_unique_violation(&e) => {
            return Err(duplicate_user_error(&e).into());
        }
        Err(e) => return Err(e.into()),
    };
    tx.commit().await?;
    info!("Registered user {} ({})", created.username, created.id);
    Ok(created)
}

fn duplicate_user_error(error: &sqlx::Error) -> ValidationErrors {
    let message = match error {
        sqlx::Error::Database(e) => e.message().to_owned(),
        _ => String::new(),
    };
    if message.contains("users.email") {
        ValidationErrors::single("email", "A user with that email already exists.")
    } else {
        ValidationErrors::single("username", "A user with that username already exists.")
    }
}

/// Resolves login credentials to a user id.
pub async fn authenticate_user(
    pool: &SqlitePool,
    email: &str,
    password: String,
) -> Result<i64, RequestError> {
    let invalid = || {
        RequestError::Validation(ValidationErrors::single(
            "non_field_errors",
            "Unable to log in with provided credentials.",
        ))
    };
    let mut conn = pool.acquire().await?;
    let user = get_user_by_email(&mut conn, email)
        .await?
        .ok_or_else(invalid)?;
    let is_password_correct = verify_password_argon2(password, user.password)
        .await
        .map_err(|_| RequestError::ServerError)?;
    if !is_password_correct {
        return Err(invalid());
    }
    Ok(user.id)
}

pub async fn set_password_in_db(
    pool: &SqlitePool,
    id: i64,
    current_password: String,
    new_password: String,
) -> Result<(), RequestError> {
    if new_password.is_empty() {
        return Err(ValidationErrors::single("new_password", "This field may not be blank.").into());
    }
    let mut tx = pool.begin().await?;
    let user = get_user_by_id(&mut tx, id)
        .await?
        .ok_or(RequestError::NotFound("User not found"))?;
    let is_password_correct = verify_password_argon2(current_password, user.password)
        .await
        .map_err(|_| RequestError::ServerError)?;
    if !is_password_correct {
        return Err(ValidationErrors::single("current_password", "Invalid password.").into());
    }
    let hashed_password = hash_password_argon2(new_password)
        .await
        .map_err(|_| RequestError::ServerError)?;
    sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
        .bind(hashed_password)
        .bind(id)
        .execute(&mut tx)
        .await?;
    tx.commit().await?;
    info!("User {} changed their password", id);
    Ok(())
}

pub async fn get_user_profile_in_db(
    pool: &SqlitePool,
    viewer: Option<i64>,
    id: i64,
) -> Result<UserResponse, RequestError> {
    let mut conn = pool.acquire().await?;
    let user = get_user_by_id(&mut conn, id)
        .await?
        .ok_or(RequestError::NotFound("User not found"))?;
    let following = super::is_subscribed(&mut conn, viewer, id).await?;
    Ok(UserResponse::new(user, following))
}

/// All users ordered by username, with the viewer's subscription flag.
pub async fn list_users_in_db(
    pool: &SqlitePool,
    viewer: Option<i64>,
) -> Result<Vec<UserResponse>, RequestError> {
    let mut conn = pool.acquire().await?;
    let users = sqlx::query_as::<Sqlite, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY username"
    ))
    .fetch_all(&mut conn)
    .await?;
    let mut result = Vec::with_capacity(users.len());
    for user in users {
        let following = super::is_subscribed(&mut conn, viewer, user.id).await?;
        result.push(UserResponse::new(user, following));
    }
    Ok(result)
}
