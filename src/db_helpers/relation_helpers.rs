use sqlx::{Sqlite, SqliteConnection, SqlitePool};
use tracing::info;

use crate::{
    data_formats::{RecipeShortResponse, RelationTarget},
    errors::{is_unique_violation, RequestError},
};

use super::{build_subscription_response, get_recipe_row, get_user_by_id, SubscriptionView};

/// A user's membership in one of the user→target association tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    Favorite,
    ShoppingCart,
    Follow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationMessages {
    pub target_missing: &'static str,
    pub already_added: &'static str,
    pub not_added: &'static str,
}

const SELF_FOLLOW: &str = "You cannot subscribe to yourself";

impl RelationKind {
    fn target_table(self) -> &'static str {
        match self {
            RelationKind::Favorite | RelationKind::ShoppingCart => "recipes",
            RelationKind::Follow => "users",
        }
    }

    fn join_table(self) -> &'static str {
        match self {
            RelationKind::Favorite => "favorites",
            RelationKind::ShoppingCart => "shopping_cart",
            RelationKind::Follow => "follows",
        }
    }

    fn target_column(self) -> &'static str {
        match self {
            RelationKind::Favorite | RelationKind::ShoppingCart => "recipe_id",
            RelationKind::Follow => "author_id",
        }
    }

    pub fn messages(self) -> RelationMessages {
        match self {
            RelationKind::Favorite => RelationMessages {
                target_missing: "Cannot add a non-existent recipe to favorites",
                already_added: "Recipe is already in favorites",
                not_added: "Recipe was not in favorites",
            },
            RelationKind::ShoppingCart => RelationMessages {
                target_missing: "Cannot add a non-existent recipe to the shopping cart",
                already_added: "Recipe is already in the shopping cart",
                not_added: "Recipe was not in the shopping cart",
            },
            RelationKind::Follow => RelationMessages {
                target_missing: "Cannot subscribe to a non-existent user",
                already_added: "You are already subscribed to this user",
                not_added: "You were not subscribed to this user",
            },
        }
    }
}

async fn target_exists(
    conn: &mut SqliteConnection,
    kind: RelationKind,
    target_id: i64,
) -> Result<bool, RequestError> {
    let result = sqlx::query_scalar::<Sqlite, bool>(&format!(
        "SELECT EXISTS (SELECT 1 FROM {} WHERE id = $1)",
        kind.target_table()
    ))
    .bind(target_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(result)
}

async fn project_target(
    conn: &mut SqliteConnection,
    kind: RelationKind,
    user_id: i64,
    target_id: i64,
    view: SubscriptionView,
) -> Result<RelationTarget, RequestError> {
    match kind {
        RelationKind::Favorite | RelationKind::ShoppingCart => {
            let recipe = get_recipe_row(conn, target_id)
                .await?
                .ok_or(RequestError::NotFound(kind.messages().target_missing))?;
            Ok(RelationTarget::Recipe(RecipeShortResponse::from(recipe)))
        }
        RelationKind::Follow => {
            let author = get_user_by_id(conn, target_id)
                .await?
                .ok_or(RequestError::NotFound(kind.messages().target_missing))?;
            let subscription = build_subscription_response(conn, Some(user_id), author, view).await?;
            Ok(RelationTarget::Author(subscription))
        }
    }
}

/// Records that `user_id` holds the relation to `target_id`.
pub async fn add_relation(
    pool: &SqlitePool,
    user_id: i64,
    target_id: i64,
    kind: RelationKind,
    view: SubscriptionView,
) -> Result<RelationTarget, RequestError> {
    let messages = kind.messages();
    let mut tx = pool.begin().await?;
    if !target_exists(&mut tx, kind, target_id).await? {
        return Err(RequestError::NotFound(messages.target_missing));
    }
    if kind == RelationKind::Follow && target_id == user_id {
        return Err(RequestError::Forbidden(SELF_FOLLOW));
    }

    let inserted = sqlx::query(&format!(
        "INSERT INTO {} (user_id, {}) VALUES ($1, $2)",
        kind.join_table(),
        kind.target_column()
    ))
    .bind(user_id)
    .bind(target_id)
    .execute(&mut tx)
    .await;
    match inserted {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => {
            return Err(RequestError::Conflict(messages.already_added));
        }
        Err(e) => return Err(e.into()),
    }

    let projection = project_target(&mut tx, kind, user_id, target_id, view).await?;
    tx.commit().await?;
    info!("User {} added {:?} relation to {}", user_id, kind, target_id);
    Ok(projection)
}

/// Drops the relation; fails if it was never recorded.
pub async fn remove_relation(
    pool: &SqlitePool,
    user_id: i64,
    target_id: i64,
    kind: RelationKind,
) -> Result<(), RequestError> {
    let messages = kind.messages();
    let mut tx = pool.begin().await?;
    if !target_exists(&mut tx, kind, target_id).await? {
        return Err(RequestError::NotFound(messages.target_missing));
    }

    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE user_id = $1 AND {} = $2",
        kind.join_table(),
        kind.target_column()
    ))
    .bind(user_id)
    .bind(target_id)
    .execute(&mut tx)
    .await?;
    if result.rows_affected() == 0 {
        return Err(RequestError::NotFound(messages.not_added));
    }

    tx.commit().await?;
    info!("User {} removed {:?} relation to {}", user_id, kind, target_id);
    Ok(())
}
