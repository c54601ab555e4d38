use sqlx::{Sqlite, SqliteConnection, SqlitePool};

use crate::{errors::RequestError, models::Tag};

pub async fn get_tags_in_db(pool: &SqlitePool) -> Result<Vec<Tag>, RequestError> {
    let mut conn = pool.acquire().await?;
    let result = sqlx::query_as::<Sqlite, Tag>("SELECT id, name, color, slug FROM tags ORDER BY name")
        .fetch_all(&mut conn)
        .await?;
    Ok(result)
}

pub async fn get_tag_in_db(pool: &SqlitePool, id: i64) -> Result<Tag, RequestError> {
    let mut conn = pool.acquire().await?;
    sqlx::query_as::<Sqlite, Tag>("SELECT id, name, color, slug FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut conn)
        .await?
        .ok_or(RequestError::NotFound("Tag not found"))
}

pub(crate) async fn get_recipe_tags(
    conn: &mut SqliteConnection,
    recipe_id: i64,
) -> Result<Vec<Tag>, RequestError> {
    let result = sqlx::query_as::<Sqlite, Tag>(
        r#"
        SELECT tags.id, tags.name, tags.color, tags.slug
        FROM tags
        JOIN recipe_tags ON recipe_tags.tag_id = tags.id
        WHERE recipe_tags.recipe_id = $1
        ORDER BY tags.name
        "#,
    )
    .bind(recipe_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_test_db;

    #[tokio::test]
    async fn seeded_tags_are_listed_by_name() {
        let pool = setup_test_db().await;
        let slugs: Vec<_> = get_tags_in_db(&pool)
            .await
            .unwrap()
            .into_iter()
            .map(|tag| tag.slug)
            .collect();
        assert_eq!(slugs, ["breakfast", "dinner", "lunch"]);
    }

    #[tokio::test]
    async fn unknown_tag_is_not_found() {
        let pool = setup_test_db().await;
        assert!(matches!(
            get_tag_in_db(&pool, 999).await,
            Err(RequestError::NotFound(_))
        ));
    }
}
