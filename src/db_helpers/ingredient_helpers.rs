use sqlx::{Sqlite, SqliteConnection, SqlitePool};

use crate::{
    errors::RequestError,
    models::{Ingredient, RecipeIngredient},
};

/// Ingredients ordered by name, optionally restricted to a case-sensitive name prefix.
pub async fn list_ingredients_in_db(
    pool: &SqlitePool,
    name_prefix: Option<&str>,
) -> Result<Vec<Ingredient>, RequestError> {
    let mut conn = pool.acquire().await?;
    let result = sqlx::query_as::<Sqlite, Ingredient>(
        r#"
        SELECT id, name, measurement_unit
        FROM ingredients
        WHERE $1 IS NULL OR substr(name, 1, length($1)) = $1
        ORDER BY name, measurement_unit
        "#,
    )
    .bind(name_prefix)
    .fetch_all(&mut conn)
    .await?;
    Ok(result)
}

pub async fn get_ingredient_in_db(pool: &SqlitePool, id: i64) -> Result<Ingredient, RequestError> {
    let mut conn = pool.acquire().await?;
    sqlx::query_as::<Sqlite, Ingredient>(
        "SELECT id, name, measurement_unit FROM ingredients WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&mut conn)
    .await?
    .ok_or(RequestError::NotFound("Ingredient not found"))
}

pub(crate) async fn get_recipe_ingredients(
    conn: &mut SqliteConnection,
    recipe_id: i64,
) -> Result<Vec<RecipeIngredient>, RequestError> {
    let result = sqlx::query_as::<Sqlite, RecipeIngredient>(
        r#"
        SELECT ingredients.id, ingredients.name, ingredients.measurement_unit, recipe_ingredients.amount
        FROM recipe_ingredients
        JOIN ingredients ON ingredients.id = recipe_ingredients.ingredient_id
        WHERE recipe_ingredients.recipe_id = $1
        ORDER BY ingredients.name, ingredients.id
        "#,
    )
    .bind(recipe_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(result)
}
