use std::collections::BTreeMap;

use sqlx::{FromRow, Sqlite, SqlitePool};

use crate::errors::{RequestError, ValidationErrors};

pub const EMPTY_SHOPPING_LIST: &str = "Your shopping cart is empty.";

/// One ingredient of one recipe in the cart.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct CartIngredientRow {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingListLine {
    pub name: String,
    pub measurement_unit: String,
    pub total_amount: i64,
}

/// Sums amounts per (name, unit), ordered by name then unit.
///
/// A total that does not fit in an `i64` is a validation error on the cart.
pub fn aggregate(
    rows: impl IntoIterator<Item = CartIngredientRow>,
) -> Result<Vec<ShoppingListLine>, RequestError> {
    let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
    for row in rows {
        let total = totals
            .entry((row.name, row.measurement_unit))
            .or_default();
        *total = total.checked_add(row.amount).ok_or_else(|| {
            ValidationErrors::single("shopping_cart", "Total amount is too large.")
        })?;
    }
    Ok(totals
        .into_iter()
        .map(|((name, measurement_unit), total_amount)| ShoppingListLine {
            name,
            measurement_unit,
            total_amount,
        })
        .collect())
}

pub fn render(recipes: &[String], lines: &[ShoppingListLine]) -> String {
    if recipes.is_empty() {
        return EMPTY_SHOPPING_LIST.to_owned();
    }
    let items = lines
        .iter()
        .map(|line| {
            format!(
                "{} - {} {}",
                line.name, line.total_amount, line.measurement_unit
            )
        })
        .collect::<Vec<_>>()
        .join(";\n");
    format!(
        "You picked the following recipes:\n{}.\n\nShopping list:\n{}.",
        recipes.join(", "),
        items
    )
}

/// Plain-text shopping list for everything in the user's cart.
pub async fn shopping_list_for(pool: &SqlitePool, user_id: i64) -> Result<String, RequestError> {
    let mut conn = pool.acquire().await?;
    let recipes = sqlx::query_scalar::<Sqlite, String>(
        r#"
        SELECT recipes.name
        FROM shopping_cart
        JOIN recipes ON recipes.id = shopping_cart.recipe_id
        WHERE shopping_cart.user_id = $1
        ORDER BY shopping_cart.created_at, shopping_cart.id
        "#,
    )
    .bind(user_id)
    .fetch_all(&mut conn)
    .await?;

    let rows = sqlx::query_as::<Sqlite, CartIngredientRow>(
        r#"
        SELECT ingredients.name, ingredients.measurement_unit, recipe_ingredients.amount
        FROM shopping_cart
        JOIN recipe_ingredients ON recipe_ingredients.recipe_id = shopping_cart.recipe_id
        JOIN ingredients ON ingredients.id = recipe_ingredients.ingredient_id
        WHERE shopping_cart.user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_all(&mut conn)
    .await?;

    let lines = aggregate(rows)?;
    Ok(render(&recipes, &lines))
}
