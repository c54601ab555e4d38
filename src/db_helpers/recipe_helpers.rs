use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::info;

use crate::{
    data_formats::{RecipeDraft, RecipeFilter, RecipeResponse, UserResponse},
    errors::{is_unique_violation, RequestError, ValidationErrors},
    models::Recipe,
};

use super::{get_recipe_ingredients, get_recipe_tags, get_user_by_id, is_subscribed};

const RECIPE_COLUMNS: &str = "recipes.id, recipes.author_id, recipes.name, recipes.image, \
                              recipes.text, recipes.cooking_time, recipes.pub_date";

pub(crate) async fn get_recipe_row(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<Recipe>, RequestError> {
    let result = sqlx::query_as::<Sqlite, Recipe>(&format!(
        "SELECT {RECIPE_COLUMNS} FROM recipes WHERE recipes.id = $1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(result)
}

/// The `limit` most recent recipes of an author, or all of them.
pub(crate) async fn get_recent_recipes_by_author(
    conn: &mut SqliteConnection,
    author_id: i64,
    limit: Option<i64>,
) -> Result<Vec<Recipe>, RequestError> {
    let result = sqlx::query_as::<Sqlite, Recipe>(&format!(
        r#"
        SELECT {RECIPE_COLUMNS} FROM recipes
        WHERE recipes.author_id = $1
        ORDER BY recipes.pub_date DESC, recipes.id DESC
        LIMIT $2
        "#
    ))
    .bind(author_id)
    // SQLite treats a negative LIMIT as "no limit".
    .bind(limit.unwrap_or(-1))
    .fetch_all(&mut *conn)
    .await?;
    Ok(result)
}

async fn relation_exists(
    conn: &mut SqliteConnection,
    table: &str,
    viewer: Option<i64>,
    recipe_id: i64,
) -> Result<bool, RequestError> {
    let Some(viewer) = viewer else {
        return Ok(false);
    };
    let result = sqlx::query_scalar::<Sqlite, bool>(&format!(
        "SELECT EXISTS (SELECT 1 FROM {table} WHERE user_id = $1 AND recipe_id = $2)"
    ))
    .bind(viewer)
    .bind(recipe_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(result)
}

/// Renders a recipe with its tags, ingredients, author and the viewer's flags.
pub(crate) async fn build_recipe_response(
    conn: &mut SqliteConnection,
    recipe: Recipe,
    viewer: Option<i64>,
) -> Result<RecipeResponse, RequestError> {
    let tags = get_recipe_tags(conn, recipe.id).await?;
    let ingredients = get_recipe_ingredients(conn, recipe.id).await?;
    let author = get_user_by_id(conn, recipe.author_id)
        .await?
        .ok_or(RequestError::ServerError)?;
    let following = is_subscribed(conn, viewer, author.id).await?;
    let is_favorited = relation_exists(conn, "favorites", viewer, recipe.id).await?;
    let is_in_shopping_cart = relation_exists(conn, "shopping_cart", viewer, recipe.id).await?;

    Ok(RecipeResponse {
        id: recipe.id,
        tags: tags.into_iter().map(Into::into).collect(),
        author: UserResponse::new(author, following),
        ingredients: ingredients.into_iter().map(Into::into).collect(),
        is_favorited,
        is_in_shopping_cart,
        name: recipe.name,
        image: recipe.image,
        text: recipe.text,
        cooking_time: recipe.cooking_time,
    })
}

pub async fn get_recipe_in_db(
    pool: &SqlitePool,
    viewer: Option<i64>,
    id: i64,
) -> Result<RecipeResponse, RequestError> {
    let mut conn = pool.acquire().await?;
    let recipe = get_recipe_row(&mut conn, id)
        .await?
        .ok_or(RequestError::NotFound("Recipe not found"))?;
    build_recipe_response(&mut conn, recipe, viewer).await
}

pub async fn hydrate_recipes_in_db(
    pool: &SqlitePool,
    viewer: Option<i64>,
    recipes: Vec<Recipe>,
) -> Result<Vec<RecipeResponse>, RequestError> {
    let mut conn = pool.acquire().await?;
    let mut result = Vec::with_capacity(recipes.len());
    for recipe in recipes {
        result.push(build_recipe_response(&mut conn, recipe, viewer).await?);
    }
    Ok(result)
}

// ----------------- Listing -----------------

async fn ensure_tag_slugs_exist(
    conn: &mut SqliteConnection,
    slugs: &[String],
) -> Result<(), RequestError> {
    let mut errors = ValidationErrors::new();
    for slug in slugs {
        let exists = sqlx::query_scalar::<Sqlite, bool>(
            "SELECT EXISTS (SELECT 1 FROM tags WHERE slug = $1)",
        )
        .bind(slug)
        .fetch_one(&mut *conn)
        .await?;
        if !exists {
            errors.add(
                "tags",
                format!("Select a valid choice. {slug} is not one of the available choices."),
            );
        }
    }
    errors.into_result()
}

/// Every recipe matching `filter`, in display order.
///
/// A truthy relation flag restricts to the viewer's relation rows and orders by
/// when they were added, newest first. With both flags set, cart order wins.
/// Every tag slug must name an existing tag.
pub async fn list_recipes_in_db(
    pool: &SqlitePool,
    viewer: Option<i64>,
    filter: &RecipeFilter,
) -> Result<Vec<Recipe>, RequestError> {
    let mut conn = pool.acquire().await?;
    ensure_tag_slugs_exist(&mut conn, &filter.tags).await?;

    let relation_filtered = filter.is_favorited || filter.is_in_shopping_cart;
    let viewer = match viewer {
        Some(viewer) => viewer,
        None if relation_filtered => return Ok(Vec::new()),
        None => 0,
    };

    let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT {RECIPE_COLUMNS} FROM recipes"));
    if filter.is_favorited {
        query
            .push(" JOIN favorites ON favorites.recipe_id = recipes.id AND favorites.user_id = ")
            .push_bind(viewer);
    }
    if filter.is_in_shopping_cart {
        query
            .push(
                " JOIN shopping_cart ON shopping_cart.recipe_id = recipes.id \
                 AND shopping_cart.user_id = ",
            )
            .push_bind(viewer);
    }
    query.push(" WHERE 1 = 1");
    if let Some(author) = filter.author {
        query.push(" AND recipes.author_id = ").push_bind(author);
    }
    if !filter.tags.is_empty() {
        query.push(
            " AND EXISTS (SELECT 1 FROM recipe_tags \
             JOIN tags ON tags.id = recipe_tags.tag_id \
             WHERE recipe_tags.recipe_id = recipes.id AND tags.slug IN (",
        );
        {
            let mut slugs = query.separated(", ");
            for slug in &filter.tags {
                slugs.push_bind(slug.clone());
            }
        }
        query.push("))");
    }
    if filter.is_in_shopping_cart {
        query.push(" ORDER BY shopping_cart.created_at DESC, shopping_cart.id DESC");
    } else if filter.is_favorited {
        query.push(" ORDER BY favorites.created_at DESC, favorites.id DESC");
    } else {
        query.push(" ORDER BY recipes.pub_date DESC, recipes.name, recipes.id DESC");
    }

    let result = query
        .build_query_as::<Recipe>()
        .fetch_all(&mut conn)
        .await?;
    Ok(result)
}

// ----------------- Composition -----------------

async fn ensure_references_exist(
    conn: &mut SqliteConnection,
    draft: &RecipeDraft,
) -> Result<(), RequestError> {
    let mut errors = ValidationErrors::new();
    for item in &draft.ingredients {
        let exists = sqlx::query_scalar::<Sqlite, bool>(
            "SELECT EXISTS (SELECT 1 FROM ingredients WHERE id = $1)",
        )
        .bind(item.id)
        .fetch_one(&mut *conn)
        .await?;
        if !exists {
            errors.add("ingredients", format!("ingredient {} not found", item.id));
        }
    }
    for tag in &draft.tags {
        let exists =
            sqlx::query_scalar::<Sqlite, bool>("SELECT EXISTS (SELECT 1 FROM tags WHERE id = $1)")
                .bind(*tag)
                .fetch_one(&mut *conn)
                .await?;
        if !exists {
            errors.add("tags", format!("tag {} not found", tag));
        }
    }
    errors.into_result()
}

async fn insert_children(
    conn: &mut SqliteConnection,
    recipe_id: i64,
    draft: &RecipeDraft,
) -> Result<(), RequestError> {
    for item in &draft.ingredients {
        sqlx::query(
            r#"
            INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(recipe_id)
        .bind(item.id)
        .bind(item.amount)
        .execute(&mut *conn)
        .await?;
    }
    for tag in &draft.tags {
        sqlx::query("INSERT INTO recipe_tags (recipe_id, tag_id) VALUES ($1, $2)")
            .bind(recipe_id)
            .bind(*tag)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

fn required<'a, T: ?Sized>(field: &str, value: Option<&'a T>) -> Result<&'a T, RequestError> {
    value.ok_or_else(|| ValidationErrors::single(field, format!("{field} required")).into())
}

fn duplicate_name_error() -> RequestError {
    ValidationErrors::single("name", "You already have a recipe with this name.").into()
}

/// Inserts the recipe, its ingredient lines and its tags in one transaction.
pub async fn create_recipe_in_db(
    pool: &SqlitePool,
    author_id: i64,
    draft: &RecipeDraft,
    image: &str,
) -> Result<i64, RequestError> {
    let name = required("name", draft.name.as_deref())?;
    let text = required("text", draft.text.as_deref())?;
    let cooking_time = *required("cooking_time", draft.cooking_time.as_ref())?;

    let mut tx = pool.begin().await?;
    ensure_references_exist(&mut tx, draft).await?;

    let recipe_id = sqlx::query_scalar::<Sqlite, i64>(
        r#"
        INSERT INTO recipes (author_id, name, image, text, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(author_id)
    .bind(name)
    .bind(image)
    .bind(text)
    .bind(cooking_time)
    .fetch_one(&mut tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            duplicate_name_error()
        } else {
            e.into()
        }
    })?;

    insert_children(&mut tx, recipe_id, draft).await?;
    tx.commit().await?;
    info!("User {} created recipe {}", author_id, recipe_id);
    Ok(recipe_id)
}

/// Replaces, wholesale, the recipe's ingredient lines and tags, and whichever
/// scalars the draft carries.
///
/// Returns the image the recipe pointed at before, when a new one replaced it.
pub async fn update_recipe_in_db(
    pool: &SqlitePool,
    user_id: i64,
    recipe_id: i64,
    draft: &RecipeDraft,
    image: Option<&str>,
) -> Result<Option<String>, RequestError> {
    let mut tx = pool.begin().await?;
    let recipe = get_recipe_row(&mut tx, recipe_id)
        .await?
        .ok_or(RequestError::NotFound("Recipe not found"))?;
    if recipe.author_id != user_id {
        return Err(RequestError::Forbidden("You can only change your own recipes"));
    }
    ensure_references_exist(&mut tx, draft).await?;

    sqlx::query(
        r#"
        UPDATE recipes
        SET name = COALESCE($1, name),
            text = COALESCE($2, text),
            cooking_time = COALESCE($3, cooking_time),
            image = COALESCE($4, image)
        WHERE id = $5
        "#,
    )
    .bind(draft.name.as_deref())
    .bind(draft.text.as_deref())
    .bind(draft.cooking_time)
    .bind(image)
    .bind(recipe_id)
    .execute(&mut tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            duplicate_name_error()
        } else {
            RequestError::from(e)
        }
    })?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut tx)
        .await?;
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut tx)
        .await?;
    insert_children(&mut tx, recipe_id, draft).await?;

    tx.commit().await?;
    info!("User {} updated recipe {}", user_id, recipe_id);
    Ok(image.map(|_| recipe.image))
}

/// Deletes the recipe and, by cascade, everything hanging off it.
///
/// Returns the image the recipe pointed at.
pub async fn delete_recipe_in_db(
    pool: &SqlitePool,
    user_id: i64,
    recipe_id: i64,
) -> Result<String, RequestError> {
    let mut tx = pool.begin().await?;
    let recipe = get_recipe_row(&mut tx, recipe_id)
        .await?
        .ok_or(RequestError::NotFound("Recipe not found"))?;
    if recipe.author_id != user_id {
        return Err(RequestError::Forbidden("You can only delete your own recipes"));
    }
    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(recipe_id)
        .execute(&mut tx)
        .await?;
    tx.commit().await?;
    info!("User {} deleted recipe {}", user_id, recipe_id);
    Ok(recipe.image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db_helpers::{add_relation, RelationKind, SubscriptionView},
        test_utils::{create_ingredient, create_recipe, create_user, draft, setup_test_db, tag_id},
    };

    fn ingredient_ids(response: &RecipeResponse) -> Vec<(i64, i64)> {
        let mut ids: Vec<_> = response
            .ingredients
            .iter()
            .map(|i| (i.id, i.amount))
            .collect();
        ids.sort();
        ids
    }

    fn tag_ids(response: &RecipeResponse) -> Vec<i64> {
        let mut ids: Vec<_> = response.tags.iter().map(|t| t.id).collect();
        ids.sort();
        ids
    }

    async fn favorite(pool: &SqlitePool, user: i64, recipe: i64) {
        add_relation(
            pool,
            user,
            recipe,
            RelationKind::Favorite,
            SubscriptionView::default(),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn create_persists_exactly_the_submitted_associations() {
        let pool = setup_test_db().await;
        let author = create_user(&pool, "anna").await;
        let flour = create_ingredient(&pool, "flour", "g").await;
        let milk = create_ingredient(&pool, "milk", "ml").await;
        create_ingredient(&pool, "salt", "g").await;
        let breakfast = tag_id(&pool, "breakfast").await;
        let lunch = tag_id(&pool, "lunch").await;

        let id = create_recipe(
            &pool,
            author,
            "Pancakes",
            &[(flour, 200), (milk, 300)],
            &[breakfast, lunch],
        )
        .await;

        let response = get_recipe_in_db(&pool, Some(author), id).await.unwrap();
        assert_eq!(ingredient_ids(&response), vec![(flour, 200), (milk, 300)]);
        let mut expected_tags = vec![breakfast, lunch];
        expected_tags.sort();
        assert_eq!(tag_ids(&response), expected_tags);
        assert_eq!(response.author.id, author);
        assert!(!response.is_favorited);
        assert!(!response.is_in_shopping_cart);
        assert_eq!(response.ingredients[0].name, "flour");
        assert_eq!(response.ingredients[0].measurement_unit, "g");
    }

    #[tokio::test]
    async fn update_replaces_ingredients_and_tags_wholesale() {
        let pool = setup_test_db().await;
        let author = create_user(&pool, "anna").await;
        let flour = create_ingredient(&pool, "flour", "g").await;
        let milk = create_ingredient(&pool, "milk", "ml").await;
        let eggs = create_ingredient(&pool, "eggs", "pcs").await;
        let breakfast = tag_id(&pool, "breakfast").await;
        let dinner = tag_id(&pool, "dinner").await;
        let id = create_recipe(
            &pool,
            author,
            "Pancakes",
            &[(flour, 200), (milk, 300)],
            &[breakfast],
        )
        .await;

        let update = draft("Crepes", &[(eggs, 2), (milk, 100)], &[dinner]);
        let previous_image = update_recipe_in_db(&pool, author, id, &update, None)
            .await
            .unwrap();
        assert!(previous_image.is_none());

        let response = get_recipe_in_db(&pool, None, id).await.unwrap();
        assert_eq!(response.name, "Crepes");
        let mut expected = vec![(eggs, 2), (milk, 100)];
        expected.sort();
        assert_eq!(ingredient_ids(&response), expected);
        assert!(response.ingredients.iter().all(|i| i.id != flour));
        assert_eq!(tag_ids(&response), vec![dinner]);
    }

    #[tokio::test]
    async fn partial_update_keeps_omitted_scalars() {
        let pool = setup_test_db().await;
        let author = create_user(&pool, "anna").await;
        let flour = create_ingredient(&pool, "flour", "g").await;
        let eggs = create_ingredient(&pool, "eggs", "pcs").await;
        let breakfast = tag_id(&pool, "breakfast").await;
        let lunch = tag_id(&pool, "lunch").await;
        let id = create_recipe(&pool, author, "Bread", &[(flour, 500)], &[breakfast]).await;

        let update = RecipeDraft {
            name: None,
            text: None,
            cooking_time: None,
            ..draft("ignored", &[(eggs, 3)], &[lunch])
        };
        update_recipe_in_db(&pool, author, id, &update, None)
            .await
            .unwrap();

        let response = get_recipe_in_db(&pool, None, id).await.unwrap();
        assert_eq!(response.name, "Bread");
        assert_eq!(response.text, "How to make Bread");
        assert_eq!(response.cooking_time, 10);
        assert_eq!(response.image, "/media/recipes_images/test.png");
        assert_eq!(ingredient_ids(&response), vec![(eggs, 3)]);
        assert_eq!(tag_ids(&response), vec![lunch]);
    }

    #[tokio::test]
    async fn create_requires_every_scalar() {
        let pool = setup_test_db().await;
        let author = create_user(&pool, "anna").await;
        let flour = create_ingredient(&pool, "flour", "g").await;
        let breakfast = tag_id(&pool, "breakfast").await;

        let incomplete = RecipeDraft {
            cooking_time: None,
            ..draft("Bread", &[(flour, 1)], &[breakfast])
        };
        match create_recipe_in_db(&pool, author, &incomplete, "/media/x.png").await {
            Err(RequestError::Validation(errors)) => {
                assert_eq!(errors.get("cooking_time").unwrap(), ["cooking_time required"]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn update_with_new_image_reports_the_old_one() {
        let pool = setup_test_db().await;
        let author = create_user(&pool, "anna").await;
        let flour = create_ingredient(&pool, "flour", "g").await;
        let breakfast = tag_id(&pool, "breakfast").await;
        let id = create_recipe(&pool, author, "Bread", &[(flour, 500)], &[breakfast]).await;

        let update = draft("Bread", &[(flour, 450)], &[breakfast]);
        let previous = update_recipe_in_db(&pool, author, id, &update, Some("/media/new.png"))
            .await
            .unwrap();
        assert_eq!(previous.as_deref(), Some("/media/recipes_images/test.png"));
        let response = get_recipe_in_db(&pool, None, id).await.unwrap();
        assert_eq!(response.image, "/media/new.png");
    }

    #[tokio::test]
    async fn only_the_author_may_change_a_recipe() {
        let pool = setup_test_db().await;
        let author = create_user(&pool, "anna").await;
        let stranger = create_user(&pool, "boris").await;
        let flour = create_ingredient(&pool, "flour", "g").await;
        let breakfast = tag_id(&pool, "breakfast").await;
        let id = create_recipe(&pool, author, "Bread", &[(flour, 500)], &[breakfast]).await;

        let update = draft("Stolen bread", &[(flour, 1)], &[breakfast]);
        assert!(matches!(
            update_recipe_in_db(&pool, stranger, id, &update, None).await,
            Err(RequestError::Forbidden(_))
        ));
        assert!(matches!(
            delete_recipe_in_db(&pool, stranger, id).await,
            Err(RequestError::Forbidden(_))
        ));
        assert!(matches!(
            update_recipe_in_db(&pool, author, 999, &update, None).await,
            Err(RequestError::NotFound(_))
        ));

        let response = get_recipe_in_db(&pool, None, id).await.unwrap();
        assert_eq!(response.name, "Bread");
    }

    #[tokio::test]
    async fn unknown_references_fail_without_partial_writes() {
        let pool = setup_test_db().await;
        let author = create_user(&pool, "anna").await;
        let flour = create_ingredient(&pool, "flour", "g").await;
        let breakfast = tag_id(&pool, "breakfast").await;

        let bad = draft("Mystery", &[(flour, 1), (404, 2)], &[breakfast, 505]);
        let error = create_recipe_in_db(&pool, author, &bad, "/media/x.png")
            .await
            .unwrap_err();
        match error {
            RequestError::Validation(errors) => {
                assert_eq!(
                    errors.get("ingredients").unwrap(),
                    ["ingredient 404 not found"]
                );
                assert_eq!(errors.get("tags").unwrap(), ["tag 505 not found"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        let all = list_recipes_in_db(&pool, None, &RecipeFilter::default())
            .await
            .unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn recipe_names_are_unique_per_author() {
        let pool = setup_test_db().await;
        let anna = create_user(&pool, "anna").await;
        let boris = create_user(&pool, "boris").await;
        let flour = create_ingredient(&pool, "flour", "g").await;
        let breakfast = tag_id(&pool, "breakfast").await;
        create_recipe(&pool, anna, "Bread", &[(flour, 500)], &[breakfast]).await;

        let again = draft("Bread", &[(flour, 1)], &[breakfast]);
        assert!(matches!(
            create_recipe_in_db(&pool, anna, &again, "/media/x.png").await,
            Err(RequestError::Validation(_))
        ));
        assert!(create_recipe_in_db(&pool, boris, &again, "/media/x.png")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn deleting_a_recipe_cascades_to_relations() {
        let pool = setup_test_db().await;
        let author = create_user(&pool, "anna").await;
        let fan = create_user(&pool, "boris").await;
        let flour = create_ingredient(&pool, "flour", "g").await;
        let breakfast = tag_id(&pool, "breakfast").await;
        let id = create_recipe(&pool, author, "Bread", &[(flour, 500)], &[breakfast]).await;
        favorite(&pool, fan, id).await;

        let image = delete_recipe_in_db(&pool, author, id).await.unwrap();
        assert_eq!(image, "/media/recipes_images/test.png");

        let favorites: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM favorites")
            .fetch_one(&pool)
            .await
            .unwrap();
        let lines: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM recipe_ingredients")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!((favorites, lines), (0, 0));
        assert!(matches!(
            get_recipe_in_db(&pool, None, id).await,
            Err(RequestError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn tag_filter_matches_any_selected_tag() {
        let pool = setup_test_db().await;
        let author = create_user(&pool, "anna").await;
        let flour = create_ingredient(&pool, "flour", "g").await;
        let breakfast = tag_id(&pool, "breakfast").await;
        let lunch = tag_id(&pool, "lunch").await;
        let dinner = tag_id(&pool, "dinner").await;
        let morning = create_recipe(&pool, author, "Porridge", &[(flour, 1)], &[breakfast]).await;
        let noon = create_recipe(&pool, author, "Soup", &[(flour, 1)], &[lunch, breakfast]).await;
        create_recipe(&pool, author, "Steak", &[(flour, 1)], &[dinner]).await;

        let filter = RecipeFilter {
            tags: vec!["breakfast".to_owned(), "lunch".to_owned()],
            ..Default::default()
        };
        let mut ids: Vec<_> = list_recipes_in_db(&pool, None, &filter)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec![morning, noon]);
    }

    #[tokio::test]
    async fn unknown_tag_slug_is_a_field_error() {
        let pool = setup_test_db().await;
        let filter = RecipeFilter {
            tags: vec!["breakfast".to_owned(), "brunch".to_owned()],
            ..Default::default()
        };
        match list_recipes_in_db(&pool, None, &filter).await {
            Err(RequestError::Validation(errors)) => assert_eq!(
                errors.get("tags").unwrap(),
                ["Select a valid choice. brunch is not one of the available choices."]
            ),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn author_filter_is_exact() {
        let pool = setup_test_db().await;
        let anna = create_user(&pool, "anna").await;
        let boris = create_user(&pool, "boris").await;
        let flour = create_ingredient(&pool, "flour", "g").await;
        let breakfast = tag_id(&pool, "breakfast").await;
        let mine = create_recipe(&pool, anna, "Bread", &[(flour, 1)], &[breakfast]).await;
        create_recipe(&pool, boris, "Bread", &[(flour, 1)], &[breakfast]).await;

        let filter = RecipeFilter {
            author: Some(anna),
            ..Default::default()
        };
        let ids: Vec<_> = list_recipes_in_db(&pool, None, &filter)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![mine]);
    }

    #[tokio::test]
    async fn favorited_filter_returns_only_favorites_newest_first() {
        let pool = setup_test_db().await;
        let author = create_user(&pool, "anna").await;
        let fan = create_user(&pool, "boris").await;
        let other = create_user(&pool, "clara").await;
        let flour = create_ingredient(&pool, "flour", "g").await;
        let breakfast = tag_id(&pool, "breakfast").await;
        let first = create_recipe(&pool, author, "One", &[(flour, 1)], &[breakfast]).await;
        let second = create_recipe(&pool, author, "Two", &[(flour, 1)], &[breakfast]).await;
        let third = create_recipe(&pool, author, "Three", &[(flour, 1)], &[breakfast]).await;
        favorite(&pool, fan, second).await;
        favorite(&pool, fan, first).await;
        favorite(&pool, other, third).await;

        let filter = RecipeFilter {
            is_favorited: true,
            ..Default::default()
        };
        let ids: Vec<_> = list_recipes_in_db(&pool, Some(fan), &filter)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![first, second]);

        let anonymous = list_recipes_in_db(&pool, None, &filter).await.unwrap();
        assert!(anonymous.is_empty());

        let everything = list_recipes_in_db(&pool, Some(fan), &RecipeFilter::default())
            .await
            .unwrap();
        assert_eq!(everything.len(), 3);
    }

    #[tokio::test]
    async fn response_flags_reflect_the_viewer() {
        let pool = setup_test_db().await;
        let author = create_user(&pool, "anna").await;
        let fan = create_user(&pool, "boris").await;
        let flour = create_ingredient(&pool, "flour", "g").await;
        let breakfast = tag_id(&pool, "breakfast").await;
        let id = create_recipe(&pool, author, "Bread", &[(flour, 1)], &[breakfast]).await;
        favorite(&pool, fan, id).await;
        add_relation(
            &pool,
            fan,
            id,
            RelationKind::ShoppingCart,
            SubscriptionView::default(),
        )
        .await
        .unwrap();
        add_relation(
            &pool,
            fan,
            author,
            RelationKind::Follow,
            SubscriptionView::default(),
        )
        .await
        .unwrap();

        let seen_by_fan = get_recipe_in_db(&pool, Some(fan), id).await.unwrap();
        assert!(seen_by_fan.is_favorited);
        assert!(seen_by_fan.is_in_shopping_cart);
        assert!(seen_by_fan.author.is_subscribed);

        let seen_by_author = get_recipe_in_db(&pool, Some(author), id).await.unwrap();
        assert!(!seen_by_author.is_favorited);
        assert!(!seen_by_author.author.is_subscribed);
    }
}
