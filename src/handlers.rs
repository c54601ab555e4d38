use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::{header, StatusCode, Uri},
    response::IntoResponse,
    Extension, Json,
};
use sqlx::SqlitePool;
use tracing::error;

use crate::{
    authentication::{get_jwt_token, AuthUser, MaybeUser},
    config::Config,
    data_formats::*,
    db_helpers::*,
    errors::RequestError,
    media::{remove_image, store_image, ImageUpload},
    JsonResponse,
};

type JsonResult<T> = Result<Json<T>, RequestError>;
type CreatedResult<T> = Result<JsonResponse<T>, RequestError>;

// ----------------- Helper Handlers -----------------
pub async fn alive() -> &'static str {
    "alive"
}

pub async fn not_found(uri: Uri) -> Result<(), (StatusCode, String)> {
    Err((
        StatusCode::NOT_FOUND,
        format!("URL {} provided was not found", uri),
    ))
}

async fn save_upload(config: &Config, upload: &ImageUpload) -> Result<String, RequestError> {
    store_image(config, upload).await.map_err(|e| {
        error!("Could not store uploaded image: {}", e);
        RequestError::ServerError
    })
}

// ----------------- Auth Handlers -----------------
pub async fn login_user(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Extension(config): Extension<Arc<Config>>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> JsonResult<TokenResponse> {
    let id = authenticate_user(&pool, &request.email, request.password).await?;
    let auth_token = get_jwt_token(id, &config.jwt_secret).map_err(|e| {
        error!("Could not generate JWT: {}", e);
        RequestError::ServerError
    })?;
    Ok(Json(TokenResponse { auth_token }))
}

pub async fn logout_user(_user: AuthUser) -> StatusCode {
    StatusCode::NO_CONTENT
}

// ----------------- User Handlers -----------------
pub async fn register_user(
    Extension(pool): Extension<Arc<SqlitePool>>,
    JsonBody(request): JsonBody<RegisterRequest>,
) -> CreatedResult<CreatedUserResponse> {
    let user = insert_user(&pool, request).await?;
    Ok((StatusCode::CREATED, Json(CreatedUserResponse::from(user))))
}

pub async fn list_users(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Extension(config): Extension<Arc<Config>>,
    maybe_user: MaybeUser,
    Query(params): Query<PageParams>,
    uri: Uri,
) -> JsonResult<Page<UserResponse>> {
    let users = list_users_in_db(&pool, maybe_user.get_id()).await?;
    Ok(Json(paginate(users, params, config.page_size, &uri)?))
}

pub async fn get_user(
    Extension(pool): Extension<Arc<SqlitePool>>,
    maybe_user: MaybeUser,
    Path(id): Path<i64>,
) -> JsonResult<UserResponse> {
    let user = get_user_profile_in_db(&pool, maybe_user.get_id(), id).await?;
    Ok(Json(user))
}

pub async fn get_current_user(
    Extension(pool): Extension<Arc<SqlitePool>>,
    user: AuthUser,
) -> JsonResult<UserResponse> {
    let user = get_user_profile_in_db(&pool, Some(user.id), user.id).await?;
    Ok(Json(user))
}

pub async fn set_password(
    Extension(pool): Extension<Arc<SqlitePool>>,
    user: AuthUser,
    JsonBody(request): JsonBody<SetPasswordRequest>,
) -> Result<StatusCode, RequestError> {
    set_password_in_db(
        &pool,
        user.id,
        request.current_password,
        request.new_password,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ----------------- Subscription Handlers -----------------
fn subscription_view(
    config: &Config,
    params: &SubscriptionQueryParams,
) -> Result<SubscriptionView, RequestError> {
    Ok(SubscriptionView {
        recipes_limit: params.recipes_limit()?,
        count_mode: config.recipes_count_mode,
    })
}

pub async fn list_subscriptions(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Extension(config): Extension<Arc<Config>>,
    user: AuthUser,
    Query(params): Query<SubscriptionQueryParams>,
    uri: Uri,
) -> JsonResult<Page<SubscriptionResponse>> {
    let view = subscription_view(&config, &params)?;
    let authors = list_followed_authors_in_db(&pool, user.id).await?;
    let mut page = paginate(authors, params.page_params(), config.page_size, &uri)?;
    let authors = std::mem::take(&mut page.results);
    let subscriptions = hydrate_subscriptions_in_db(&pool, user.id, authors, view).await?;
    Ok(Json(page.with_results(subscriptions)))
}

pub async fn subscribe(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Extension(config): Extension<Arc<Config>>,
    user: AuthUser,
    Path(author_id): Path<i64>,
    Query(params): Query<SubscriptionQueryParams>,
) -> CreatedResult<RelationTarget> {
    let view = subscription_view(&config, &params)?;
    let target = add_relation(&pool, user.id, author_id, RelationKind::Follow, view).await?;
    Ok((StatusCode::CREATED, Json(target)))
}

pub async fn unsubscribe(
    Extension(pool): Extension<Arc<SqlitePool>>,
    user: AuthUser,
    Path(author_id): Path<i64>,
) -> Result<StatusCode, RequestError> {
    remove_relation(&pool, user.id, author_id, RelationKind::Follow).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ----------------- Tag & Ingredient Handlers -----------------
pub async fn list_tags(Extension(pool): Extension<Arc<SqlitePool>>) -> JsonResult<Vec<TagResponse>> {
    let tags = get_tags_in_db(&pool).await?;
    Ok(Json(tags.into_iter().map(TagResponse::from).collect()))
}

pub async fn get_tag(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Path(id): Path<i64>,
) -> JsonResult<TagResponse> {
    Ok(Json(get_tag_in_db(&pool, id).await?.into()))
}

pub async fn list_ingredients(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Query(params): Query<IngredientQueryParams>,
) -> JsonResult<Vec<IngredientResponse>> {
    let ingredients = list_ingredients_in_db(&pool, params.name.as_deref()).await?;
    Ok(Json(
        ingredients
            .into_iter()
            .map(IngredientResponse::from)
            .collect(),
    ))
}

pub async fn get_ingredient(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Path(id): Path<i64>,
) -> JsonResult<IngredientResponse> {
    Ok(Json(get_ingredient_in_db(&pool, id).await?.into()))
}

// ----------------- Recipe Handlers -----------------
pub async fn list_recipes(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Extension(config): Extension<Arc<Config>>,
    maybe_user: MaybeUser,
    Query(pairs): Query<Vec<(String, String)>>,
    uri: Uri,
) -> JsonResult<Page<RecipeResponse>> {
    let params = RecipeQueryParams::from_pairs(&pairs)?;
    let viewer = maybe_user.get_id();
    let recipes = list_recipes_in_db(&pool, viewer, &params.filter).await?;
    let mut page = paginate(recipes, params.page, config.page_size, &uri)?;
    let recipes = std::mem::take(&mut page.results);
    let recipes = hydrate_recipes_in_db(&pool, viewer, recipes).await?;
    Ok(Json(page.with_results(recipes)))
}

pub async fn get_recipe(
    Extension(pool): Extension<Arc<SqlitePool>>,
    maybe_user: MaybeUser,
    Path(id): Path<i64>,
) -> JsonResult<RecipeResponse> {
    Ok(Json(get_recipe_in_db(&pool, maybe_user.get_id(), id).await?))
}

pub async fn create_recipe(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Extension(config): Extension<Arc<Config>>,
    user: AuthUser,
    JsonBody(request): JsonBody<RecipeRequest>,
) -> CreatedResult<RecipeResponse> {
    let draft = request.into_draft(false)?;
    let upload = draft.image.as_ref().ok_or(RequestError::ServerError)?;
    let image = save_upload(&config, upload).await?;
    let id = match create_recipe_in_db(&pool, user.id, &draft, &image).await {
        Ok(id) => id,
        Err(e) => {
            remove_image(&config, &image).await;
            return Err(e);
        }
    };
    let recipe = get_recipe_in_db(&pool, Some(user.id), id).await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

pub async fn update_recipe(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Extension(config): Extension<Arc<Config>>,
    user: AuthUser,
    Path(id): Path<i64>,
    JsonBody(request): JsonBody<RecipeRequest>,
) -> JsonResult<RecipeResponse> {
    let draft = request.into_draft(true)?;
    let image = match &draft.image {
        Some(upload) => Some(save_upload(&config, upload).await?),
        None => None,
    };
    match update_recipe_in_db(&pool, user.id, id, &draft, image.as_deref()).await {
        Ok(Some(replaced)) => remove_image(&config, &replaced).await,
        Ok(None) => {}
        Err(e) => {
            if let Some(image) = &image {
                remove_image(&config, image).await;
            }
            return Err(e);
        }
    }
    Ok(Json(get_recipe_in_db(&pool, Some(user.id), id).await?))
}

pub async fn delete_recipe(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Extension(config): Extension<Arc<Config>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, RequestError> {
    let image = delete_recipe_in_db(&pool, user.id, id).await?;
    remove_image(&config, &image).await;
    Ok(StatusCode::NO_CONTENT)
}

// ----------------- Favorite & Shopping Cart Handlers -----------------
async fn add_recipe_relation(
    pool: &SqlitePool,
    user: AuthUser,
    recipe_id: i64,
    kind: RelationKind,
) -> CreatedResult<RelationTarget> {
    let target = add_relation(pool, user.id, recipe_id, kind, SubscriptionView::default()).await?;
    Ok((StatusCode::CREATED, Json(target)))
}

pub async fn add_favorite(
    Extension(pool): Extension<Arc<SqlitePool>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> CreatedResult<RelationTarget> {
    add_recipe_relation(&pool, user, id, RelationKind::Favorite).await
}

pub async fn remove_favorite(
    Extension(pool): Extension<Arc<SqlitePool>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, RequestError> {
    remove_relation(&pool, user.id, id, RelationKind::Favorite).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_to_shopping_cart(
    Extension(pool): Extension<Arc<SqlitePool>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> CreatedResult<RelationTarget> {
    add_recipe_relation(&pool, user, id, RelationKind::ShoppingCart).await
}

pub async fn remove_from_shopping_cart(
    Extension(pool): Extension<Arc<SqlitePool>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, RequestError> {
    remove_relation(&pool, user.id, id, RelationKind::ShoppingCart).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn download_shopping_cart(
    Extension(pool): Extension<Arc<SqlitePool>>,
    user: AuthUser,
) -> Result<impl IntoResponse, RequestError> {
    let body = shopping_list_for(&pool, user.id).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"shopping_list.txt\"",
            ),
        ],
        body,
    ))
}
