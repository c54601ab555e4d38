mod pagination;
mod request;
mod response;

pub use pagination::*;
pub use request::*;
pub use response::*;

use axum::{
    body::HttpBody,
    extract::{FromRequest, Json},
    http::Request,
    BoxError,
};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::debug;

use crate::errors::{RequestError, ValidationErrors};

/// `Json` whose rejections come back as field-keyed validation errors.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

#[axum::async_trait]
impl<T, S, B> FromRequest<S, B> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
    B: HttpBody + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    type Rejection = RequestError;

    async fn from_request(req: Request<B>, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => {
                debug!("Rejected request body: {}", rejection.body_text());
                Err(ValidationErrors::single("non_field_errors", rejection.body_text()).into())
            }
        }
    }
}

/// Filters accepted by the recipe listing.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecipeFilter {
    /// Tag slugs; a recipe matches if it carries any of them.
    pub tags: Vec<String>,
    pub author: Option<i64>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecipeQueryParams {
    pub filter: RecipeFilter,
    pub page: PageParams,
}

impl RecipeQueryParams {
    /// Builds the query from raw pairs so that `tags` may repeat.
    pub fn from_pairs(pairs: &[(String, String)]) -> Result<Self, RequestError> {
        let mut params = RecipeQueryParams::default();
        let mut errors = ValidationErrors::new();
        for (key, value) in pairs {
            match key.as_str() {
                "tags" => params.filter.tags.push(value.clone()),
                "author" => match value.parse() {
                    Ok(author) => params.filter.author = Some(author),
                    Err(_) => errors.add("author", "Enter a number."),
                },
                "is_favorited" => params.filter.is_favorited = parse_flag(value),
                "is_in_shopping_cart" => params.filter.is_in_shopping_cart = parse_flag(value),
                "page" => match value.parse() {
                    Ok(page) => params.page.page = Some(page),
                    Err(_) => errors.add("page", "Enter a positive number."),
                },
                "limit" => match value.parse() {
                    Ok(limit) => params.page.limit = Some(limit),
                    Err(_) => errors.add("limit", "Enter a positive number."),
                },
                _ => {}
            }
        }
        errors.into_result()?;
        Ok(params)
    }
}

/// Non-zero numbers and `true` switch a filter on; anything else leaves it off.
pub fn parse_flag(value: &str) -> bool {
    let value = value.trim();
    match value.parse::<i64>() {
        Ok(number) => number != 0,
        Err(_) => value.eq_ignore_ascii_case("true"),
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct IngredientQueryParams {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct SubscriptionQueryParams {
    #[serde(default)]
    pub recipes_limit: Option<i64>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
}

impl SubscriptionQueryParams {
    pub fn recipes_limit(&self) -> Result<Option<i64>, RequestError> {
        match self.recipes_limit {
            Some(limit) if limit < 0 => Err(ValidationErrors::single(
                "recipes_limit",
                "Ensure this value is greater than or equal to 0.",
            )
            .into()),
            limit => Ok(limit),
        }
    }

    pub fn page_params(&self) -> PageParams {
        PageParams {
            page: self.page,
            limit: self.limit,
        }
    }
}
