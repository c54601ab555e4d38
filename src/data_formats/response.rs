use serde::{Deserialize, Serialize};

use crate::models::{Ingredient, Recipe, RecipeIngredient, Tag, User};

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct UserResponse {
    pub email: String,
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CreatedUserResponse {
    pub email: String,
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct TokenResponse {
    pub auth_token: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TagResponse {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct IngredientResponse {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RecipeIngredientResponse {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RecipeResponse {
    pub id: i64,
    pub tags: Vec<TagResponse>,
    pub author: UserResponse,
    pub ingredients: Vec<RecipeIngredientResponse>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i64,
}

/// The trimmed recipe view returned by favorite and cart toggles.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RecipeShortResponse {
    pub id: i64,
    pub name: String,
    pub image: String,
    pub cooking_time: i64,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionResponse {
    pub email: String,
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
    pub recipes: Vec<RecipeShortResponse>,
    pub recipes_count: i64,
}

/// What a successful relation `add` hands back, depending on the relation kind.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum RelationTarget {
    Author(SubscriptionResponse),
    Recipe(RecipeShortResponse),
}

impl UserResponse {
    pub fn new(
        User {
            email,
            id,
            username,
            first_name,
            last_name,
            ..
        }: User,
        is_subscribed: bool,
    ) -> Self {
        UserResponse {
            email,
            id,
            username,
            first_name,
            last_name,
            is_subscribed,
        }
    }
}

impl From<User> for CreatedUserResponse {
    fn from(
        User {
            email,
            id,
            username,
            first_name,
            last_name,
            ..
        }: User,
    ) -> Self {
        CreatedUserResponse {
            email,
            id,
            username,
            first_name,
            last_name,
        }
    }
}

impl From<Tag> for TagResponse {
    fn from(Tag { id, name, color, slug }: Tag) -> Self {
        TagResponse {
            id,
            name,
            color,
            slug,
        }
    }
}

impl From<Ingredient> for IngredientResponse {
    fn from(
        Ingredient {
            id,
            name,
            measurement_unit,
        }: Ingredient,
    ) -> Self {
        IngredientResponse {
            id,
            name,
            measurement_unit,
        }
    }
}

impl From<RecipeIngredient> for RecipeIngredientResponse {
    fn from(
        RecipeIngredient {
            id,
            name,
            measurement_unit,
            amount,
        }: RecipeIngredient,
    ) -> Self {
        RecipeIngredientResponse {
            id,
            name,
            measurement_unit,
            amount,
        }
    }
}

impl From<Recipe> for RecipeShortResponse {
    fn from(
        Recipe {
            id,
            name,
            image,
            cooking_time,
            ..
        }: Recipe,
    ) -> Self {
        RecipeShortResponse {
            id,
            name,
            image,
            cooking_time,
        }
    }
}

impl SubscriptionResponse {
    pub fn new(author: UserResponse, recipes: Vec<RecipeShortResponse>, recipes_count: i64) -> Self {
        let UserResponse {
            email,
            id,
            username,
            first_name,
            last_name,
            is_subscribed,
        } = author;
        SubscriptionResponse {
            email,
            id,
            username,
            first_name,
            last_name,
            is_subscribed,
            recipes,
            recipes_count,
        }
    }
}
