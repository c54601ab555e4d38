use std::collections::HashSet;

use serde::{de::IgnoredAny, Deserialize, Serialize};

use crate::{
    errors::ValidationErrors,
    media::{decode_data_uri, ImageUpload},
};

const MAX_NAME_LENGTH: usize = 150;
const MAX_EMAIL_LENGTH: usize = 254;
const MAX_RECIPE_NAME_LENGTH: usize = 200;

// ----------------- User Request -----------------
#[derive(Deserialize, Serialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Serialize, Debug, Default)]
#[serde(default)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct SetPasswordRequest {
    pub new_password: String,
    pub current_password: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(message) = validate_username(&self.username) {
            errors.add("username", message);
        }
        if self.email.trim().is_empty() {
            errors.add("email", "This field may not be blank.");
        } else if !self.email.contains('@') || self.email.len() > MAX_EMAIL_LENGTH {
            errors.add("email", "Enter a valid email address.");
        }
        for (field, value) in [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
        ] {
            if value.trim().is_empty() {
                errors.add(field, "This field may not be blank.");
            } else if value.chars().count() > MAX_NAME_LENGTH {
                errors.add(field, "Ensure this field has no more than 150 characters.");
            }
        }
        if self.password.is_empty() {
            errors.add("password", "This field may not be blank.");
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Usernames are letters, digits and `.@+-_`, and may not shadow the `me` route.
pub fn validate_username(username: &str) -> Result<(), &'static str> {
    if username.is_empty() {
        return Err("This field may not be blank.");
    }
    if username.chars().count() > MAX_NAME_LENGTH {
        return Err("Ensure this field has no more than 150 characters.");
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '.' | '@' | '+' | '-' | '_'))
    {
        return Err("Username may contain only letters, digits and @/./+/-/_ characters.");
    }
    if username.eq_ignore_ascii_case("me") {
        return Err("Username `me` is reserved.");
    }
    Ok(())
}

// ----------------- Recipe Request -----------------

/// Largest value accepted for amounts and cooking times.
pub const MAX_POSITIVE_INT: i64 = i32::MAX as i64;

/// An integer as it may arrive on the wire: a JSON number, a numeric
/// string, or anything else (kept only to be reported).
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum IntegerInput {
    Number(i64),
    Text(String),
    Invalid(IgnoredValue),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IgnoredValue;

impl<'de> Deserialize<'de> for IgnoredValue {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        IgnoredAny::deserialize(deserializer).map(|_| IgnoredValue)
    }
}

impl IntegerInput {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            IntegerInput::Number(value) => Some(*value),
            IntegerInput::Text(text) => text.trim().parse().ok(),
            IntegerInput::Invalid(_) => None,
        }
    }
}

impl From<i64> for IntegerInput {
    fn from(value: i64) -> Self {
        IntegerInput::Number(value)
    }
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct IngredientAmountInput {
    pub id: Option<IntegerInput>,
    pub amount: Option<IntegerInput>,
}

impl IngredientAmountInput {
    pub fn new(id: i64, amount: i64) -> Self {
        IngredientAmountInput {
            id: Some(id.into()),
            amount: Some(amount.into()),
        }
    }
}

/// A validated ingredient line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngredientAmountRequest {
    pub id: i64,
    pub amount: i64,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct RecipeRequest {
    pub ingredients: Vec<IngredientAmountInput>,
    pub tags: Vec<IntegerInput>,
    pub image: Option<String>,
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<IntegerInput>,
}

/// A recipe payload that passed validation.
///
/// Scalars are `None` only for a partial update that left them out.
#[derive(Debug, Clone)]
pub struct RecipeDraft {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i64>,
    pub ingredients: Vec<IngredientAmountRequest>,
    pub tags: Vec<i64>,
    pub image: Option<ImageUpload>,
}

impl RecipeRequest {
    /// Checks the nested collections and scalars, collecting every violation.
    ///
    /// With `partial` set, omitted scalars and image are left untouched;
    /// ingredients and tags are always required.
    pub fn into_draft(self, partial: bool) -> Result<RecipeDraft, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let mut ingredients = Vec::with_capacity(self.ingredients.len());
        if self.ingredients.is_empty() {
            errors.add("ingredients", "ingredients required");
        } else {
            let mut bad_ids = false;
            let mut missing_amount = false;
            let mut bad_amount = false;
            let mut too_small = false;
            let mut too_large = false;
            for item in &self.ingredients {
                let id = item.id.as_ref().and_then(IntegerInput::as_i64);
                let amount = match &item.amount {
                    None => {
                        missing_amount = true;
                        None
                    }
                    Some(raw) => {
                        let amount = raw.as_i64();
                        bad_amount |= amount.is_none();
                        amount
                    }
                };
                bad_ids |= id.is_none();
                if let (Some(id), Some(amount)) = (id, amount) {
                    too_small |= amount < 1;
                    too_large |= amount > MAX_POSITIVE_INT;
                    ingredients.push(IngredientAmountRequest { id, amount });
                }
            }
            if bad_ids {
                errors.add("ingredients", "ingredient id must be an integer");
            }
            if missing_amount {
                errors.add("ingredients", "amount required");
            }
            if bad_amount {
                errors.add("ingredients", "amount must be an integer");
            }
            if !all_distinct(ingredients.iter().map(|i| i.id)) {
                errors.add("ingredients", "ingredients must be unique");
            }
            if too_small {
                errors.add("ingredients", "amount must be at least 1");
            }
            if too_large {
                errors.add(
                    "ingredients",
                    format!("amount must be at most {MAX_POSITIVE_INT}"),
                );
            }
        }

        let tags: Vec<i64> = self.tags.iter().filter_map(IntegerInput::as_i64).collect();
        if self.tags.is_empty() {
            errors.add("tags", "tags required");
        } else if tags.len() != self.tags.len() {
            errors.add("tags", "tag id must be an integer");
        } else if !all_distinct(tags.iter().copied()) {
            errors.add("tags", "tags must be unique");
        }

        let cooking_time = match &self.cooking_time {
            Some(raw) => match raw.as_i64() {
                Some(value) if value < 1 => {
                    errors.add("cooking_time", "cooking_time must be at least 1");
                    None
                }
                Some(value) if value > MAX_POSITIVE_INT => {
                    errors.add(
                        "cooking_time",
                        format!("cooking_time must be at most {MAX_POSITIVE_INT}"),
                    );
                    None
                }
                Some(value) => Some(value),
                None => {
                    errors.add("cooking_time", "cooking_time must be an integer");
                    None
                }
            },
            None => {
                if !partial {
                    errors.add("cooking_time", "cooking_time required");
                }
                None
            }
        };

        let name = match self.name.as_deref().map(str::trim) {
            Some("") => {
                errors.add("name", "name required");
                None
            }
            Some(name) if name.chars().count() > MAX_RECIPE_NAME_LENGTH => {
                errors.add("name", "Ensure this field has no more than 200 characters.");
                None
            }
            Some(name) => Some(name.to_owned()),
            None => {
                if !partial {
                    errors.add("name", "name required");
                }
                None
            }
        };

        let text = match self.text {
            Some(text) if text.trim().is_empty() => {
                errors.add("text", "text required");
                None
            }
            Some(text) => Some(text),
            None => {
                if !partial {
                    errors.add("text", "text required");
                }
                None
            }
        };

        let image = match self.image.as_deref() {
            Some(raw) => match decode_data_uri(raw) {
                Ok(upload) => Some(upload),
                Err(message) => {
                    errors.add("image", message);
                    None
                }
            },
            None => {
                if !partial {
                    errors.add("image", "image required");
                }
                None
            }
        };

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(RecipeDraft {
            name,
            text,
            cooking_time,
            ingredients,
            tags,
            image,
        })
    }
}

fn all_distinct(ids: impl Iterator<Item = i64>) -> bool {
    let mut seen = HashSet::new();
    ids.into_iter().all(|id| seen.insert(id))
}
