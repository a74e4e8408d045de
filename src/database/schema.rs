use std::{
    fmt::{self, Display},
    str::FromStr,
};

use serde::{Serialize, Serializer};

use crate::constants::{PRICE_DECIMAL_PLACES, PRICE_MAX_DIGITS};

pub type Id = i32;

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Id,
    pub email: String,
    pub password: String,
    pub name: String,
    pub is_active: bool,
}

/// Tags and ingredients share one shape; `LabelKind` tells them apart.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub id: Id,
    pub user_id: Id,
    pub name: String,
}

pub type Tag = Label;
pub type Ingredient = Label;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LabelKind {
    Tag,
    Ingredient,
}

impl LabelKind {
    pub fn table(self) -> &'static str {
        match self {
            LabelKind::Tag => "tags",
            LabelKind::Ingredient => "ingredients",
        }
    }

    pub fn link_table(self) -> &'static str {
        match self {
            LabelKind::Tag => "recipe_tags",
            LabelKind::Ingredient => "recipe_ingredients",
        }
    }

    pub fn link_column(self) -> &'static str {
        match self {
            LabelKind::Tag => "tag_id",
            LabelKind::Ingredient => "ingredient_id",
        }
    }

    /// Request/response field carrying the recipe's references.
    pub fn field(self) -> &'static str {
        match self {
            LabelKind::Tag => "tag",
            LabelKind::Ingredient => "ingredient",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PriceError {
    #[error("A valid number is required.")]
    Invalid,
    #[error("Ensure this value is greater than or equal to 0.")]
    Negative,
    #[error("Ensure that there are no more than 5 digits in total.")]
    TooManyDigits,
    #[error("Ensure that there are no more than 2 decimal places.")]
    TooManyDecimalPlaces,
    #[error("Ensure that there are no more than 3 digits before the decimal point.")]
    TooManyWholeDigits,
}

/// Non-negative fixed point amount with two decimal places, stored as cents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, sqlx::Type)]
#[sqlx(transparent)]
pub struct Price(i64);

impl Price {
    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub fn cents(self) -> i64 {
        self.0
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        let (negative, value) = match value.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, value.strip_prefix('+').unwrap_or(value)),
        };

        let (whole, fraction) = value.split_once('.').unwrap_or((value, ""));
        let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty()) || !is_digits(whole) || !is_digits(fraction)
        {
            return Err(PriceError::Invalid);
        }

        let whole = whole.trim_start_matches('0');
        let fraction = fraction.trim_end_matches('0');
        let is_zero = whole.is_empty() && fraction.is_empty();
        if negative && !is_zero {
            return Err(PriceError::Negative);
        }
        if whole.len() + fraction.len() > PRICE_MAX_DIGITS {
            return Err(PriceError::TooManyDigits);
        }
        if fraction.len() > PRICE_DECIMAL_PLACES {
            return Err(PriceError::TooManyDecimalPlaces);
        }
        if whole.len() > PRICE_MAX_DIGITS - PRICE_DECIMAL_PLACES {
            return Err(PriceError::TooManyWholeDigits);
        }

        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| PriceError::Invalid)?
        };
        let cents: i64 = format!("{fraction:0<2}")
            .parse()
            .map_err(|_| PriceError::Invalid)?;

        Ok(Self(whole * 100 + cents))
    }
}

impl Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct RecipeRow {
    pub id: Id,
    pub user_id: Id,
    pub title: String,
    pub time_minutes: i32,
    #[sqlx(rename = "price_cents")]
    pub price: Price,
    pub link: String,
    pub image: Option<String>,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct LinkedLabel {
    pub recipe_id: Id,
    pub id: Id,
    pub user_id: Id,
    pub name: String,
}

impl From<LinkedLabel> for Label {
    fn from(value: LinkedLabel) -> Self {
        Self {
            id: value.id,
            user_id: value.user_id,
            name: value.name,
        }
    }
}

/// A recipe together with its tag and ingredient sets, each sorted by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    pub id: Id,
    pub user_id: Id,
    pub title: String,
    pub time_minutes: i32,
    pub price: Price,
    pub link: String,
    pub image: Option<String>,
    pub tags: Vec<Tag>,
    pub ingredients: Vec<Ingredient>,
}

impl Recipe {
    pub fn from_row(row: RecipeRow, mut tags: Vec<Tag>, mut ingredients: Vec<Ingredient>) -> Self {
        tags.sort_by_key(|tag| tag.id);
        ingredients.sort_by_key(|ingredient| ingredient.id);

        Self {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            time_minutes: row.time_minutes,
            price: row.price,
            link: row.link,
            image: row.image,
            tags,
            ingredients,
        }
    }

    pub fn labels(&self, kind: LabelKind) -> &[Label] {
        match kind {
            LabelKind::Tag => &self.tags,
            LabelKind::Ingredient => &self.ingredients,
        }
    }
}

// Store inputs

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password_hash: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub title: String,
    pub time_minutes: i32,
    pub price: Price,
    pub link: String,
    pub tags: Vec<Id>,
    pub ingredients: Vec<Id>,
}

/// Fields left as `None` keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct RecipeChanges {
    pub title: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<Price>,
    pub link: Option<String>,
    pub tags: Option<Vec<Id>>,
    pub ingredients: Option<Vec<Id>>,
}

impl RecipeChanges {
    pub fn apply(&self, row: &mut RecipeRow) {
        if let Some(title) = &self.title {
            row.title = title.to_owned();
        }
        if let Some(time_minutes) = self.time_minutes {
            row.time_minutes = time_minutes;
        }
        if let Some(price) = self.price {
            row.price = price;
        }
        if let Some(link) = &self.link {
            row.link = link.to_owned();
        }
    }

    pub fn labels(&self, kind: LabelKind) -> Option<&[Id]> {
        match kind {
            LabelKind::Tag => self.tags.as_deref(),
            LabelKind::Ingredient => self.ingredients.as_deref(),
        }
    }
}

impl From<NewRecipe> for RecipeChanges {
    fn from(value: NewRecipe) -> Self {
        Self {
            title: Some(value.title),
            time_minutes: Some(value.time_minutes),
            price: Some(value.price),
            link: Some(value.link),
            tags: Some(value.tags),
            ingredients: Some(value.ingredients),
        }
    }
}

// Response shapes

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct UserResponse {
    pub id: Id,
    pub email: String,
    pub name: String,
}

impl From<&User> for UserResponse {
    fn from(value: &User) -> Self {
        Self {
            id: value.id,
            email: value.email.to_owned(),
            name: value.name.to_owned(),
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct LabelResponse {
    pub id: Id,
    pub name: String,
}

impl From<&Label> for LabelResponse {
    fn from(value: &Label) -> Self {
        Self {
            id: value.id,
            name: value.name.to_owned(),
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct RecipeSummary {
    pub id: Id,
    pub title: String,
    pub time_minutes: i32,
    pub price: Price,
    pub link: String,
    pub tag: Vec<Id>,
    pub ingredient: Vec<Id>,
}

impl From<&Recipe> for RecipeSummary {
    fn from(value: &Recipe) -> Self {
        Self {
            id: value.id,
            title: value.title.to_owned(),
            time_minutes: value.time_minutes,
            price: value.price,
            link: value.link.to_owned(),
            tag: value.tags.iter().map(|tag| tag.id).collect(),
            ingredient: value.ingredients.iter().map(|i| i.id).collect(),
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct RecipeDetail {
    pub id: Id,
    pub title: String,
    pub time_minutes: i32,
    pub price: Price,
    pub link: String,
    pub image: Option<String>,
    pub tag: Vec<LabelResponse>,
    pub ingredient: Vec<LabelResponse>,
}

impl From<&Recipe> for RecipeDetail {
    fn from(value: &Recipe) -> Self {
        Self {
            id: value.id,
            title: value.title.to_owned(),
            time_minutes: value.time_minutes,
            price: value.price,
            link: value.link.to_owned(),
            image: value.image.to_owned(),
            tag: value.tags.iter().map(LabelResponse::from).collect(),
            ingredient: value.ingredients.iter().map(LabelResponse::from).collect(),
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct RecipeImageResponse {
    pub id: Id,
    pub image: Option<String>,
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("5", 500)]
    #[case("5.5", 550)]
    #[case("5.00", 500)]
    #[case("0.99", 99)]
    #[case(".5", 50)]
    #[case("999.99", 99_999)]
    #[case("007.10", 710)]
    #[case("-0", 0)]
    fn parses_decimal_prices(#[case] input: &str, #[case] cents: i64) {
        assert_eq!(input.parse::<Price>(), Ok(Price::from_cents(cents)));
    }

    #[rstest]
    #[case("", PriceError::Invalid)]
    #[case("abc", PriceError::Invalid)]
    #[case("1e3", PriceError::Invalid)]
    #[case(".", PriceError::Invalid)]
    #[case("-1.00", PriceError::Negative)]
    #[case("123456", PriceError::TooManyDigits)]
    #[case("1000.00", PriceError::TooManyWholeDigits)]
    #[case("1.234", PriceError::TooManyDecimalPlaces)]
    fn rejects_invalid_prices(#[case] input: &str, #[case] error: PriceError) {
        assert_eq!(input.parse::<Price>(), Err(error));
    }

    #[test]
    fn price_serializes_with_two_decimals() {
        let value = serde_json::to_value(Price::from_cents(205)).unwrap();
        assert_eq!(value, serde_json::json!("2.05"));
    }

    #[test]
    fn recipe_labels_are_sorted_by_id() {
        let row = RecipeRow {
            id: 1,
            user_id: 1,
            title: String::from("Dal"),
            time_minutes: 5,
            price: Price::from_cents(200),
            link: String::new(),
            image: None,
        };
        let tag = |id| Label {
            id,
            user_id: 1,
            name: format!("tag {id}"),
        };

        let recipe = Recipe::from_row(row, vec![tag(3), tag(1), tag(2)], vec![]);
        let summary = RecipeSummary::from(&recipe);

        assert_eq!(summary.tag, vec![1, 2, 3]);
        assert!(summary.ingredient.is_empty());
    }
}
