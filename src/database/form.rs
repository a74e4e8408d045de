use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::{
    constants::{MAX_LINK_LENGTH, MAX_NAME_LENGTH, MIN_PASSWORD_LENGTH},
    error::{Error, FieldErrors, NON_FIELD_ERRORS},
    schema::{Id, LabelKind, NewRecipe, Price, RecipeChanges},
};

pub type FormData = Map<String, Value>;

const REQUIRED: &str = "This field is required.";
const BLANK: &str = "This field may not be blank.";
const NOT_A_STRING: &str = "Not a valid string.";
const NOT_AN_INTEGER: &str = "A valid integer is required.";

/// A decoded JSON request body with typed, error-collecting accessors.
///
/// Every accessor records a message for its field instead of failing
/// immediately, so one response reports every invalid field at once.
pub struct Form {
    inner: FormData,
    errors: FieldErrors,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self {
            inner: data,
            errors: FieldErrors::new(),
        }
    }

    /// An empty body is an empty form; anything else must be a JSON object.
    pub fn parse(body: &[u8]) -> Result<Self, Error> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::from_data(FormData::new()));
        }

        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(data)) => Ok(Self::from_data(data)),
            Ok(_) => Err(Error::validation(
                NON_FIELD_ERRORS,
                "Invalid data. Expected a dictionary.",
            )),
            Err(e) => Err(Error::validation(
                NON_FIELD_ERRORS,
                format!("JSON parse error - {e}"),
            )),
        }
    }

    pub fn has(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    fn error(&mut self, key: &str, message: impl Into<String>) {
        self.errors.add(key, message);
    }

    /// Raw string value; `null` and absent both yield `None`.
    pub fn get_str(&mut self, key: &str) -> Option<String> {
        match self.inner.get(key) {
            None | Some(Value::Null) => None,
            Some(Value::String(value)) => Some(value.to_owned()),
            Some(Value::Number(value)) => Some(value.to_string()),
            Some(_) => {
                self.error(key, NOT_A_STRING);
                None
            }
        }
    }

    pub fn get_text(&mut self, key: &str, max_length: usize, allow_blank: bool) -> Option<String> {
        let value = self.get_str(key)?;
        let value = value.trim().to_owned();

        if value.is_empty() && !allow_blank {
            self.error(key, BLANK);
            return None;
        }
        if value.chars().count() > max_length {
            self.error(
                key,
                format!("Ensure this field has no more than {max_length} characters."),
            );
            return None;
        }
        Some(value)
    }

    pub fn require_text(&mut self, key: &str, max_length: usize) -> Option<String> {
        if !self.has(key) || self.inner.get(key) == Some(&Value::Null) {
            self.error(key, REQUIRED);
            return None;
        }
        self.get_text(key, max_length, false)
    }

    pub fn get_positive_int(&mut self, key: &str) -> Option<i32> {
        let number = match self.inner.get(key) {
            None | Some(Value::Null) => return None,
            Some(Value::Number(value)) => value.as_i64().or_else(|| {
                value
                    .as_f64()
                    .filter(|v| v.fract() == 0.0 && v.abs() < 1e15)
                    .map(|v| v as i64)
            }),
            Some(Value::String(value)) => value.trim().parse::<i64>().ok(),
            Some(_) => None,
        };

        match number {
            None => {
                self.error(key, NOT_AN_INTEGER);
                None
            }
            Some(n) if n < 1 => {
                self.error(key, "Ensure this value is greater than or equal to 1.");
                None
            }
            Some(n) => match i32::try_from(n) {
                Ok(n) => Some(n),
                Err(_) => {
                    self.error(
                        key,
                        format!("Ensure this value is less than or equal to {}.", i32::MAX),
                    );
                    None
                }
            },
        }
    }

    pub fn require_positive_int(&mut self, key: &str) -> Option<i32> {
        if !self.has(key) || self.inner.get(key) == Some(&Value::Null) {
            self.error(key, REQUIRED);
            return None;
        }
        self.get_positive_int(key)
    }

    pub fn get_price(&mut self, key: &str) -> Option<Price> {
        let raw = match self.inner.get(key) {
            None | Some(Value::Null) => return None,
            Some(Value::Number(value)) => value.to_string(),
            Some(Value::String(value)) => value.to_owned(),
            Some(_) => String::new(),
        };

        match raw.parse::<Price>() {
            Ok(price) => Some(price),
            Err(e) => {
                self.error(key, e.to_string());
                None
            }
        }
    }

    pub fn require_price(&mut self, key: &str) -> Option<Price> {
        if !self.has(key) || self.inner.get(key) == Some(&Value::Null) {
            self.error(key, REQUIRED);
            return None;
        }
        self.get_price(key)
    }

    /// Primary key list, deduplicated and sorted; `null` counts as empty.
    pub fn get_ids(&mut self, key: &str) -> Option<Vec<Id>> {
        let values = match self.inner.get(key)? {
            Value::Null => return Some(vec![]),
            Value::Array(values) => values.to_owned(),
            other => {
                let kind = match other {
                    Value::Bool(_) => "bool",
                    Value::Number(_) => "int",
                    Value::String(_) => "str",
                    _ => "dict",
                };
                self.error(
                    key,
                    format!("Expected a list of items but got type \"{kind}\"."),
                );
                return None;
            }
        };

        let mut ids = BTreeSet::new();
        let mut valid = true;
        for value in values {
            let id = match &value {
                Value::Number(n) => n.as_i64().and_then(|n| Id::try_from(n).ok()),
                Value::String(s) => s.trim().parse::<Id>().ok(),
                _ => None,
            };
            match id {
                Some(id) => {
                    ids.insert(id);
                }
                None => {
                    self.error(
                        key,
                        format!("Incorrect type. Expected pk value, received {value}."),
                    );
                    valid = false;
                }
            }
        }

        valid.then(|| ids.into_iter().collect())
    }

    pub fn finish<T>(self, value: T) -> Result<T, Error> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(Error::Validation(self.errors))
        }
    }
}

/// Lower-cases the domain part, the way account emails are normalized.
pub fn normalize_email(email: &str) -> String {
    match email.trim().rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
        None => email.trim().to_owned(),
    }
}

fn is_email(email: &str) -> bool {
    match email.rsplit_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && domain.contains('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

fn email_field(form: &mut Form, required: bool) -> Option<String> {
    let email = if required {
        form.require_text("email", MAX_NAME_LENGTH)
    } else {
        form.get_text("email", MAX_NAME_LENGTH, false)
    }?;

    if !is_email(&email) {
        form.error("email", "Enter a valid email address.");
        return None;
    }
    Some(normalize_email(&email))
}

fn password_field(form: &mut Form, required: bool) -> Option<String> {
    if required && matches!(form.inner.get("password"), None | Some(Value::Null)) {
        form.error("password", REQUIRED);
        return None;
    }
    let password = form.get_str("password")?;
    if password.is_empty() {
        form.error("password", BLANK);
        return None;
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        form.error(
            "password",
            format!("Ensure this field has at least {MIN_PASSWORD_LENGTH} characters."),
        );
        return None;
    }
    Some(password)
}

#[derive(Debug, Clone)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub name: String,
}

impl RegisterForm {
    pub fn from_form(mut form: Form) -> Result<Self, Error> {
        let email = email_field(&mut form, true);
        let password = password_field(&mut form, true);
        let name = form.get_text("name", MAX_NAME_LENGTH, true);

        match (email, password) {
            (Some(email), Some(password)) => form.finish(Self {
                email,
                password,
                name: name.unwrap_or_default(),
            }),
            _ => Err(Error::Validation(form.errors)),
        }
    }
}

/// Credentials for token issuance; blank or missing fields yield `None`.
#[derive(Debug, Clone)]
pub struct TokenForm {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl TokenForm {
    pub fn from_form(mut form: Form) -> Self {
        let email = form.get_str("email").map(|email| email.trim().to_owned());
        let password = form.get_str("password");

        Self {
            email: email.filter(|email| !email.is_empty()),
            password: password.filter(|password| !password.is_empty()),
        }
    }
}

/// Self-service profile changes with plaintext password.
#[derive(Debug, Clone, Default)]
pub struct ProfileForm {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
}

impl ProfileForm {
    pub fn from_form(mut form: Form, partial: bool) -> Result<Self, Error> {
        let email = email_field(&mut form, !partial);
        let password = password_field(&mut form, !partial);
        let name = match form.get_text("name", MAX_NAME_LENGTH, true) {
            None if !partial => Some(String::new()),
            name => name,
        };

        form.finish(Self {
            email,
            name,
            password,
        })
    }
}

#[derive(Debug, Clone)]
pub struct LabelForm {
    pub name: String,
}

impl LabelForm {
    pub fn from_form(mut form: Form) -> Result<Self, Error> {
        match form.require_text("name", MAX_NAME_LENGTH) {
            Some(name) => form.finish(Self { name }),
            None => Err(Error::Validation(form.errors)),
        }
    }
}

pub struct RecipeForm;

impl RecipeForm {
    /// Body of a create (POST) request.
    pub fn create(mut form: Form) -> Result<NewRecipe, Error> {
        let title = form.require_text("title", MAX_NAME_LENGTH);
        let time_minutes = form.require_positive_int("time_minutes");
        let price = form.require_price("price");
        let link = form.get_text("link", MAX_LINK_LENGTH, true);
        let tags = form.get_ids(LabelKind::Tag.field());
        let ingredients = form.get_ids(LabelKind::Ingredient.field());

        match (title, time_minutes, price) {
            (Some(title), Some(time_minutes), Some(price)) => form.finish(NewRecipe {
                title,
                time_minutes,
                price,
                link: link.unwrap_or_default(),
                tags: tags.unwrap_or_default(),
                ingredients: ingredients.unwrap_or_default(),
            }),
            _ => Err(Error::Validation(form.errors)),
        }
    }

    /// Body of a full update (PUT): omitted optional fields are cleared.
    pub fn replace(form: Form) -> Result<RecipeChanges, Error> {
        Self::create(form).map(RecipeChanges::from)
    }

    /// Body of a partial update (PATCH): omitted fields are left alone.
    pub fn patch(mut form: Form) -> Result<RecipeChanges, Error> {
        let title = if form.has("title") {
            form.require_text("title", MAX_NAME_LENGTH)
        } else {
            None
        };
        let time_minutes = if form.has("time_minutes") {
            form.require_positive_int("time_minutes")
        } else {
            None
        };
        let price = if form.has("price") {
            form.require_price("price")
        } else {
            None
        };
        let link = if form.has("link") {
            Some(form.get_text("link", MAX_LINK_LENGTH, true).unwrap_or_default())
        } else {
            None
        };
        let tags = form.get_ids(LabelKind::Tag.field());
        let ingredients = form.get_ids(LabelKind::Ingredient.field());

        form.finish(RecipeChanges {
            title,
            time_minutes,
            price,
            link,
            tags,
            ingredients,
        })
    }
}
