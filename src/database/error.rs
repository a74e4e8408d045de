use std::{
    collections::BTreeMap,
    fmt::{self, Display},
};

use serde::Serialize;
use serde_json::{json, Value};
use warp::http::StatusCode;

pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Validation messages keyed by the offending request field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_owned())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }
}

impl Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self.0.keys().map(String::as_str).collect::<Vec<_>>();
        write!(f, "({})", fields.join(", "))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid input {0}")]
    Validation(FieldErrors),
    #[error("conflict on {field}: {message}")]
    Conflict {
        field: &'static str,
        message: String,
    },
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("not found")]
    NotFound,
    #[error("method not allowed")]
    MethodNotAllowed,
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::Validation(FieldErrors::single(field, message))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::Validation(_) | Error::Conflict { .. } => StatusCode::BAD_REQUEST,
            Error::Authentication(_) => StatusCode::UNAUTHORIZED,
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Response body; internal causes stay in the logs.
    pub fn body(&self) -> Value {
        match self {
            Error::Validation(errors) => json!(errors),
            Error::Conflict { field, message } => {
                json!(FieldErrors::single(field, message.as_str()))
            }
            Error::Authentication(detail) => json!({ "detail": detail }),
            Error::NotFound => json!({ "detail": "Not found." }),
            Error::MethodNotAllowed => json!({ "detail": "Method not allowed." }),
            Error::Internal(_) => json!({ "detail": "Internal server error." }),
        }
    }
}

impl warp::reject::Reject for Error {}

const UNIQUE_CONSTRAINTS: &[(&str, &str, &str)] = &[(
    "users_email_lower_idx",
    "email",
    "user with this email already exists.",
)];

pub struct QueryError {
    info: String,
    conflict: Option<(&'static str, &'static str)>,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self {
            info,
            conflict: None,
        }
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Database(e) if e.is_unique_violation() => {
                let conflict = e.constraint().and_then(|constraint| {
                    UNIQUE_CONSTRAINTS
                        .iter()
                        .find(|(name, _, _)| *name == constraint)
                        .map(|(_, field, message)| (*field, *message))
                });
                Self {
                    info: format!("{e}"),
                    conflict,
                }
            }
            sqlx::Error::Database(e) => Self::new(format!("{e}")),
            sqlx::Error::Io(e) => Self::new(format!("{e}")),
            sqlx::Error::Tls(e) => Self::new(format!("{e}")),
            sqlx::Error::Protocol(e) => Self::new(e),
            sqlx::Error::RowNotFound => Self::new(String::from("Row not found")),
            sqlx::Error::ColumnNotFound(e) => Self::new(format!("Column not found: {e}")),
            sqlx::Error::ColumnDecode { index, source } => {
                Self::new(format!("Column decode {index} ({source})"))
            }
            sqlx::Error::PoolTimedOut => Self::new(String::from("Pool timed out")),
            sqlx::Error::PoolClosed => Self::new(String::from("Pool closed")),
            sqlx::Error::Migrate(e) => Self::new(format!("{e}")),
            e => Self::new(format!("{e}")),
        }
    }
}

impl From<QueryError> for Error {
    fn from(value: QueryError) -> Self {
        match value.conflict {
            Some((field, message)) => Error::Conflict {
                field,
                message: message.to_owned(),
            },
            None => Error::Internal(value.info),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for Error {
    fn from(value: sqlx::migrate::MigrateError) -> Self {
        Error::Internal(format!("migration failed: {value}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_errors_accumulate_per_field() {
        let mut errors = FieldErrors::new();
        errors.add("title", "This field is required.");
        errors.add("price", "A valid number is required.");
        errors.add("price", "Ensure this value is greater than or equal to 0.");

        assert_eq!(errors.get("price").map(<[String]>::len), Some(2));
        assert_eq!(
            json!(errors),
            json!({
                "price": [
                    "A valid number is required.",
                    "Ensure this value is greater than or equal to 0."
                ],
                "title": ["This field is required."],
            })
        );
    }

    #[test]
    fn conflict_is_reported_as_bad_request_on_the_field() {
        let error = Error::Conflict {
            field: "email",
            message: String::from("user with this email already exists."),
        };

        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            error.body(),
            json!({ "email": ["user with this email already exists."] })
        );
    }

    #[test]
    fn internal_error_hides_its_cause() {
        let error = Error::Internal(String::from("connection refused"));

        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!error.body().to_string().contains("connection refused"));
    }

    #[test]
    fn errors_travel_as_warp_rejections() {
        let rejection: warp::reject::Rejection = Error::NotFound.into();

        assert!(matches!(rejection.find::<Error>(), Some(Error::NotFound)));
    }

    #[test]
    fn plain_query_errors_become_internal() {
        let error: Error = QueryError::from(sqlx::Error::RowNotFound).into();

        assert!(matches!(error, Error::Internal(_)));
    }
}
