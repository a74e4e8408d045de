use std::convert::Infallible;

use serde_json::json;
use warp::{
    http::StatusCode,
    reject::{
        InvalidHeader, LengthRequired, MethodNotAllowed, MissingHeader, PayloadTooLarge,
        Rejection, UnsupportedMediaType,
    },
    reply::Response,
};

use crate::{error::Error, extract::json_response};

/// Renders every rejection as a JSON error body.
pub async fn handle_rejection(rejection: Rejection) -> Result<Response, Infallible> {
    if let Some(error) = rejection.find::<Error>() {
        if let Error::Internal(cause) = error {
            log::error!("Request failed: {cause}");
        }
        return Ok(json_response(&error.body(), error.status()));
    }

    let (status, detail) = if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, String::from("Not found."))
    } else if rejection.find::<PayloadTooLarge>().is_some() {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            String::from("Request body is too large."),
        )
    } else if let Some(e) = rejection.find::<warp::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if rejection.find::<MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            String::from("Method not allowed."),
        )
    } else if let Some(e) = rejection.find::<MissingHeader>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if let Some(e) = rejection.find::<InvalidHeader>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if let Some(e) = rejection.find::<UnsupportedMediaType>() {
        (StatusCode::UNSUPPORTED_MEDIA_TYPE, e.to_string())
    } else if rejection.find::<LengthRequired>().is_some() {
        (
            StatusCode::LENGTH_REQUIRED,
            String::from("A Content-Length header is required."),
        )
    } else {
        log::error!("Unhandled rejection: {rejection:?}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            String::from("Internal server error."),
        )
    };

    Ok(json_response(&json!({ "detail": detail }), status))
}
