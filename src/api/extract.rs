use bytes::{BufMut, Bytes};
use futures_util::TryStreamExt;
use warp::{http::StatusCode, reject::Rejection, reply::Response, Filter, Reply};

use crate::{constants::MAX_JSON_BODY_BYTES, error::Error, form::Form};

const NO_FILE: &str = "No file was submitted.";
const EMPTY_FILE: &str = "The submitted file is empty.";

/// JSON request body decoded into a `Form`.
pub fn json_form() -> impl Filter<Extract = (Form,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_JSON_BODY_BYTES)
        .and(warp::body::bytes())
        .and_then(|body: Bytes| async move { Form::parse(&body).map_err(Rejection::from) })
}

/// Multipart body capped at `max_length` bytes.
pub fn multipart_form(
    max_length: u64,
) -> impl Filter<Extract = (warp::multipart::FormData,), Error = Rejection> + Clone {
    warp::multipart::form().max_length(max_length)
}

/// Reads the named file part, skipping everything else.
pub async fn read_file_part(form: warp::multipart::FormData, field: &str) -> Result<Vec<u8>, Error> {
    let mut form = Box::pin(form);

    while let Some(part) = form
        .try_next()
        .await
        .map_err(|e| Error::validation(field, format!("Malformed upload: {e}")))?
    {
        if part.name() != field {
            continue;
        }

        let data = part
            .stream()
            .try_fold(Vec::new(), |mut data, chunk| async move {
                data.put(chunk);
                Ok(data)
            })
            .await
            .map_err(|e| Error::validation(field, format!("Malformed upload: {e}")))?;

        if data.is_empty() {
            return Err(Error::validation(field, EMPTY_FILE));
        }
        return Ok(data);
    }

    Err(Error::validation(field, NO_FILE))
}

pub fn json_response<T: serde::Serialize>(value: &T, status: StatusCode) -> Response {
    warp::reply::with_status(warp::reply::json(value), status).into_response()
}
