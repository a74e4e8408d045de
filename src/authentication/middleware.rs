use warp::{reject::Rejection, Filter};

use crate::{constants::TOKEN_SCHEMES, error::Error, state::AppState, store::Identity};

fn not_provided() -> Error {
    Error::Authentication(String::from(
        "Authentication credentials were not provided.",
    ))
}

/// Extracts the token from `Authorization: <scheme> <token>`.
pub fn bearer_token(header: &str) -> Result<&str, Error> {
    let mut parts = header.split_whitespace();
    let scheme = parts.next().ok_or_else(not_provided)?;
    if !TOKEN_SCHEMES
        .iter()
        .any(|known| known.eq_ignore_ascii_case(scheme))
    {
        return Err(not_provided());
    }

    match (parts.next(), parts.next()) {
        (Some(token), None) => Ok(token),
        (None, _) => Err(Error::Authentication(String::from(
            "Invalid token header. No credentials provided.",
        ))),
        (Some(_), Some(_)) => Err(Error::Authentication(String::from(
            "Invalid token header. Token string should not contain spaces.",
        ))),
    }
}

/// Resolves the caller; the signature is checked before any store lookup.
pub async fn authenticate(state: &AppState, header: Option<&str>) -> Result<Identity, Error> {
    let token = bearer_token(header.ok_or_else(not_provided)?)?;
    let claims = state.tokens.verify(token)?;

    match state.users.get_user(claims.user_id).await? {
        Some(user) if user.is_active => Ok(Identity::new(user.id)),
        Some(_) => Err(Error::Authentication(String::from(
            "User inactive or deleted.",
        ))),
        None => Err(Error::Authentication(String::from("Invalid token."))),
    }
}

pub fn with_identity(
    state: AppState,
) -> impl Filter<Extract = (Identity,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let state = state.clone();
        async move {
            authenticate(&state, header.as_deref())
                .await
                .map_err(Rejection::from)
        }
    })
}
