use warp::{
    filters::BoxedFilter,
    http::{Method, StatusCode},
    reject::Rejection,
    reply::Response,
    Filter,
};

use crate::{
    authentication::{accounts, middleware::with_identity},
    error::Error,
    extract::{json_form, json_response},
    form::{Form, ProfileForm, RegisterForm, TokenForm},
    schema::{TokenResponse, UserResponse},
    state::{with_state, AppState},
    store::Identity,
};

pub fn user_routes(state: AppState) -> BoxedFilter<(Response,)> {
    let registration = warp::path!("users")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(json_form())
        .and_then(register);

    let issue_token = warp::path!("users" / "token")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(json_form())
        .and_then(token);

    let me = warp::path!("users" / "me");
    let show = me
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(with_identity(state.clone()))
        .and_then(profile);
    let replace = me
        .and(warp::put())
        .and(with_state(state.clone()))
        .and(with_identity(state.clone()))
        .and(json_form())
        .and_then(|state: AppState, identity: Identity, form: Form| {
            update_profile(state, identity, form, false)
        });
    let patch = me
        .and(warp::patch())
        .and(with_state(state.clone()))
        .and(with_identity(state.clone()))
        .and(json_form())
        .and_then(|state: AppState, identity: Identity, form: Form| {
            update_profile(state, identity, form, true)
        });
    let unsupported = me
        .and(warp::method())
        .and_then(|method: Method| async move {
            if [Method::GET, Method::PUT, Method::PATCH].contains(&method) {
                Err(warp::reject::not_found())
            } else {
                Ok(())
            }
        })
        .untuple_one()
        .and(with_identity(state))
        .and_then(|_identity: Identity| async move {
            Err::<Response, Rejection>(Error::MethodNotAllowed.into())
        });

    registration
        .or(issue_token)
        .unify()
        .or(show)
        .unify()
        .or(replace)
        .unify()
        .or(patch)
        .unify()
        .or(unsupported)
        .unify()
        .boxed()
}

async fn register(state: AppState, form: Form) -> Result<Response, Rejection> {
    let form = RegisterForm::from_form(form)?;
    let user = accounts::register(state.users.as_ref(), form).await?;

    Ok(json_response(&UserResponse::from(&user), StatusCode::CREATED))
}

async fn token(state: AppState, form: Form) -> Result<Response, Rejection> {
    let token = accounts::login(
        state.users.as_ref(),
        &state.tokens,
        TokenForm::from_form(form),
    )
    .await?;

    Ok(json_response(&TokenResponse { token }, StatusCode::OK))
}

async fn profile(state: AppState, identity: Identity) -> Result<Response, Rejection> {
    let user = accounts::profile(state.users.as_ref(), &identity).await?;

    Ok(json_response(&UserResponse::from(&user), StatusCode::OK))
}

async fn update_profile(
    state: AppState,
    identity: Identity,
    form: Form,
    partial: bool,
) -> Result<Response, Rejection> {
    let form = ProfileForm::from_form(form, partial)?;
    let user = accounts::update_profile(state.users.as_ref(), &identity, form).await?;

    Ok(json_response(&UserResponse::from(&user), StatusCode::OK))
}
