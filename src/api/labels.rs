use warp::{filters::BoxedFilter, http::StatusCode, reject::Rejection, reply::Response, Filter};

use crate::{
    authentication::middleware::with_identity,
    extract::{json_form, json_response},
    form::{Form, LabelForm},
    schema::{LabelKind, LabelResponse},
    state::{with_state, AppState},
    store::Identity,
};

/// `GET`/`POST` on `tags/` or `ingredients/`.
pub fn label_routes(kind: LabelKind, state: AppState) -> BoxedFilter<(Response,)> {
    let collection = warp::path(kind.table()).and(warp::path::end());

    let list = collection
        .clone()
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(with_identity(state.clone()))
        .and_then(move |state: AppState, identity: Identity| {
            list_labels(kind, state, identity)
        });

    let create = collection
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(with_identity(state))
        .and(json_form())
        .and_then(move |state: AppState, identity: Identity, form: Form| {
            create_label(kind, state, identity, form)
        });

    list.or(create).unify().boxed()
}

async fn list_labels(
    kind: LabelKind,
    state: AppState,
    identity: Identity,
) -> Result<Response, Rejection> {
    let labels = state.catalog.list_labels(kind, &identity).await?;
    let body = labels.iter().map(LabelResponse::from).collect::<Vec<_>>();

    Ok(json_response(&body, StatusCode::OK))
}

async fn create_label(
    kind: LabelKind,
    state: AppState,
    identity: Identity,
    form: Form,
) -> Result<Response, Rejection> {
    let form = LabelForm::from_form(form)?;
    let label = state
        .catalog
        .create_label(kind, &identity, &form.name)
        .await?;
    log::info!(
        "User {} created {} {}",
        identity.user_id(),
        kind.field(),
        label.id
    );

    Ok(json_response(&LabelResponse::from(&label), StatusCode::CREATED))
}
