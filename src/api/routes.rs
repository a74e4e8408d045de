use std::convert::Infallible;

use serde_json::json;
use warp::{Filter, Reply};

use crate::{
    labels::label_routes,
    recipes::recipe_routes,
    rejection::handle_rejection,
    schema::LabelKind,
    state::AppState,
    users::user_routes,
};

/// The complete HTTP surface: `/api/...`, `/media/...` and `/health/`.
pub fn routes(
    state: AppState,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let api = warp::path("api").and(
        user_routes(state.clone())
            .or(recipe_routes(state.clone()))
            .unify()
            .or(label_routes(LabelKind::Tag, state.clone()))
            .unify()
            .or(label_routes(LabelKind::Ingredient, state.clone()))
            .unify(),
    );

    let media = warp::path("media")
        .and(warp::get())
        .and(warp::fs::dir(state.media.root().to_path_buf()))
        .map(|file: warp::fs::File| file.into_response());

    let health = warp::path!("health")
        .and(warp::get())
        .map(|| warp::reply::json(&json!({ "status": "ok" })).into_response());

    api.or(media)
        .unify()
        .or(health)
        .unify()
        .recover(handle_rejection)
        .with(warp::log("recipe_catalog::api"))
}
