use warp::{
    filters::BoxedFilter, http::StatusCode, multipart::FormData, reject::Rejection,
    reply::Response, Filter, Reply,
};

use crate::{
    authentication::middleware::with_identity,
    extract::{json_form, json_response, multipart_form, read_file_part},
    form::{Form, RecipeForm},
    schema::{Id, RecipeDetail, RecipeImageResponse, RecipeSummary},
    state::{with_state, AppState},
    store::Identity,
};

pub fn recipe_routes(state: AppState) -> BoxedFilter<(Response,)> {
    let collection = warp::path!("recipes");
    let item = warp::path!("recipes" / Id);

    let list = collection
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(with_identity(state.clone()))
        .and_then(list_recipes);
    let create = collection
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(with_identity(state.clone()))
        .and(json_form())
        .and_then(create_recipe);

    let retrieve = item
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(with_identity(state.clone()))
        .and_then(retrieve_recipe);
    let replace = item
        .and(warp::put())
        .and(with_state(state.clone()))
        .and(with_identity(state.clone()))
        .and(json_form())
        .and_then(|id: Id, state: AppState, identity: Identity, form: Form| {
            update_recipe(id, state, identity, form, false)
        });
    let patch = item
        .and(warp::patch())
        .and(with_state(state.clone()))
        .and(with_identity(state.clone()))
        .and(json_form())
        .and_then(|id: Id, state: AppState, identity: Identity, form: Form| {
            update_recipe(id, state, identity, form, true)
        });
    let delete = item
        .and(warp::delete())
        .and(with_state(state.clone()))
        .and(with_identity(state.clone()))
        .and_then(delete_recipe);

    let upload = warp::path!("recipes" / Id / "image")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(with_identity(state.clone()))
        .and(multipart_form(state.media.max_upload_bytes()))
        .and_then(upload_image);

    list.or(create)
        .unify()
        .or(retrieve)
        .unify()
        .or(replace)
        .unify()
        .or(patch)
        .unify()
        .or(delete)
        .unify()
        .or(upload)
        .unify()
        .boxed()
}

async fn list_recipes(state: AppState, identity: Identity) -> Result<Response, Rejection> {
    let recipes = state.catalog.list_recipes(&identity).await?;
    let body = recipes.iter().map(RecipeSummary::from).collect::<Vec<_>>();

    Ok(json_response(&body, StatusCode::OK))
}

async fn create_recipe(
    state: AppState,
    identity: Identity,
    form: Form,
) -> Result<Response, Rejection> {
    let recipe = RecipeForm::create(form)?;
    let recipe = state.catalog.create_recipe(&identity, recipe).await?;
    log::info!("User {} created recipe {}", identity.user_id(), recipe.id);

    Ok(json_response(&RecipeSummary::from(&recipe), StatusCode::CREATED))
}

async fn retrieve_recipe(
    id: Id,
    state: AppState,
    identity: Identity,
) -> Result<Response, Rejection> {
    let recipe = state.catalog.get_recipe(&identity, id).await?;

    Ok(json_response(&RecipeDetail::from(&recipe), StatusCode::OK))
}

async fn update_recipe(
    id: Id,
    state: AppState,
    identity: Identity,
    form: Form,
    partial: bool,
) -> Result<Response, Rejection> {
    let changes = if partial {
        RecipeForm::patch(form)?
    } else {
        RecipeForm::replace(form)?
    };
    let recipe = state.catalog.update_recipe(&identity, id, changes).await?;

    Ok(json_response(&RecipeSummary::from(&recipe), StatusCode::OK))
}

async fn delete_recipe(id: Id, state: AppState, identity: Identity) -> Result<Response, Rejection> {
    let recipe = state.catalog.delete_recipe(&identity, id).await?;
    if let Some(image) = &recipe.image {
        state.media.remove(image).await;
    }
    log::info!("User {} deleted recipe {}", identity.user_id(), id);

    Ok(StatusCode::NO_CONTENT.into_response())
}

/// The new file is written before the reference is swapped, so a rejected
/// upload never disturbs the current image.
async fn upload_image(
    id: Id,
    state: AppState,
    identity: Identity,
    form: FormData,
) -> Result<Response, Rejection> {
    state.catalog.get_recipe(&identity, id).await?;

    let data = read_file_part(form, "image").await?;
    let image = state.media.save_recipe_image(&data).await?;

    let previous = match state.catalog.set_recipe_image(&identity, id, &image).await {
        Ok(previous) => previous,
        Err(e) => {
            state.media.remove(&image).await;
            return Err(e.into());
        }
    };
    if let Some(previous) = previous {
        state.media.remove(&previous).await;
    }

    Ok(json_response(
        &RecipeImageResponse {
            id,
            image: Some(image),
        },
        StatusCode::OK,
    ))
}
