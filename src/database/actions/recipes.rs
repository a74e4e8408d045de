use std::collections::HashMap;

use crate::{
    actions::labels::{check_labels, list_recipe_labels, replace_recipe_labels},
    error::{Error, QueryError},
    schema::{Id, Label, LabelKind, NewRecipe, Recipe, RecipeChanges, RecipeRow},
};

use sqlx::{PgConnection, Pool, Postgres};

const RECIPE_COLUMNS: &str = "id, user_id, title, time_minutes, price_cents, link, image";

async fn attach_labels(rows: Vec<RecipeRow>, conn: &mut PgConnection) -> Result<Vec<Recipe>, Error> {
    let ids = rows.iter().map(|row| row.id).collect::<Vec<Id>>();
    let mut tags = list_recipe_labels(LabelKind::Tag, &ids, conn).await?;
    let mut ingredients = list_recipe_labels(LabelKind::Ingredient, &ids, conn).await?;

    let take = |map: &mut HashMap<Id, Vec<Label>>, id: Id| map.remove(&id).unwrap_or_default();
    Ok(rows
        .into_iter()
        .map(|row| {
            let (tags, ingredients) = (take(&mut tags, row.id), take(&mut ingredients, row.id));
            Recipe::from_row(row, tags, ingredients)
        })
        .collect())
}

async fn get_recipe_row(
    user_id: Id,
    id: Id,
    lock: bool,
    conn: &mut PgConnection,
) -> Result<RecipeRow, Error> {
    let lock = if lock { "FOR UPDATE" } else { "" };
    let row: Option<RecipeRow> = sqlx::query_as(&format!(
        "SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1 AND user_id = $2 {lock}"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(QueryError::from)?;

    row.ok_or(Error::NotFound)
}

async fn load_recipe(user_id: Id, id: Id, conn: &mut PgConnection) -> Result<Recipe, Error> {
    let row = get_recipe_row(user_id, id, false, conn).await?;
    let mut recipes = attach_labels(vec![row], conn).await?;

    recipes.pop().ok_or(Error::NotFound)
}

pub async fn list_recipes(user_id: Id, pool: &Pool<Postgres>) -> Result<Vec<Recipe>, Error> {
    let mut conn = pool.acquire().await.map_err(QueryError::from)?;

    let rows: Vec<RecipeRow> = sqlx::query_as(&format!(
        "SELECT {RECIPE_COLUMNS} FROM recipes WHERE user_id = $1 ORDER BY id DESC"
    ))
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(QueryError::from)?;

    attach_labels(rows, &mut conn).await
}

pub async fn get_recipe(user_id: Id, id: Id, pool: &Pool<Postgres>) -> Result<Recipe, Error> {
    let mut conn = pool.acquire().await.map_err(QueryError::from)?;

    load_recipe(user_id, id, &mut conn).await
}

pub async fn create_recipe(
    user_id: Id,
    recipe: NewRecipe,
    pool: &Pool<Postgres>,
) -> Result<Recipe, Error> {
    let mut tr = pool.begin().await.map_err(QueryError::from)?;

    check_labels(LabelKind::Tag, user_id, &recipe.tags, &mut tr).await?;
    check_labels(LabelKind::Ingredient, user_id, &recipe.ingredients, &mut tr).await?;

    let id: (Id,) = sqlx::query_as(
        "
        INSERT INTO recipes (user_id, title, time_minutes, price_cents, link)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(user_id)
    .bind(&recipe.title)
    .bind(recipe.time_minutes)
    .bind(recipe.price)
    .bind(&recipe.link)
    .fetch_one(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    replace_recipe_labels(LabelKind::Tag, id.0, &recipe.tags, &mut tr).await?;
    replace_recipe_labels(LabelKind::Ingredient, id.0, &recipe.ingredients, &mut tr).await?;

    let created = load_recipe(user_id, id.0, &mut tr).await?;
    tr.commit().await.map_err(QueryError::from)?;

    Ok(created)
}

pub async fn update_recipe(
    user_id: Id,
    id: Id,
    changes: RecipeChanges,
    pool: &Pool<Postgres>,
) -> Result<Recipe, Error> {
    let mut tr = pool.begin().await.map_err(QueryError::from)?;

    let mut row = get_recipe_row(user_id, id, true, &mut tr).await?;
    for kind in [LabelKind::Tag, LabelKind::Ingredient] {
        if let Some(ids) = changes.labels(kind) {
            check_labels(kind, user_id, ids, &mut tr).await?;
        }
    }

    changes.apply(&mut row);
    sqlx::query(
        "
        UPDATE recipes
        SET title = $1, time_minutes = $2, price_cents = $3, link = $4
        WHERE id = $5 AND user_id = $6
    ",
    )
    .bind(&row.title)
    .bind(row.time_minutes)
    .bind(row.price)
    .bind(&row.link)
    .bind(id)
    .bind(user_id)
    .execute(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    for kind in [LabelKind::Tag, LabelKind::Ingredient] {
        if let Some(ids) = changes.labels(kind) {
            replace_recipe_labels(kind, id, ids, &mut tr).await?;
        }
    }

    let updated = load_recipe(user_id, id, &mut tr).await?;
    tr.commit().await.map_err(QueryError::from)?;

    Ok(updated)
}

pub async fn delete_recipe(user_id: Id, id: Id, pool: &Pool<Postgres>) -> Result<Recipe, Error> {
    let mut tr = pool.begin().await.map_err(QueryError::from)?;

    let deleted = load_recipe(user_id, id, &mut tr).await?;
    sqlx::query("DELETE FROM recipes WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;

    tr.commit().await.map_err(QueryError::from)?;

    Ok(deleted)
}

pub async fn set_recipe_image(
    user_id: Id,
    id: Id,
    image: &str,
    pool: &Pool<Postgres>,
) -> Result<Option<String>, Error> {
    let mut tr = pool.begin().await.map_err(QueryError::from)?;

    let previous = get_recipe_row(user_id, id, true, &mut tr).await?.image;
    sqlx::query("UPDATE recipes SET image = $1 WHERE id = $2 AND user_id = $3")
        .bind(image)
        .bind(id)
        .bind(user_id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;

    tr.commit().await.map_err(QueryError::from)?;

    Ok(previous)
}
