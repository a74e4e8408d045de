use std::collections::HashMap;

use crate::{
    error::{Error, QueryError},
    schema::{Id, Label, LabelKind, LinkedLabel},
    store::invalid_reference,
};

use sqlx::{PgConnection, Pool, Postgres};

pub async fn list_labels(
    kind: LabelKind,
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<Vec<Label>, Error> {
    let table = kind.table();
    let rows: Vec<Label> = sqlx::query_as(&format!(
        "SELECT id, user_id, name FROM {table} WHERE user_id = $1 ORDER BY name DESC, id DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn create_label(
    kind: LabelKind,
    user_id: Id,
    name: &str,
    pool: &Pool<Postgres>,
) -> Result<Label, Error> {
    let table = kind.table();
    let row: Label = sqlx::query_as(&format!(
        "INSERT INTO {table} (user_id, name) VALUES ($1, $2) RETURNING id, user_id, name"
    ))
    .bind(user_id)
    .bind(name)
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

/// Fails on the first id that is missing or owned by someone else.
pub async fn check_labels(
    kind: LabelKind,
    user_id: Id,
    ids: &[Id],
    conn: &mut PgConnection,
) -> Result<(), Error> {
    if ids.is_empty() {
        return Ok(());
    }

    let table = kind.table();
    let found: Vec<(Id,)> = sqlx::query_as(&format!(
        "SELECT id FROM {table} WHERE user_id = $1 AND id = ANY($2)"
    ))
    .bind(user_id)
    .bind(ids)
    .fetch_all(&mut *conn)
    .await
    .map_err(QueryError::from)?;

    match ids
        .iter()
        .find(|id| !found.iter().any(|(found,)| found == *id))
    {
        Some(id) => Err(invalid_reference(kind, *id)),
        None => Ok(()),
    }
}

pub async fn replace_recipe_labels(
    kind: LabelKind,
    recipe_id: Id,
    ids: &[Id],
    conn: &mut PgConnection,
) -> Result<(), Error> {
    let (link_table, link_column) = (kind.link_table(), kind.link_column());

    sqlx::query(&format!("DELETE FROM {link_table} WHERE recipe_id = $1"))
        .bind(recipe_id)
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    if ids.is_empty() {
        return Ok(());
    }

    sqlx::query(&format!(
        "
        INSERT INTO {link_table} (recipe_id, {link_column})
        SELECT $1, UNNEST($2::INTEGER[])
        ON CONFLICT DO NOTHING
    "
    ))
    .bind(recipe_id)
    .bind(ids)
    .execute(&mut *conn)
    .await
    .map_err(QueryError::from)?;

    Ok(())
}

/// Labels linked to each of the given recipes, keyed by recipe id.
pub async fn list_recipe_labels(
    kind: LabelKind,
    recipe_ids: &[Id],
    conn: &mut PgConnection,
) -> Result<HashMap<Id, Vec<Label>>, Error> {
    let (table, link_table, link_column) = (kind.table(), kind.link_table(), kind.link_column());
    let rows: Vec<LinkedLabel> = sqlx::query_as(&format!(
        "
        SELECT l.recipe_id AS recipe_id, t.id AS id, t.user_id AS user_id, t.name AS name
        FROM {link_table} l
        INNER JOIN {table} t ON t.id = l.{link_column}
        WHERE l.recipe_id = ANY($1)
        ORDER BY t.id
    "
    ))
    .bind(recipe_ids)
    .fetch_all(&mut *conn)
    .await
    .map_err(QueryError::from)?;

    let mut hashmap: HashMap<Id, Vec<Label>> = HashMap::new();
    rows.into_iter().for_each(|row| {
        hashmap.entry(row.recipe_id).or_default().push(row.into());
    });

    Ok(hashmap)
}
