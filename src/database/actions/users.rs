use crate::{
    error::{Error, QueryError},
    schema::{Id, NewUser, User, UserChanges},
};

use sqlx::{Pool, Postgres};

const USER_COLUMNS: &str = "id, email, password, name, is_active";

pub async fn get_user(pool: &Pool<Postgres>, email: &str) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_user_by_id(pool: &Pool<Postgres>, user_id: Id) -> Result<Option<User>, Error> {
    let row: Option<User> =
        sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(pool)
            .await
            .map_err(QueryError::from)?;

    Ok(row)
}

/// Creates a user from an already hashed password.
pub async fn register_user(user: NewUser, pool: &Pool<Postgres>) -> Result<User, Error> {
    let row: User = sqlx::query_as(&format!(
        "
        INSERT INTO users (email, password, name)
        VALUES ($1, $2, $3)
        RETURNING {USER_COLUMNS}
    "
    ))
    .bind(user.email)
    .bind(user.password_hash)
    .bind(user.name)
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn update_user(
    user_id: Id,
    changes: UserChanges,
    pool: &Pool<Postgres>,
) -> Result<User, Error> {
    let row: Option<User> = sqlx::query_as(&format!(
        "
        UPDATE users
        SET email = COALESCE($1, email),
            name = COALESCE($2, name),
            password = COALESCE($3, password)
        WHERE id = $4
        RETURNING {USER_COLUMNS}
    "
    ))
    .bind(changes.email)
    .bind(changes.name)
    .bind(changes.password_hash)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    row.ok_or(Error::NotFound)
}

pub async fn set_user_active(
    pool: &Pool<Postgres>,
    email: &str,
    active: bool,
) -> Result<User, Error> {
    let row: Option<User> = sqlx::query_as(&format!(
        "
        UPDATE users
        SET is_active = $2
        WHERE LOWER(email) = LOWER($1)
        RETURNING {USER_COLUMNS}
    "
    ))
    .bind(email)
    .bind(active)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    row.ok_or(Error::NotFound)
}
