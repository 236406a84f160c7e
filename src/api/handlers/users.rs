//! User CRUD over the MySQL pool.

use crate::api::error::AppError;
use crate::api::handlers::parse_id;
use crate::api::PoolInfo;
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use tracing::{info_span, instrument, Instrument};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub name: String,
    pub age: i32,
}

#[utoipa::path(
    post,
    path= "/users",
    responses (
        (status = 201, description = "User created; body is the new id", body = i32),
        (status = 400, description = "Missing or invalid payload"),
    ),
    tag= "users"
)]
#[instrument(skip(db, payload))]
pub async fn create(
    db: Extension<PoolInfo>,
    payload: Option<Json<User>>,
) -> Result<Response, AppError> {
    let Some(Json(user)) = payload else {
        return Ok((StatusCode::BAD_REQUEST, "Missing payload").into_response());
    };

    let id = insert_user(&db, &user).await?;
    Ok((StatusCode::CREATED, Json(id)).into_response())
}

#[utoipa::path(
    get,
    path= "/users/{id}",
    responses (
        (status = 200, description = "User found", body = User),
        (status = 400, description = "Invalid id"),
        (status = 404, description = "No such user"),
    ),
    tag= "users"
)]
#[instrument(skip(db))]
pub async fn read(db: Extension<PoolInfo>, Path(id): Path<String>) -> Result<Response, AppError> {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(reject) => return Ok(reject.into_response()),
    };

    match fetch_user(&db, id).await? {
        Some(user) => Ok((StatusCode::OK, Json(user)).into_response()),
        None => Ok(StatusCode::NOT_FOUND.into_response()),
    }
}

#[utoipa::path(
    put,
    path= "/users/{id}",
    responses (
        (status = 200, description = "User updated"),
        (status = 400, description = "Invalid id or payload"),
    ),
    tag= "users"
)]
#[instrument(skip(db, payload))]
pub async fn update(
    db: Extension<PoolInfo>,
    Path(id): Path<String>,
    payload: Option<Json<User>>,
) -> Result<Response, AppError> {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(reject) => return Ok(reject.into_response()),
    };
    let Some(Json(user)) = payload else {
        return Ok((StatusCode::BAD_REQUEST, "Missing payload").into_response());
    };

    update_user(&db, id, &user).await?;
    Ok(StatusCode::OK.into_response())
}

#[utoipa::path(
    delete,
    path= "/users/{id}",
    responses (
        (status = 200, description = "User deleted"),
        (status = 400, description = "Invalid id"),
    ),
    tag= "users"
)]
#[instrument(skip(db))]
pub async fn remove(db: Extension<PoolInfo>, Path(id): Path<String>) -> Result<Response, AppError> {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(reject) => return Ok(reject.into_response()),
    };

    delete_user(&db, id).await?;
    Ok(StatusCode::OK.into_response())
}

async fn insert_user(db: &PoolInfo, user: &User) -> anyhow::Result<i32> {
    let query = "INSERT INTO users (name, age) VALUES (?, ?)";
    let span = info_span!(
        "db.query",
        db.system = "mysql",
        db.operation = "INSERT",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(&user.name)
        .bind(user.age)
        .execute(&db.pool)
        .instrument(span)
        .await?;

    Ok(i32::try_from(result.last_insert_id()).unwrap_or(i32::MAX))
}

async fn fetch_user(db: &PoolInfo, id: i32) -> anyhow::Result<Option<User>> {
    let query = "SELECT name, age FROM users WHERE id = ?";
    let span = info_span!(
        "db.query",
        db.system = "mysql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(id)
        .fetch_optional(&db.pool)
        .instrument(span)
        .await?;

    Ok(row.map(|row| User {
        name: row.get("name"),
        age: row.get("age"),
    }))
}

async fn update_user(db: &PoolInfo, id: i32, user: &User) -> anyhow::Result<()> {
    let query = "UPDATE users SET name = ?, age = ? WHERE id = ?";
    let span = info_span!(
        "db.query",
        db.system = "mysql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(&user.name)
        .bind(user.age)
        .bind(id)
        .execute(&db.pool)
        .instrument(span)
        .await?;

    Ok(())
}

async fn delete_user(db: &PoolInfo, id: i32) -> anyhow::Result<()> {
    let query = "DELETE FROM users WHERE id = ?";
    let span = info_span!(
        "db.query",
        db.system = "mysql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(id)
        .execute(&db.pool)
        .instrument(span)
        .await?;

    Ok(())
}
