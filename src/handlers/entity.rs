//! Entity CRUD handlers: create, find, count, update, replace, delete.
//! Handlers resolve the entity by path segment; gated ones take the
//! authenticated principal as an extractor argument, so a missing or invalid
//! token is rejected before the handler body runs.

use crate::error::AppError;
use crate::extractors::AuthenticatedUser;
use crate::filter::{parse_where, Filter};
use crate::model::EntityDef;
use crate::service::CrudRepository;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Body of `GET /{resource}/count` and `PATCH /{resource}`.
#[derive(Serialize)]
pub struct Count {
    pub count: u64,
}

fn resolve(state: &AppState, resource: &str) -> Result<&'static EntityDef, AppError> {
    state
        .registry
        .entity_by_path(resource)
        .ok_or_else(|| AppError::NotFound(format!("resource {}", resource)))
}

fn parse_id(raw: &str) -> Result<i64, AppError> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("invalid id: {}", raw)))
}

fn body_to_map(value: Value) -> Result<Map<String, Value>, AppError> {
    match value {
        Value::Object(m) => Ok(m),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

pub async fn create(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    _user: AuthenticatedUser,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let entity = resolve(&state, &resource)?;
    let body = body_to_map(body)?;
    let record = CrudRepository::new(&state.db, entity).create(body).await?;
    Ok((StatusCode::OK, Json(record)))
}

pub async fn find(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let entity = resolve(&state, &resource)?;
    let filter = Filter::from_query(params.get("filter").map(String::as_str))?;
    let records = CrudRepository::new(&state.db, entity).find(&filter).await?;
    Ok((StatusCode::OK, Json(Value::Array(records))))
}

pub async fn count(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let entity = resolve(&state, &resource)?;
    let query = parse_where(entity, params.get("where").map(String::as_str))?;
    let count = CrudRepository::new(&state.db, entity).count(query).await?;
    Ok((StatusCode::OK, Json(Count { count })))
}

pub async fn update_all(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    _user: AuthenticatedUser,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let entity = resolve(&state, &resource)?;
    let query = parse_where(entity, params.get("where").map(String::as_str))?;
    let body = body_to_map(body)?;
    let count = CrudRepository::new(&state.db, entity)
        .update_all(body, query)
        .await?;
    Ok((StatusCode::OK, Json(Count { count })))
}

pub async fn find_by_id(
    State(state): State<AppState>,
    Path((resource, id_str)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let entity = resolve(&state, &resource)?;
    let id = parse_id(&id_str)?;
    let mut filter = Filter::from_query(params.get("filter").map(String::as_str))?;
    // By-id reads accept field selection only; the where-clause is excluded.
    filter.where_ = None;
    let record = CrudRepository::new(&state.db, entity)
        .find_by_id(id, &filter)
        .await?;
    Ok((StatusCode::OK, Json(record)))
}

pub async fn update_by_id(
    State(state): State<AppState>,
    Path((resource, id_str)): Path<(String, String)>,
    _user: AuthenticatedUser,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let entity = resolve(&state, &resource)?;
    let id = parse_id(&id_str)?;
    let body = body_to_map(body)?;
    CrudRepository::new(&state.db, entity)
        .update_by_id(id, body)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn replace_by_id(
    State(state): State<AppState>,
    Path((resource, id_str)): Path<(String, String)>,
    _user: AuthenticatedUser,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let entity = resolve(&state, &resource)?;
    let id = parse_id(&id_str)?;
    let body = body_to_map(body)?;
    CrudRepository::new(&state.db, entity)
        .replace_by_id(id, body)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_by_id(
    State(state): State<AppState>,
    Path((resource, id_str)): Path<(String, String)>,
    _user: AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let entity = resolve(&state, &resource)?;
    let id = parse_id(&id_str)?;
    CrudRepository::new(&state.db, entity).delete_by_id(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
