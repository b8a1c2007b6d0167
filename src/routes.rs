//! The HTTP surface: fixed `collections:*` routes plus a
//! single dynamic fallback that recovers `{name}:{action}` from the trailing
//! path segment. axum's router treats a leading `:` in a path segment as a
//! capture, which collides with this API's colon-action convention — so
//! every fixed action is registered as a literal full-segment route (never
//! ambiguous, since the colon here isn't the first character) and only the
//! truly dynamic `{collection}:{action}` space falls through to the
//! wildcard.

use axum::extract::{Extension, Path, Query};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use serde_json::Value as Json;

use crate::context::AppContext;
use crate::controllers::{aggregation, collections, health_check, records};
use crate::error::AppError;
use crate::models::RESERVED_NAMES;
use crate::planner::AggregateOp;

pub fn routes() -> Router {
    Router::new()
        .route("/health", get(health_check::show))
        .route("/collections:list", get(collections::list))
        .route("/collections:get", get(collections::get))
        .route("/collections:create", post(collections::create))
        .route("/collections:update", post(collections::update))
        .route("/collections:destroy", post(collections::destroy))
        .route("/:segment", get(dispatch_get).post(dispatch_post))
}

/// Splits a `{name}:{action}` path segment, rejecting anything that can't
/// possibly name a managed collection (reserved names, missing colon) before
/// a registry lookup is even attempted.
fn split_segment(segment: &str) -> Result<(&str, &str), AppError> {
    let (name, action) = segment
        .rsplit_once(':')
        .ok_or_else(|| AppError::collection_not_found(segment))?;
    if name.is_empty() || action.is_empty() || RESERVED_NAMES.contains(&name) {
        return Err(AppError::collection_not_found(name));
    }
    Ok((name, action))
}

async fn dispatch_get(
    Path(segment): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
    Extension(ctx): Extension<AppContext>,
) -> Result<axum::response::Response, AppError> {
    let (name, action) = split_segment(&segment)?;
    let collection = ctx
        .registry()
        .get(name)
        .await
        .ok_or_else(|| AppError::collection_not_found(name))?;

    match action {
        "schema" => collections::schema(&ctx, &collection).await,
        "list" => records::list(&ctx, &collection, &pairs).await,
        "get" => {
            #[derive(Deserialize)]
            struct IdQuery {
                id: String,
            }
            let id = pairs
                .iter()
                .find(|(k, _)| k == "id")
                .map(|(_, v)| v.clone())
                .ok_or_else(|| AppError::validation("id", "the 'id' query parameter is required"))?;
            records::get(&ctx, &collection, records::GetQuery { id }).await
        }
        _ => {
            if let Some(op) = AggregateOp::parse(action) {
                aggregation::run(&ctx, &collection, op, &pairs).await
            } else {
                Ok(StatusCode::METHOD_NOT_ALLOWED.into_response())
            }
        }
    }
}

async fn dispatch_post(
    Path(segment): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
    Extension(ctx): Extension<AppContext>,
    body: axum::body::Bytes,
) -> Result<axum::response::Response, AppError> {
    let (name, action) = split_segment(&segment)?;
    let collection = ctx
        .registry()
        .get(name)
        .await
        .ok_or_else(|| AppError::collection_not_found(name))?;

    let atomic = pairs
        .iter()
        .find(|(k, _)| k == "atomic")
        .map(|(_, v)| v != "false")
        .unwrap_or(true);

    let json: Json = if body.is_empty() {
        Json::Null
    } else {
        serde_json::from_slice(&body).map_err(|e| AppError::invalid_json(e.to_string()))?
    };

    match action {
        "create" => records::create(&ctx, &collection, json, atomic).await,
        "update" => records::update(&ctx, &collection, json, atomic).await,
        "destroy" => {
            let destroy_body: records::DestroyBody =
                serde_json::from_value(json).map_err(|e| AppError::invalid_json(e.to_string()))?;
            records::destroy(&ctx, &collection, destroy_body, atomic).await
        }
        _ => Ok(StatusCode::METHOD_NOT_ALLOWED.into_response()),
    }
}

