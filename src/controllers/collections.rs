//! Schema endpoints: `collections:{list,get,create,update,destroy}` plus
//! `{name}:schema`, dispatched from `routes.rs`.

use axum::extract::{Extension, Json, Query};
use serde::{Deserialize, Serialize};
use sqlx::Row;

use crate::context::AppContext;
use crate::error::AppError;
use crate::models::Collection;
use crate::schema_manager::{CreateCollectionInput, UpdateCollectionInput};

use super::json_api::{created, ok};

#[derive(Debug, Serialize)]
struct CollectionSummary {
    name: String,
    records: i64,
}

#[derive(Debug, Serialize)]
struct ListResponse {
    collections: Vec<CollectionSummary>,
    count: usize,
}

pub async fn list(Extension(ctx): Extension<AppContext>) -> axum::response::Response {
    let collections = ctx.registry().get_all().await;
    let mut summaries = Vec::with_capacity(collections.len());
    for collection in &collections {
        let records = record_count(&ctx, &collection.name).await.unwrap_or(-1);
        summaries.push(CollectionSummary {
            name: collection.name.clone(),
            records,
        });
    }
    let count = summaries.len();
    ok(ListResponse {
        collections: summaries,
        count,
    })
}

async fn record_count(ctx: &AppContext, name: &str) -> Option<i64> {
    let dialect = ctx.db().dialect();
    let sql = format!("SELECT COUNT(*) AS total FROM {}", dialect.quote_ident(name));
    let row = ctx.db().query_one(&sql, &[]).await.ok()?;
    row.try_get::<i64, _>("total").ok()
}

#[derive(Debug, Deserialize)]
pub struct GetQuery {
    name: String,
}

pub async fn get(
    Query(query): Query<GetQuery>,
    Extension(ctx): Extension<AppContext>,
) -> Result<axum::response::Response, AppError> {
    let collection = ctx
        .registry()
        .get(&query.name)
        .await
        .ok_or_else(|| AppError::collection_not_found(&query.name))?;
    Ok(ok(collection))
}

/// Serves `/{name}:schema`: the collection's schema plus its current row
/// count under `total`.
pub async fn schema(
    ctx: &AppContext,
    collection: &Collection,
) -> Result<axum::response::Response, AppError> {
    #[derive(Serialize)]
    struct SchemaResponse<'a> {
        #[serde(flatten)]
        collection: &'a Collection,
        total: i64,
    }
    let total = record_count(ctx, &collection.name).await.unwrap_or(-1);
    Ok(ok(SchemaResponse { collection, total }))
}

pub async fn create(
    Extension(ctx): Extension<AppContext>,
    Json(input): Json<CreateCollectionInput>,
) -> Result<axum::response::Response, AppError> {
    let collection = ctx.schema_manager().create(input).await?;
    Ok(created(collection))
}

pub async fn update(
    Extension(ctx): Extension<AppContext>,
    Json(input): Json<UpdateCollectionInput>,
) -> Result<axum::response::Response, AppError> {
    let collection = ctx.schema_manager().update(input).await?;
    Ok(ok(collection))
}

#[derive(Debug, Deserialize)]
pub struct DestroyBody {
    name: String,
}

pub async fn destroy(
    Extension(ctx): Extension<AppContext>,
    Json(body): Json<DestroyBody>,
) -> Result<axum::response::Response, AppError> {
    ctx.schema_manager().destroy(&body.name).await?;
    Ok(ok(serde_json::json!({ "name": body.name })))
}
