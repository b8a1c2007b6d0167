//! Data endpoints: `{name}:{list,get,create,update,destroy}`. These are
//! reached through the wildcard dispatcher in
//! `routes.rs`, which has already resolved `{name}` to a registered
//! `Collection` before calling into here.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::context::AppContext;
use crate::driver::AnyTransaction;
use crate::error::AppError;
use crate::models::{Collection, Record};
use crate::{planner, shaper, validator};

use super::json_api::{created, multi_status, ok};

pub async fn list(
    ctx: &AppContext,
    collection: &Collection,
    pairs: &[(String, String)],
) -> Result<axum::response::Response, AppError> {
    let settings = crate::config::settings();
    let plan = planner::build_list(
        ctx.db().dialect(),
        collection,
        pairs,
        &settings.pagination,
        &settings.limits,
    )?;

    let rows = ctx.db().query(&plan.select.sql, &plan.select.params).await?;
    let mut records = Vec::with_capacity(rows.len());
    for row in &rows {
        records.push(shaper::row_to_record(collection, row)?);
    }

    let total_row = ctx.db().query_one(&plan.count.sql, &plan.count.params).await?;
    let total: i64 = sqlx::Row::try_get(&total_row, "total").map_err(sqlx::Error::from)?;

    let envelope = shaper::build_list_envelope(records, total, plan.limit);
    Ok(ok(envelope))
}

#[derive(Debug, Deserialize)]
pub struct GetQuery {
    pub id: String,
}

pub async fn get(
    ctx: &AppContext,
    collection: &Collection,
    query: GetQuery,
) -> Result<axum::response::Response, AppError> {
    let record = fetch_one(ctx, collection, &query.id).await?;
    Ok(ok(serde_json::json!({ "data": record })))
}

async fn fetch_one(
    ctx: &AppContext,
    collection: &Collection,
    id: &str,
) -> Result<Record, AppError> {
    let canonical = crate::ulid::canonicalize(id).ok_or_else(|| AppError::invalid_ulid(id))?;
    let plan = planner::build_get(ctx.db().dialect(), collection, &canonical);
    let row = ctx
        .db()
        .query_optional(&plan.sql, &plan.params)
        .await?
        .ok_or_else(|| AppError::record_not_found(&canonical))?;
    shaper::row_to_record(collection, &row)
}

async fn insert_one(ctx: &AppContext, collection: &Collection, body: &Json) -> Result<Record, AppError> {
    let record = validator::coerce_payload(collection, body, false)?;
    let id = ctx.ulids().generate();
    let plan = planner::build_insert(ctx.db().dialect(), collection, &id, &record);
    ctx.db().insert_returning_pkid(&plan.sql, &plan.params).await?;
    fetch_one(ctx, collection, &id).await
}

async fn fetch_one_tx(
    ctx: &AppContext,
    tx: &mut AnyTransaction,
    collection: &Collection,
    id: &str,
) -> Result<Record, AppError> {
    let canonical = crate::ulid::canonicalize(id).ok_or_else(|| AppError::invalid_ulid(id))?;
    let plan = planner::build_get(ctx.db().dialect(), collection, &canonical);
    let row = ctx
        .db()
        .query_optional_tx(tx, &plan.sql, &plan.params)
        .await?
        .ok_or_else(|| AppError::record_not_found(&canonical))?;
    shaper::row_to_record(collection, &row)
}

async fn insert_one_tx(
    ctx: &AppContext,
    tx: &mut AnyTransaction,
    collection: &Collection,
    body: &Json,
) -> Result<Record, AppError> {
    let record = validator::coerce_payload(collection, body, false)?;
    let id = ctx.ulids().generate();
    let plan = planner::build_insert(ctx.db().dialect(), collection, &id, &record);
    ctx.db()
        .insert_returning_pkid_tx(tx, &plan.sql, &plan.params)
        .await?;
    fetch_one_tx(ctx, tx, collection, &id).await
}

#[derive(Debug, Serialize)]
struct BatchItemResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Record>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub async fn create(
    ctx: &AppContext,
    collection: &Collection,
    body: Json,
    atomic: bool,
) -> Result<axum::response::Response, AppError> {
    match body {
        Json::Array(items) => {
            if atomic {
                let mut tx = ctx.db().begin().await?;
                let mut created_records = Vec::with_capacity(items.len());
                for item in &items {
                    match insert_one_tx(ctx, &mut tx, collection, item).await {
                        Ok(record) => created_records.push(record),
                        Err(err) => {
                            let _ = tx.rollback().await;
                            return Err(err);
                        }
                    }
                }
                tx.commit().await.map_err(sqlx::Error::from)?;
                Ok(created(serde_json::json!({ "data": created_records })))
            } else {
                let mut results = Vec::with_capacity(items.len());
                for item in &items {
                    match insert_one(ctx, collection, item).await {
                        Ok(record) => results.push(BatchItemResult {
                            data: Some(record),
                            error: None,
                        }),
                        Err(err) => results.push(BatchItemResult {
                            data: None,
                            error: Some(err.to_string()),
                        }),
                    }
                }
                Ok(multi_status(serde_json::json!({ "data": results })))
            }
        }
        single => {
            let record = insert_one(ctx, collection, &single).await?;
            Ok(created(serde_json::json!({ "data": record })))
        }
    }
}

#[derive(Debug, Deserialize)]
struct UpdateItem {
    id: String,
    data: Json,
}

async fn update_one(
    ctx: &AppContext,
    collection: &Collection,
    id: &str,
    data: &Json,
) -> Result<Record, AppError> {
    let canonical = crate::ulid::canonicalize(id).ok_or_else(|| AppError::invalid_ulid(id))?;
    let record = validator::coerce_payload(collection, data, true)?;
    let plan = planner::build_update(ctx.db().dialect(), collection, &canonical, &record)?;
    let affected = ctx.db().exec(&plan.sql, &plan.params).await?;
    if affected == 0 {
        return Err(AppError::record_not_found(&canonical));
    }
    fetch_one(ctx, collection, &canonical).await
}

async fn update_one_tx(
    ctx: &AppContext,
    tx: &mut AnyTransaction,
    collection: &Collection,
    id: &str,
    data: &Json,
) -> Result<Record, AppError> {
    let canonical = crate::ulid::canonicalize(id).ok_or_else(|| AppError::invalid_ulid(id))?;
    let record = validator::coerce_payload(collection, data, true)?;
    let plan = planner::build_update(ctx.db().dialect(), collection, &canonical, &record)?;
    let affected = ctx.db().exec_tx(tx, &plan.sql, &plan.params).await?;
    if affected == 0 {
        return Err(AppError::record_not_found(&canonical));
    }
    fetch_one_tx(ctx, tx, collection, &canonical).await
}

pub async fn update(
    ctx: &AppContext,
    collection: &Collection,
    body: Json,
    atomic: bool,
) -> Result<axum::response::Response, AppError> {
    match body {
        Json::Array(items) => {
            let parsed: Vec<UpdateItem> = items
                .into_iter()
                .map(serde_json::from_value)
                .collect::<Result<_, _>>()
                .map_err(AppError::from)?;
            if atomic {
                let mut tx = ctx.db().begin().await?;
                let mut updated = Vec::with_capacity(parsed.len());
                for item in &parsed {
                    match update_one_tx(ctx, &mut tx, collection, &item.id, &item.data).await {
                        Ok(record) => updated.push(record),
                        Err(err) => {
                            let _ = tx.rollback().await;
                            return Err(err);
                        }
                    }
                }
                tx.commit().await.map_err(sqlx::Error::from)?;
                Ok(ok(serde_json::json!({ "data": updated })))
            } else {
                let mut results = Vec::with_capacity(parsed.len());
                for item in &parsed {
                    match update_one(ctx, collection, &item.id, &item.data).await {
                        Ok(record) => results.push(BatchItemResult {
                            data: Some(record),
                            error: None,
                        }),
                        Err(err) => results.push(BatchItemResult {
                            data: None,
                            error: Some(err.to_string()),
                        }),
                    }
                }
                Ok(multi_status(serde_json::json!({ "data": results })))
            }
        }
        object => {
            let item: UpdateItem = serde_json::from_value(object).map_err(AppError::from)?;
            let record = update_one(ctx, collection, &item.id, &item.data).await?;
            Ok(ok(serde_json::json!({ "data": record })))
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum DestroyBody {
    Ids(Vec<String>),
    Wrapped { data: Vec<String> },
    One { id: String },
}

async fn destroy_one(ctx: &AppContext, collection: &Collection, id: &str) -> Result<(), AppError> {
    let canonical = crate::ulid::canonicalize(id).ok_or_else(|| AppError::invalid_ulid(id))?;
    let plan = planner::build_delete(ctx.db().dialect(), collection, &canonical);
    let affected = ctx.db().exec(&plan.sql, &plan.params).await?;
    if affected == 0 {
        return Err(AppError::record_not_found(&canonical));
    }
    Ok(())
}

async fn destroy_one_tx(
    ctx: &AppContext,
    tx: &mut AnyTransaction,
    collection: &Collection,
    id: &str,
) -> Result<(), AppError> {
    let canonical = crate::ulid::canonicalize(id).ok_or_else(|| AppError::invalid_ulid(id))?;
    let plan = planner::build_delete(ctx.db().dialect(), collection, &canonical);
    let affected = ctx.db().exec_tx(tx, &plan.sql, &plan.params).await?;
    if affected == 0 {
        return Err(AppError::record_not_found(&canonical));
    }
    Ok(())
}

pub async fn destroy(
    ctx: &AppContext,
    collection: &Collection,
    body: DestroyBody,
    atomic: bool,
) -> Result<axum::response::Response, AppError> {
    let ids = match body {
        DestroyBody::Ids(ids) => ids,
        DestroyBody::Wrapped { data } => data,
        DestroyBody::One { id } => vec![id],
    };

    if atomic {
        let mut tx = ctx.db().begin().await?;
        for id in &ids {
            if let Err(err) = destroy_one_tx(ctx, &mut tx, collection, id).await {
                let _ = tx.rollback().await;
                return Err(err);
            }
        }
        tx.commit().await.map_err(sqlx::Error::from)?;
        Ok(ok(serde_json::json!({ "destroyed": ids })))
    } else {
        let mut results = Vec::with_capacity(ids.len());
        for id in &ids {
            match destroy_one(ctx, collection, id).await {
                Ok(()) => results.push(BatchItemResult {
                    data: Some({
                        let mut r = Record::new();
                        r.insert("id", crate::models::RecordValue::String(id.clone()));
                        r
                    }),
                    error: None,
                }),
                Err(err) => results.push(BatchItemResult {
                    data: None,
                    error: Some(err.to_string()),
                }),
            }
        }
        Ok(multi_status(serde_json::json!({ "data": results })))
    }
}
