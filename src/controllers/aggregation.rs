//! Aggregation endpoints: `{name}:{count,sum,avg,min,max}`. Reached through
//! the wildcard dispatcher, which has
//! already resolved the collection and parsed the action suffix.

use serde::Serialize;
use sqlx::Row;

use crate::context::AppContext;
use crate::error::AppError;
use crate::models::Collection;
use crate::planner::{self, AggregateOp};

use super::json_api::ok;

#[derive(Debug, Serialize)]
struct AggregateResponse {
    value: serde_json::Value,
}

pub async fn run(
    ctx: &AppContext,
    collection: &Collection,
    op: AggregateOp,
    pairs: &[(String, String)],
) -> Result<axum::response::Response, AppError> {
    let settings = crate::config::settings();
    let field = pairs
        .iter()
        .find(|(k, _)| k == "field")
        .map(|(_, v)| v.as_str());

    let plan = planner::build_aggregate(
        ctx.db().dialect(),
        collection,
        op,
        field,
        pairs,
        &settings.limits,
    )?;

    let row = ctx.db().query_one(&plan.sql, &plan.params).await?;
    let value = aggregate_value(&row, op)?;
    Ok(ok(AggregateResponse { value }))
}

fn aggregate_value(row: &sqlx::any::AnyRow, op: AggregateOp) -> Result<serde_json::Value, AppError> {
    if op == AggregateOp::Count {
        let count: i64 = row.try_get("value").map_err(sqlx::Error::from)?;
        return Ok(serde_json::json!(count));
    }
    // SUM/AVG/MIN/MAX over empty sets surface as SQL NULL.
    match row.try_get::<Option<f64>, _>("value").map_err(sqlx::Error::from)? {
        Some(v) => Ok(serde_json::json!(v)),
        None => Ok(serde_json::Value::Null),
    }
}
