use std::time::Duration;

use axum::extract::Extension;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;

use crate::context::AppContext;

#[serde_as]
#[derive(Debug, Serialize)]
pub struct HealthCheck {
    status: &'static str,
    #[serde_as(as = "serde_with::DisplayFromStr")]
    current_time: DateTime<Utc>,
    #[serde_as(as = "Option<serde_with::DurationSecondsWithFrac<String>>")]
    db_ping_seconds: Option<Duration>,
}

pub async fn show(Extension(ctx): Extension<AppContext>) -> Json<HealthCheck> {
    let db_ping_seconds = ping(&ctx).await;
    Json(HealthCheck {
        status: if db_ping_seconds.is_some() { "ok" } else { "degraded" },
        current_time: Utc::now(),
        db_ping_seconds,
    })
}

async fn ping(ctx: &AppContext) -> Option<Duration> {
    let start = Instant::now();
    ctx.db().query("SELECT 1", &[]).await.ok()?;
    Some(Instant::now() - start)
}
