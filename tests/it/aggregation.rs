use crate::support::context::test_context;
use crate::support::redactor::body_json;

async fn seed_products(ctx: &crate::support::context::TestContext) {
    let payload = serde_json::json!({
        "name": "products",
        "columns": [
            { "name": "title", "type": "string", "nullable": false },
            { "name": "price", "type": "decimal", "nullable": false },
        ],
    });
    ctx.post("/collections:create", &payload).await;

    ctx.post("/products:create", &serde_json::json!({ "title": "A", "price": "10.00" })).await;
    ctx.post("/products:create", &serde_json::json!({ "title": "B", "price": "20.00" })).await;
    ctx.post("/products:create", &serde_json::json!({ "title": "C", "price": "30.00" })).await;
}

#[tokio::test]
async fn count_reports_the_row_count() {
    let ctx = test_context!();
    seed_products(&ctx).await;

    let response = ctx.get("/products:count").await;
    assert_eq!(response.status(), 200);
    let body = body_json(response).await;
    assert_eq!(body["value"], 3);
}

#[tokio::test]
async fn sum_and_avg_aggregate_a_numeric_field() {
    let ctx = test_context!();
    seed_products(&ctx).await;

    let sum = body_json(ctx.get("/products:sum?field=price").await).await;
    assert_eq!(sum["value"], 60.0);

    let avg = body_json(ctx.get("/products:avg?field=price").await).await;
    assert_eq!(avg["value"], 20.0);
}

#[tokio::test]
async fn min_and_max_aggregate_a_numeric_field() {
    let ctx = test_context!();
    seed_products(&ctx).await;

    let min = body_json(ctx.get("/products:min?field=price").await).await;
    assert_eq!(min["value"], 10.0);

    let max = body_json(ctx.get("/products:max?field=price").await).await;
    assert_eq!(max["value"], 30.0);
}

#[tokio::test]
async fn sum_without_a_field_is_rejected() {
    let ctx = test_context!();
    seed_products(&ctx).await;

    let response = ctx.get("/products:sum").await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn aggregating_a_non_numeric_field_is_rejected() {
    let ctx = test_context!();
    seed_products(&ctx).await;

    let response = ctx.get("/products:sum?field=title").await;
    assert_eq!(response.status(), 400);
}
