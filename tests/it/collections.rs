use crate::support::context::test_context;
use crate::support::redactor::body_json;

fn create_products_payload() -> serde_json::Value {
    serde_json::json!({
        "name": "products",
        "columns": [
            { "name": "title", "type": "string", "nullable": false },
            { "name": "price", "type": "decimal", "nullable": false },
            { "name": "in_stock", "type": "boolean", "nullable": true },
        ],
    })
}

#[tokio::test]
async fn create_registers_a_collection_and_its_table() {
    let ctx = test_context!();

    let response = ctx.post("/collections:create", &create_products_payload()).await;
    assert_eq!(response.status(), 201);

    let body = body_json(response).await;
    assert_eq!(body["name"], "products");
    assert_eq!(body["columns"].as_array().unwrap().len(), 3);

    let schema = ctx.get("/products:schema").await;
    assert_eq!(schema.status(), 200);
    let schema_body = body_json(schema).await;
    assert_eq!(schema_body["total"], 0);
}

#[tokio::test]
async fn create_response_matches_the_declared_schema() {
    let ctx = test_context!();
    let response = ctx.post("/collections:create", &create_products_payload()).await;
    let body = body_json(response).await;

    assert_json_snapshot!(body);
}

#[tokio::test]
async fn create_rejects_a_duplicate_name() {
    let ctx = test_context!();
    ctx.post("/collections:create", &create_products_payload()).await;

    let response = ctx.post("/collections:create", &create_products_payload()).await;
    assert_eq!(response.status(), 409);
    let body = body_json(response).await;
    assert_eq!(body["code"], "DUPLICATE_COLLECTION");
}

#[tokio::test]
async fn create_rejects_a_reserved_endpoint_name() {
    let ctx = test_context!();
    let payload = serde_json::json!({ "name": "collections", "columns": [] });

    let response = ctx.post("/collections:create", &payload).await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn update_adds_renames_and_removes_columns() {
    let ctx = test_context!();
    ctx.post("/collections:create", &create_products_payload()).await;

    let update = serde_json::json!({
        "name": "products",
        "add_columns": [{ "name": "sku", "type": "string", "nullable": true }],
        "rename_columns": [{ "old_name": "in_stock", "new_name": "available" }],
        "remove_columns": ["price"],
    });
    let response = ctx.post("/collections:update", &update).await;
    assert_eq!(response.status(), 200);

    let body = body_json(response).await;
    let names: Vec<&str> = body["columns"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"sku"));
    assert!(names.contains(&"available"));
    assert!(!names.contains(&"price"));
    assert!(!names.contains(&"in_stock"));
}

#[tokio::test]
async fn destroy_drops_the_table_and_unregisters_it() {
    let ctx = test_context!();
    ctx.post("/collections:create", &create_products_payload()).await;

    let response = ctx
        .post("/collections:destroy", &serde_json::json!({ "name": "products" }))
        .await;
    assert_eq!(response.status(), 200);

    let schema = ctx.get("/products:schema").await;
    assert_eq!(schema.status(), 404);
}

#[tokio::test]
async fn list_reports_row_counts_per_collection() {
    let ctx = test_context!();
    ctx.post("/collections:create", &create_products_payload()).await;
    ctx.post(
        "/products:create",
        &serde_json::json!({ "title": "Widget", "price": "9.99" }),
    )
    .await;

    let response = ctx.get("/collections:list").await;
    assert_eq!(response.status(), 200);
    let body = body_json(response).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["collections"][0]["name"], "products");
    assert_eq!(body["collections"][0]["records"], 1);
}
