use crate::support::context::test_context;
use crate::support::redactor::body_json;

async fn seed_products(ctx: &crate::support::context::TestContext) {
    let payload = serde_json::json!({
        "name": "products",
        "columns": [
            { "name": "title", "type": "string", "nullable": false },
            { "name": "price", "type": "decimal", "nullable": false },
            { "name": "in_stock", "type": "boolean", "nullable": true },
        ],
    });
    let response = ctx.post("/collections:create", &payload).await;
    assert_eq!(response.status(), 201);
}

#[tokio::test]
async fn create_returns_a_ulid_and_the_stored_fields() {
    let ctx = test_context!();
    seed_products(&ctx).await;

    let response = ctx
        .post(
            "/products:create",
            &serde_json::json!({ "title": "Widget", "price": "9.99", "in_stock": true }),
        )
        .await;
    assert_eq!(response.status(), 201);

    let body = body_json(response).await;
    let id = body["data"]["id"].as_str().expect("id to be a string");
    assert_eq!(id.len(), 26);
    assert_eq!(body["data"]["title"], "Widget");
    assert_eq!(body["data"]["price"], "9.99");
    assert_eq!(body["data"]["in_stock"], true);
}

#[tokio::test]
async fn create_rejects_a_payload_missing_a_required_field() {
    let ctx = test_context!();
    seed_products(&ctx).await;

    let response = ctx
        .post("/products:create", &serde_json::json!({ "title": "Widget" }))
        .await;
    assert_eq!(response.status(), 400);
    let body = body_json(response).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn create_batch_is_atomic_by_default() {
    let ctx = test_context!();
    seed_products(&ctx).await;

    let items = serde_json::json!([
        { "title": "Good", "price": "1.00" },
        { "title": "Bad" },
    ]);
    let response = ctx.post("/products:create", &items).await;
    assert_eq!(response.status(), 400);

    let list = ctx.get("/products:list").await;
    let body = body_json(list).await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn create_batch_with_atomic_false_reports_partial_success() {
    let ctx = test_context!();
    seed_products(&ctx).await;

    let items = serde_json::json!([
        { "title": "Good", "price": "1.00" },
        { "title": "Bad" },
    ]);
    let response = ctx.post("/products:create?atomic=false", &items).await;
    assert_eq!(response.status(), 207);

    let body = body_json(response).await;
    let results = body["data"].as_array().unwrap();
    assert!(results[0]["data"].is_object());
    assert!(results[1]["error"].is_string());
}

#[tokio::test]
async fn get_and_list_round_trip_a_created_record() {
    let ctx = test_context!();
    seed_products(&ctx).await;

    let created = ctx
        .post(
            "/products:create",
            &serde_json::json!({ "title": "Widget", "price": "9.99" }),
        )
        .await;
    let created_body = body_json(created).await;
    let id = created_body["data"]["id"].as_str().unwrap().to_string();

    let get_response = ctx.get(&format!("/products:get?id={id}")).await;
    assert_eq!(get_response.status(), 200);
    let get_body = body_json(get_response).await;
    assert_eq!(get_body["data"]["id"], id);

    let list_response = ctx.get("/products:list").await;
    let list_body = body_json(list_response).await;
    assert_eq!(list_body["total"], 1);
    assert_eq!(list_body["data"][0]["id"], id);
}

#[tokio::test]
async fn get_returns_not_found_for_an_unknown_id() {
    let ctx = test_context!();
    seed_products(&ctx).await;

    let response = ctx
        .get("/products:get?id=01ARZ3NDEKTSV4RRFFQ69G5FAV")
        .await;
    assert_eq!(response.status(), 404);
    let body = body_json(response).await;
    assert_eq!(body["code"], "RECORD_NOT_FOUND");
}

#[tokio::test]
async fn list_filters_by_a_comparison_operator() {
    let ctx = test_context!();
    seed_products(&ctx).await;

    ctx.post("/products:create", &serde_json::json!({ "title": "Cheap", "price": "1.00" })).await;
    ctx.post("/products:create", &serde_json::json!({ "title": "Pricey", "price": "500.00" })).await;

    let response = ctx.get("/products:list?price[gt]=100").await;
    assert_eq!(response.status(), 200);
    let body = body_json(response).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["title"], "Pricey");
}

#[tokio::test]
async fn update_changes_only_the_given_fields() {
    let ctx = test_context!();
    seed_products(&ctx).await;

    let created = ctx
        .post("/products:create", &serde_json::json!({ "title": "Widget", "price": "9.99" }))
        .await;
    let id = body_json(created).await["data"]["id"].as_str().unwrap().to_string();

    let response = ctx
        .post(
            "/products:update",
            &serde_json::json!({ "id": id, "data": { "price": "19.99" } }),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = body_json(response).await;
    assert_eq!(body["data"]["title"], "Widget");
    assert_eq!(body["data"]["price"], "19.99");
}

#[tokio::test]
async fn destroy_removes_the_record() {
    let ctx = test_context!();
    seed_products(&ctx).await;

    let created = ctx
        .post("/products:create", &serde_json::json!({ "title": "Widget", "price": "9.99" }))
        .await;
    let id = body_json(created).await["data"]["id"].as_str().unwrap().to_string();

    let response = ctx
        .post("/products:destroy", &serde_json::json!({ "id": id }))
        .await;
    assert_eq!(response.status(), 200);

    let get_response = ctx.get(&format!("/products:get?id={id}")).await;
    assert_eq!(get_response.status(), 404);
}
