use crate::support::context::test_context;

#[tokio::test]
async fn health_check_reports_ok_with_a_live_db() {
    let ctx = test_context!();

    let response = ctx.get("/health").await;
    assert_eq!(response.status(), 200);

    let body = crate::support::redactor::body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert!(body["current_time"].is_string());
    assert!(body["db_ping_seconds"].is_number());
}
