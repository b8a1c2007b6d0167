use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use axum::Router;
use serde::Serialize;
use tower::util::ServiceExt;

use moonbase_core::context::AppContext;
use moonbase_core::driver::DbPool;
use moonbase_core::registry::SchemaRegistry;
use moonbase_core::startup;

/// Creates a `TestContext` backed by a fresh in-memory SQLite pool, isolated
/// to this one test — the cheapest of the three dialects to stand up without
/// an external service.
macro_rules! test_context {
    () => {
        crate::support::context::TestContext::new().await
    };
}

pub(crate) use test_context;

pub struct TestContext {
    pub ctx: AppContext,
    app: Router,
}

impl TestContext {
    pub async fn new() -> Self {
        let db = DbPool::connect("sqlite::memory:", 5)
            .await
            .expect("to open an in-memory sqlite pool");
        let registry = SchemaRegistry::new();
        let ctx = AppContext::new(db, registry);
        let app = startup::build_app(ctx.clone());

        Self { ctx, app }
    }

    pub async fn get(&self, path: &str) -> Response {
        let req = Request::builder()
            .method(axum::http::Method::GET)
            .uri(path)
            .body(Body::empty())
            .expect("to build GET request");

        self.app
            .clone()
            .oneshot(req)
            .await
            .expect("axum to always respond")
    }

    pub async fn post<P>(&self, path: &str, payload: &P) -> Response
    where
        P: Serialize + ?Sized,
    {
        let req = Request::builder()
            .method(axum::http::Method::POST)
            .uri(path)
            .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
            .body(Body::from(
                serde_json::to_vec(payload).expect("to serialize request body"),
            ))
            .expect("to build POST request");

        self.app
            .clone()
            .oneshot(req)
            .await
            .expect("axum to always respond")
    }
}
