//! Response-envelope helpers shared by every controller: every success path
//! answers with a JSON body and the right status code, matching the shape
//! the rest of this API promises. Errors are handled uniformly by `AppError`'s own
//! `IntoResponse` impl and never pass through here.

use axum::response::IntoResponse;
use axum::Json;
use hyper::StatusCode;
use serde::Serialize;

pub fn json_response<T: Serialize>(status: StatusCode, body: T) -> axum::response::Response {
    (status, Json(body)).into_response()
}

pub fn ok<T: Serialize>(body: T) -> axum::response::Response {
    json_response(StatusCode::OK, body)
}

pub fn created<T: Serialize>(body: T) -> axum::response::Response {
    json_response(StatusCode::CREATED, body)
}

pub fn multi_status<T: Serialize>(body: T) -> axum::response::Response {
    json_response(StatusCode::MULTI_STATUS, body)
}
