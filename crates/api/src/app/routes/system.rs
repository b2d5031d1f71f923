use axum::{http::StatusCode, response::Response};
use serde_json::json;

use crate::app::dto;

pub async fn health() -> Response {
    dto::success(
        StatusCode::OK,
        "OK",
        json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }),
    )
}
