//! Access log middleware.
//!
//! Records every request and its outcome through `Logger`:
//! ```text
//! before: {"method", "url", "request_id"}
//! after:  {"method", "url", "request_id", "status", "dura"}   (dura in ms)
//! ```
//! Handler errors are logged at error level, and 404 responses are replaced
//! with the JSON error envelope.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::Instant;

use crate::fields;
use crate::http::request::request_id;
use crate::http::response::{ErrorMessage, JsonResp};
use crate::observability::Logger;

pub async fn access_log(State(logger): State<Logger>, request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let url = request.uri().path().to_string();
    let request_id = request_id(&request).unwrap_or_default();

    logger.info(fields! {
        "method" => method,
        "url" => url,
        "request_id" => request_id,
    });

    let response = next.run(request).await;
    let status = response.status();
    let dura = start.elapsed().as_secs_f64() * 1000.0;

    logger.info(fields! {
        "method" => method,
        "url" => url,
        "request_id" => request_id,
        "status" => status.as_u16(),
        "dura" => dura,
    });

    if let Some(ErrorMessage(message)) = response.extensions().get::<ErrorMessage>() {
        logger.error(message.clone());
    }

    if status == StatusCode::NOT_FOUND {
        logger.error(format!("404 Not Found: {method} {url}"));
        return JsonResp::error(StatusCode::NOT_FOUND, "Not Found").into_response();
    }

    response
}
