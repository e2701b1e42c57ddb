//! Response envelope.
//!
//! # Responsibilities
//! - Wrap handler results in `{code, msg, data}`
//! - Map handler errors to the envelope with a matching status
//!
//! # Design Decisions
//! - Errors carry their message in response extensions so the access log
//!   middleware can record them without handlers touching the logger

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

/// Body of every JSON response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseInfo<T> {
    pub code: i32,
    pub msg: String,
    pub data: T,
}

/// JSON envelope response with an explicit HTTP status.
#[derive(Debug, Clone)]
pub struct JsonResp<T = Value> {
    pub status: StatusCode,
    pub body: ResponseInfo<T>,
}

impl<T: Serialize> JsonResp<T> {
    /// `200 OK` with code 0.
    pub fn ok(data: T) -> Self {
        Self::new(0, "", data)
    }

    /// `200 OK` with an application-level code and message.
    pub fn new(code: i32, msg: impl Into<String>, data: T) -> Self {
        Self {
            status: StatusCode::OK,
            body: ResponseInfo {
                code,
                msg: msg.into(),
                data,
            },
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

impl JsonResp<Value> {
    /// Error envelope: code mirrors the HTTP status, data is null.
    pub fn error(status: StatusCode, msg: impl Into<String>) -> Self {
        Self::new(i32::from(status.as_u16()), msg, Value::Null).with_status(status)
    }
}

impl<T: Serialize> IntoResponse for JsonResp<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Message of a failed handler, attached to the response for logging.
#[derive(Debug, Clone)]
pub struct ErrorMessage(pub String);

/// Handler error rendered as an error envelope.
#[derive(Debug, Clone)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut response = JsonResp::error(self.status, self.message.clone()).into_response();
        response.extensions_mut().insert(ErrorMessage(self.message));
        response
    }
}
