//! Envelope response format for REST responses.
//!
//! ```json
//! {
//!   "data": { ... },
//!   "meta": { "request_id": "...", "timestamp": "...", "response_time_ms": 5 },
//!   "errors": []
//! }
//! ```

use std::time::Instant;

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: Option<T>,
    pub meta: ApiMeta,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Serialize)]
pub struct ApiMeta {
    pub request_id: String,
    /// RFC 3339 timestamp of the response.
    pub timestamp: String,
    pub response_time_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorDetail {
    /// Machine-readable error code, e.g. `UNKNOWN_RECIPIENT`.
    pub code: String,
    pub message: String,
}

impl ApiMeta {
    fn new(request_id: String, response_time_ms: u64) -> Self {
        Self {
            request_id,
            timestamp: chrono::Utc::now().to_rfc3339(),
            response_time_ms,
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T, request_id: String, response_time_ms: u64) -> Self {
        Self {
            data: Some(data),
            meta: ApiMeta::new(request_id, response_time_ms),
            errors: Vec::new(),
        }
    }

    /// Wrap `data`, stamping a fresh request id and the time since `started`.
    pub fn timed(data: T, started: Instant) -> Self {
        Self::success(
            data,
            uuid::Uuid::now_v7().to_string(),
            started.elapsed().as_millis() as u64,
        )
    }
}

impl ApiResponse<()> {
    pub fn error(code: &str, message: &str, request_id: String, response_time_ms: u64) -> Self {
        Self {
            data: None,
            meta: ApiMeta::new(request_id, response_time_ms),
            errors: vec![ApiErrorDetail {
                code: code.to_string(),
                message: message.to_string(),
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_has_data_and_no_errors() {
        let body = serde_json::to_value(ApiResponse::success(
            serde_json::json!({"unread_count": 3}),
            "req-1".to_string(),
            4,
        ))
        .unwrap();
        assert_eq!(body["data"]["unread_count"], 3);
        assert_eq!(body["meta"]["request_id"], "req-1");
        assert!(body.get("errors").is_none());
    }

    #[test]
    fn error_envelope_has_null_data() {
        let body = serde_json::to_value(ApiResponse::error(
            "FORBIDDEN",
            "account is pending, awaiting admin approval",
            "req-2".to_string(),
            0,
        ))
        .unwrap();
        assert!(body["data"].is_null());
        assert_eq!(body["errors"][0]["code"], "FORBIDDEN");
    }
}
