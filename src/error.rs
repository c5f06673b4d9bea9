//! Structured error codes shared by services and routes.

/// Grepable error code and retryable flag for structured error responses.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

/// JSON body for an error response: `{code, message, retryable}`.
#[must_use]
pub fn error_body(err: &(impl ErrorCode + ?Sized)) -> serde_json::Value {
    serde_json::json!({
        "code": err.error_code(),
        "message": err.to_string(),
        "retryable": err.retryable(),
    })
}
