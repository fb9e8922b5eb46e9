use serde::Serialize;

pub const STATUS_OK: u16 = 200;
pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_INTERNAL_ERROR: u16 = 500;

/// Uniform outcome of every public connector operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response<T> {
    pub status_code: u16,
    pub result: Option<T>,
    pub message: String,
}

pub fn create_response<T>(
    status_code: u16,
    result: Option<T>,
    message: impl Into<String>,
) -> Response<T> {
    Response {
        status_code,
        result,
        message: message.into(),
    }
}

impl<T> Response<T> {
    pub fn ok(result: T, message: impl Into<String>) -> Self {
        create_response(STATUS_OK, Some(result), message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        create_response(STATUS_BAD_REQUEST, None, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        create_response(STATUS_INTERNAL_ERROR, None, message)
    }

    pub fn is_success(&self) -> bool {
        self.status_code == STATUS_OK
    }
}
