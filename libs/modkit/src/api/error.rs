use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::api::problem::{Problem, ProblemResponse};

/// `type` member of the catch-all problem.
pub const SERVER_ERROR_TYPE: &str = "Server error";
/// `title` member of the catch-all problem.
pub const SERVER_ERROR_TITLE: &str = "Server Error";

/// Catch-all error boundary for REST handlers.
///
/// Handlers return `Result<_, ApiError>` and use `?` on any error type. The
/// boundary does not look at what went wrong: every error becomes a 500
/// `application/problem+json` body whose `detail` is the error text.
#[derive(Debug)]
pub struct ApiError(anyhow::Error);

impl ApiError {
    pub fn to_problem(&self) -> Problem {
        server_error_problem(format!("{:#}", self.0))
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(error = %format!("{:#}", self.0), "request failed");
        ProblemResponse(self.to_problem()).into_response()
    }
}

/// The fixed 500 problem with a caller-provided `detail`.
pub fn server_error_problem(detail: impl Into<String>) -> Problem {
    Problem::new(StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR_TITLE, detail)
        .with_type(SERVER_ERROR_TYPE)
}

/// Result type for REST handlers.
pub type ApiResult<T> = Result<T, ApiError>;
