use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Every failure the API reports. The body shape is fixed:
/// `{"success": false, "error": <status>, "message": <text>}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest,
    NotFound,
    MethodNotAllowed,
    Unprocessable,
    Internal(anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: u16,
    message: &'static str,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Unprocessable => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            ApiError::BadRequest => "Bad Request",
            ApiError::NotFound => "Page not found",
            ApiError::MethodNotAllowed => "method_not_allowed",
            // existing clients compare against this exact spelling
            ApiError::Unprocessable => "unproccessable",
            ApiError::Internal(_) => "Internal Server Error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(error) = &self {
            tracing::error!("Request failed: {error:#}");
        }
        let status = self.status();
        let body = ErrorBody {
            success: false,
            error: status.as_u16(),
            message: self.message(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(error: sqlx::Error) -> ApiError {
        ApiError::Internal(error.into())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> ApiError {
        ApiError::Internal(error)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> ApiError {
        tracing::debug!("Rejected request body: {rejection}");
        match rejection {
            JsonRejection::JsonDataError(_) => ApiError::Unprocessable,
            _ => ApiError::BadRequest,
        }
    }
}

// typed path segments that fail to parse mean there is no such resource
impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> ApiError {
        tracing::debug!("Rejected path: {rejection}");
        ApiError::NotFound
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> ApiError {
        tracing::debug!("Rejected query string: {rejection}");
        ApiError::BadRequest
    }
}

/// `axum::Json` with rejections reported in the API error format.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `axum::extract::Path` with rejections reported in the API error format.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// `axum::extract::Query` with rejections reported in the API error format.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);
