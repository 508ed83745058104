mod categories;
mod questions;
mod quizzes;

use axum::Json;
use serde::Deserialize;

pub use categories::category_router;
pub use questions::questions_router;
pub use quizzes::quizzes_router;

use super::error::ApiError;

pub type ApiResponse<T> = Result<Json<T>, ApiError>;

/// `?page=N`, kept as text so garbage falls back to the first page instead of a 400
#[derive(Deserialize)]
struct PageQuery {
    page: Option<String>,
}
