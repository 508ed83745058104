use std::collections::BTreeMap;

use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::{
    db::{
        queries::{
            categories::{find_category, get_all_categories},
            questions::{get_questions_for_category, Page},
        },
        Category, Question,
    },
    server::{
        app::AppState,
        error::{ApiPath, ApiQuery},
    },
};

use super::{ApiResponse, PageQuery};

/// Categories keyed by their string-encoded id, the shape the frontend indexes by.
pub(super) fn category_names(
    categories: impl IntoIterator<Item = Category>,
) -> BTreeMap<String, String> {
    categories
        .into_iter()
        .map(|c| (c.id.to_string(), c.kind))
        .collect()
}

#[derive(Serialize)]
struct CategoriesResponse {
    success: bool,
    categories: BTreeMap<String, String>,
}

#[derive(Serialize)]
struct CategoryQuestionsResponse {
    success: bool,
    questions: Vec<Question>,
    total_questions: usize,
    current_category: BTreeMap<String, String>,
}

async fn get_categories(State(pool): State<SqlitePool>) -> ApiResponse<CategoriesResponse> {
    let categories = get_all_categories(&pool).await?;
    Ok(Json(CategoriesResponse {
        success: true,
        categories: category_names(categories),
    }))
}

async fn category_questions(
    State(pool): State<SqlitePool>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResponse<CategoryQuestionsResponse> {
    let page = Page::parse(query.page.as_deref());
    let questions = get_questions_for_category(&pool, id, page).await?;
    let current = find_category(&pool, id).await?;

    Ok(Json(CategoryQuestionsResponse {
        success: true,
        total_questions: questions.len(),
        questions,
        current_category: category_names(current),
    }))
}

pub fn category_router(state: AppState) -> Router {
    Router::new()
        .route("/categories", get(get_categories))
        .route("/categories/{id}/questions", get(category_questions))
        .with_state(state)
}
