use std::collections::BTreeMap;

use anyhow::bail;
use axum::{
    extract::State,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;

use crate::{
    db::{
        queries::{
            categories::get_all_categories,
            questions::{self, count_questions, get_questions_page, search_questions, Page},
        },
        NewQuestion, Question,
    },
    server::{
        app::AppState,
        deserializers::deserialize_optional_lenient_i64,
        error::{ApiError, ApiJson, ApiPath, ApiQuery},
    },
    telemetry::{QUESTIONS_CREATED, QUESTIONS_DELETED},
};

use super::{categories::category_names, ApiResponse, PageQuery};

#[derive(Deserialize)]
struct QuestionForm {
    #[serde(default)]
    question: Option<String>,
    #[serde(default)]
    answer: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_lenient_i64")]
    category: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_optional_lenient_i64")]
    difficulty: Option<i64>,
}

impl QuestionForm {
    /// All four fields must be present and non-empty; a zero number counts as empty.
    fn validate(self) -> Option<NewQuestion> {
        let question = self.question.filter(|v| !v.is_empty())?;
        let answer = self.answer.filter(|v| !v.is_empty())?;
        let category = self.category.filter(|v| *v != 0)?;
        let difficulty = self.difficulty.filter(|v| *v != 0)?;
        Some(NewQuestion {
            question,
            answer,
            category,
            difficulty,
        })
    }
}

#[derive(Deserialize)]
struct SearchBody {
    #[serde(rename = "searchTerm", default)]
    search_term: Option<Value>,
}

impl SearchBody {
    /// Scalars are searched for by their text. Anything else, absence included, is a
    /// server error rather than a rejected body.
    fn term(self) -> anyhow::Result<String> {
        match self.search_term {
            Some(Value::String(term)) => Ok(term),
            Some(value @ (Value::Number(_) | Value::Bool(_))) => Ok(value.to_string()),
            Some(other) => bail!("searchTerm {other} is not searchable text"),
            None => bail!("searchTerm is missing"),
        }
    }
}

#[derive(Serialize)]
struct QuestionsPage {
    success: bool,
    questions: Vec<Question>,
    total_questions: i64,
    categories: BTreeMap<String, String>,
}

#[derive(Serialize)]
struct DeletedQuestion {
    success: bool,
    deleted_question_id: i64,
    total_questions: i64,
}

#[derive(Serialize)]
struct CreatedQuestion {
    success: bool,
    question: Question,
}

#[derive(Serialize)]
struct SearchResults {
    success: bool,
    total_questions: usize,
    questions: Vec<Question>,
}

async fn list_questions(
    State(pool): State<SqlitePool>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResponse<QuestionsPage> {
    let page = Page::parse(query.page.as_deref());
    let questions = get_questions_page(&pool, page).await?;
    if questions.is_empty() {
        tracing::debug!(page = page.number(), "Requested page holds no questions");
        return Err(ApiError::NotFound);
    }

    Ok(Json(QuestionsPage {
        success: true,
        questions,
        total_questions: count_questions(&pool).await?,
        categories: category_names(get_all_categories(&pool).await?),
    }))
}

// Missing questions and store failures both answer 422, clients rely on it.
async fn delete_question(
    State(pool): State<SqlitePool>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResponse<DeletedQuestion> {
    match questions::delete_question(&pool, id).await {
        Ok(Some(total_questions)) => {
            QUESTIONS_DELETED.inc();
            tracing::info!(id, "Deleted question");
            Ok(Json(DeletedQuestion {
                success: true,
                deleted_question_id: id,
                total_questions,
            }))
        }
        Ok(None) => {
            tracing::debug!(id, "No question to delete");
            Err(ApiError::Unprocessable)
        }
        Err(error) => {
            tracing::warn!(id, "Failed to delete question: {error}");
            Err(ApiError::Unprocessable)
        }
    }
}

async fn create_question(
    State(pool): State<SqlitePool>,
    ApiJson(form): ApiJson<QuestionForm>,
) -> ApiResponse<CreatedQuestion> {
    let new_question = form.validate().ok_or(ApiError::Unprocessable)?;
    let question = questions::create_question(&pool, &new_question)
        .await
        .map_err(|error| {
            tracing::warn!("Failed to store question: {error}");
            ApiError::Unprocessable
        })?;

    QUESTIONS_CREATED.inc();
    tracing::info!(id = question.id, "Created question");
    Ok(Json(CreatedQuestion {
        success: true,
        question,
    }))
}

async fn search(
    State(pool): State<SqlitePool>,
    ApiJson(body): ApiJson<SearchBody>,
) -> ApiResponse<SearchResults> {
    let term = body.term()?;
    let questions = search_questions(&pool, &term).await?;
    tracing::debug!(
        term = %term,
        matches = questions.len(),
        "Searched questions"
    );
    Ok(Json(SearchResults {
        success: true,
        total_questions: questions.len(),
        questions,
    }))
}

pub fn questions_router(state: AppState) -> Router {
    Router::new()
        .route("/questions", get(list_questions).post(create_question))
        .route("/questions/{id}", delete(delete_question))
        .route("/questions/search", post(search))
        .with_state(state)
}
