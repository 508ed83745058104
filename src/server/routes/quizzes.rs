use anyhow::{anyhow, Context};
use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize, Serializer};
use serde_aux::field_attributes::deserialize_number_from_string;
use sqlx::SqlitePool;

use crate::{
    db::{queries::questions::get_quiz_candidates, Question},
    server::{
        app::AppState,
        deserializers::LenientId,
        error::{ApiError, ApiJson},
    },
    telemetry::QUIZ_QUESTIONS_SERVED,
};

use super::ApiResponse;

/// Quiz category id meaning "any category"
pub const ALL_CATEGORIES: i64 = 0;

#[derive(Deserialize)]
struct QuizRequest {
    #[serde(default)]
    previous_questions: Option<Vec<LenientId>>,
    // validated by hand, a broken category is a server error rather than a bad body
    #[serde(default)]
    quiz_category: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct QuizCategory {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    id: i64,
}

#[derive(Serialize)]
struct NextQuestion {
    success: bool,
    #[serde(serialize_with = "question_or_false")]
    question: Option<Question>,
}

fn question_or_false<S>(question: &Option<Question>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match question {
        Some(question) => question.serialize(serializer),
        None => serializer.serialize_bool(false),
    }
}

/// Uniformly random pick, `None` once the pool is exhausted.
fn pick_question(mut candidates: Vec<Question>) -> Option<Question> {
    if candidates.is_empty() {
        return None;
    }
    let index = fastrand::usize(..candidates.len());
    Some(candidates.swap_remove(index))
}

async fn next_question(
    State(pool): State<SqlitePool>,
    ApiJson(body): ApiJson<QuizRequest>,
) -> ApiResponse<NextQuestion> {
    let category: QuizCategory = body
        .quiz_category
        .ok_or_else(|| anyhow!("quiz_category is missing"))
        .and_then(|value| serde_json::from_value(value).context("Malformed quiz_category"))?;
    let previous: Vec<i64> = body
        .previous_questions
        .ok_or(ApiError::Unprocessable)?
        .into_iter()
        .map(|id| id.0)
        .collect();

    let filter = (category.id != ALL_CATEGORIES).then_some(category.id);
    let candidates = get_quiz_candidates(&pool, &previous, filter).await?;
    let question = pick_question(candidates);

    match &question {
        Some(q) => {
            QUIZ_QUESTIONS_SERVED
                .with_label_values(&[category.id.to_string().as_str()])
                .inc();
            tracing::debug!(id = q.id, category = category.id, "Serving quiz question");
        }
        None => tracing::debug!(category = category.id, "Quiz ran out of questions"),
    }

    Ok(Json(NextQuestion {
        success: true,
        question,
    }))
}

pub fn quizzes_router(state: AppState) -> Router {
    Router::new()
        .route("/quizzes", post(next_question))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn question(id: i64) -> Question {
        Question {
            id,
            question: format!("question {id}"),
            answer: "answer".to_owned(),
            category: 1,
            difficulty: 1,
        }
    }

    #[test]
    fn pick_from_empty_pool() {
        assert_eq!(pick_question(vec![]), None);
    }

    #[test]
    fn pick_stays_within_candidates() {
        let candidates: Vec<Question> = (1..=5).map(question).collect();
        for _ in 0..50 {
            let picked = pick_question(candidates.clone()).unwrap();
            assert!((1..=5).contains(&picked.id));
        }
    }

    #[test]
    fn exhausted_quiz_serializes_false() {
        let body = serde_json::to_value(NextQuestion {
            success: true,
            question: None,
        })
        .unwrap();
        assert_eq!(body, json!({"success": true, "question": false}));
    }

    #[test]
    fn category_id_may_be_a_string() {
        let category: QuizCategory =
            serde_json::from_value(json!({"type": "Science", "id": "1"})).unwrap();
        assert_eq!(category.id, 1);
        assert!(serde_json::from_value::<QuizCategory>(json!({"type": "Science"})).is_err());
    }
}
