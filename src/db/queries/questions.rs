use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};

pub const QUESTIONS_PER_PAGE: i64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Question {
    pub id: i64,
    pub question: String,
    pub answer: String,
    pub category: i64,
    pub difficulty: i64,
}

/// A question that passed validation and has not been stored yet.
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub question: String,
    pub answer: String,
    pub category: i64,
    pub difficulty: i64,
}

/// 1-based page number over a question listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page(i64);

impl Page {
    pub fn new(number: i64) -> Self {
        Page(number)
    }

    /// Absent or non-numeric input falls back to the first page.
    pub fn parse(raw: Option<&str>) -> Self {
        Page(raw.and_then(|v| v.trim().parse().ok()).unwrap_or(1))
    }

    pub fn number(self) -> i64 {
        self.0
    }

    /// Row offset of the page, `None` when the page can not hold any row.
    pub fn offset(self) -> Option<i64> {
        if self.0 < 1 {
            return None;
        }
        (self.0 - 1).checked_mul(QUESTIONS_PER_PAGE)
    }
}

impl Default for Page {
    fn default() -> Self {
        Page(1)
    }
}

pub async fn get_all_questions(pool: &SqlitePool) -> sqlx::Result<Vec<Question>> {
    sqlx::query_as::<_, Question>(
        r#"
        SELECT id, question, answer, category, difficulty FROM questions ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn count_questions(pool: &SqlitePool) -> sqlx::Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM questions")
        .fetch_one(pool)
        .await
}

/// One page of all questions, grouped by category.
pub async fn get_questions_page(pool: &SqlitePool, page: Page) -> sqlx::Result<Vec<Question>> {
    let Some(offset) = page.offset() else {
        return Ok(vec![]);
    };
    sqlx::query_as::<_, Question>(
        r#"
        SELECT id, question, answer, category, difficulty FROM questions
        ORDER BY category, id
        LIMIT ?1 OFFSET ?2
        "#,
    )
    .bind(QUESTIONS_PER_PAGE)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn get_questions_for_category(
    pool: &SqlitePool,
    category: i64,
    page: Page,
) -> sqlx::Result<Vec<Question>> {
    let Some(offset) = page.offset() else {
        return Ok(vec![]);
    };
    sqlx::query_as::<_, Question>(
        r#"
        SELECT id, question, answer, category, difficulty FROM questions
        WHERE questions.category = ?1
        ORDER BY id
        LIMIT ?2 OFFSET ?3
        "#,
    )
    .bind(category)
    .bind(QUESTIONS_PER_PAGE)
    .bind(offset)
    .fetch_all(pool)
    .await
}

/// Case-insensitive substring match on the question text. The term is matched
/// literally, `%` and `_` carry no special meaning.
pub async fn search_questions(pool: &SqlitePool, term: &str) -> sqlx::Result<Vec<Question>> {
    sqlx::query_as::<_, Question>(
        r#"
        SELECT id, question, answer, category, difficulty FROM questions
        WHERE instr(lower(question), lower(?1)) > 0
        ORDER BY id
        "#,
    )
    .bind(term)
    .fetch_all(pool)
    .await
}

pub async fn get_question(pool: &SqlitePool, id: i64) -> sqlx::Result<Option<Question>> {
    sqlx::query_as::<_, Question>(
        r#"
        SELECT id, question, answer, category, difficulty FROM questions WHERE questions.id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn create_question(pool: &SqlitePool, new: &NewQuestion) -> sqlx::Result<Question> {
    let mut tx = pool.begin().await?;

    let id = sqlx::query(
        r#"
        INSERT INTO questions (question, answer, category, difficulty) VALUES (?1, ?2, ?3, ?4)
        "#,
    )
    .bind(&new.question)
    .bind(&new.answer)
    .bind(new.category)
    .bind(new.difficulty)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    let question = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, question, answer, category, difficulty FROM questions WHERE questions.id = ?1
        "#,
    )
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(question)
}

/// Deletes a question and returns how many questions are left, or `None` when there
/// was nothing to delete.
pub async fn delete_question(pool: &SqlitePool, id: i64) -> sqlx::Result<Option<i64>> {
    let mut tx = pool.begin().await?;

    let deleted = sqlx::query(
        r#"
        DELETE FROM questions WHERE questions.id = ?1
        "#,
    )
    .bind(id)
    .execute(&mut *tx)
    .await?
    .rows_affected();
    if deleted == 0 {
        return Ok(None);
    }

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions")
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(Some(remaining))
}

/// Questions a quiz may still ask: everything outside `previous`, restricted to
/// `category` when one is given.
pub async fn get_quiz_candidates(
    pool: &SqlitePool,
    previous: &[i64],
    category: Option<i64>,
) -> sqlx::Result<Vec<Question>> {
    let mut query = QueryBuilder::<Sqlite>::new(
        "SELECT id, question, answer, category, difficulty FROM questions WHERE 1 = 1",
    );
    if let Some(category) = category {
        query.push(" AND category = ").push_bind(category);
    }
    if !previous.is_empty() {
        query.push(" AND id NOT IN (");
        let mut ids = query.separated(", ");
        for id in previous {
            ids.push_bind(*id);
        }
        ids.push_unseparated(")");
    }
    query.push(" ORDER BY id");

    query.build_query_as::<Question>().fetch_all(pool).await
}

/// Inserts or overwrites questions by id, all or nothing.
pub async fn import_questions(pool: &SqlitePool, questions: Vec<Question>) -> sqlx::Result<()> {
    let mut tx = pool.begin().await?;
    for question in questions {
        sqlx::query(
            r#"
            INSERT INTO questions (id, question, answer, category, difficulty)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (id) DO UPDATE SET
                question = excluded.question,
                answer = excluded.answer,
                category = excluded.category,
                difficulty = excluded.difficulty
            "#,
        )
        .bind(question.id)
        .bind(&question.question)
        .bind(&question.answer)
        .bind(question.category)
        .bind(question.difficulty)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await
}
