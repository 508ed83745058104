use prometheus::{register_int_counter, register_int_counter_vec};
use prometheus::{IntCounter, IntCounterVec};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use lazy_static::lazy_static;

lazy_static! {
    pub static ref QUESTIONS_CREATED: IntCounter = register_int_counter!(
        "trivia_questions_created_total",
        "Number of questions added through the API"
    )
    .unwrap();
    pub static ref QUESTIONS_DELETED: IntCounter = register_int_counter!(
        "trivia_questions_deleted_total",
        "Number of questions removed through the API"
    )
    .unwrap();
    pub static ref QUIZ_QUESTIONS_SERVED: IntCounterVec = register_int_counter_vec!(
        "trivia_quiz_questions_served_total",
        "Number of questions handed out to quiz players",
        &["category"]
    )
    .unwrap();
}

const DEFAULT_FILTER: &str = "info,sqlx=warn";

pub fn init_tracing() {
    let mut fmt_layer = fmt::layer();
    if std::env::var("INCLUDE_SPAN_EVENTS").is_ok_and(|value| value.eq_ignore_ascii_case("true")) {
        fmt_layer = fmt_layer.with_span_events(FmtSpan::ENTER | FmtSpan::EXIT);
    }
    let filter_layer = EnvFilter::try_from_env("LOG_LEVEL")
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
        .unwrap();

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
