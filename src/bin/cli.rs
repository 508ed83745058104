use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use trivia_api::db::queries::categories::{get_all_categories, import_categories};
use trivia_api::db::queries::questions::{get_all_questions, import_questions};
use trivia_api::db::{self, Category, Question};
use trivia_api::telemetry::init_tracing;

const CATEGORIES_FILE: &str = "categories.csv";
const QUESTIONS_FILE: &str = "questions.csv";

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// Database path
    db_path: PathBuf,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load categories and questions from csv files in a directory
    Import { path: PathBuf },
    /// Dump categories and questions to csv files in a directory
    Export { path: PathBuf },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let db_path = cli.db_path.display().to_string();
    let pool = db::establish_connection(&db_path)
        .await
        .with_context(|| format!("Cannot connect to {db_path}"))?;
    db::run_migrations(&pool).await?;
    match cli.command {
        Commands::Export { path } => export_data(&pool, &path).await.context("Cannot export"),
        Commands::Import { path } => import_data(&pool, &path).await.context("Cannot import"),
    }
}

fn write_to(path: PathBuf, data: Vec<impl Serialize>) -> anyhow::Result<()> {
    let file = std::fs::File::create(&path)
        .with_context(|| format!("Cannot create {}", path.display()))?;
    let mut wtr = csv::Writer::from_writer(file);
    for line in data {
        wtr.serialize(line)?;
    }
    wtr.flush()?;
    Ok(())
}

fn read_from<T: DeserializeOwned>(path: PathBuf) -> anyhow::Result<Vec<T>> {
    let file =
        std::fs::File::open(&path).with_context(|| format!("Cannot open {}", path.display()))?;
    let mut rdr = csv::Reader::from_reader(file);
    let mut out = Vec::new();
    for record in rdr.deserialize() {
        let record: T = record?;
        out.push(record);
    }
    Ok(out)
}

async fn export_data(pool: &SqlitePool, path: &Path) -> anyhow::Result<()> {
    let categories = get_all_categories(pool).await?;
    let questions = get_all_questions(pool).await?;
    if !path.exists() {
        std::fs::create_dir_all(path)?
    }
    tracing::info!(
        categories = categories.len(),
        questions = questions.len(),
        "Exporting to {}",
        path.display()
    );
    write_to(path.join(CATEGORIES_FILE), categories)?;
    write_to(path.join(QUESTIONS_FILE), questions)?;
    Ok(())
}

async fn import_data(pool: &SqlitePool, path: &Path) -> anyhow::Result<()> {
    let categories: Vec<Category> = read_from(path.join(CATEGORIES_FILE))?;
    let questions: Vec<Question> = read_from(path.join(QUESTIONS_FILE))?;
    tracing::info!(
        categories = categories.len(),
        questions = questions.len(),
        "Importing from {}",
        path.display()
    );
    import_categories(pool, categories).await?;
    import_questions(pool, questions).await?;
    Ok(())
}
