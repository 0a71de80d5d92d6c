use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod aggregator;
mod analytics;
mod api;
mod classifier;
mod config;
mod db;
mod error;
mod import;
mod models;
mod report;
mod scoring;
mod store;
mod validate;

use crate::aggregator::Aggregator;
use crate::classifier::{Classifier, HttpClassifier};
use crate::config::Config;
use crate::db::PgStore;
use crate::store::FeedbackStore;

#[derive(Parser)]
#[command(name = "course-feedback")]
#[command(about = "Course feedback collection with per-section sentiment scoring", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a few example courses
    Seed,
    /// Serve the HTTP API
    Serve,
    /// Create a course
    AddCourse {
        #[arg(long)]
        name: String,
    },
    /// List courses with their feedback counts
    Courses,
    /// Classify a single text with the external classifier
    Classify {
        #[arg(long)]
        text: String,
    },
    /// Submit feedback rows from a CSV file through the full pipeline
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Generate a markdown analytics report for one course
    Report {
        #[arg(long)]
        course: Uuid,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// List feedback records that were saved but never linked to a course
    Reconcile,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Commands::Classify { text } => classify(&config, &text).await,
        command => {
            let pool = connect(&config).await?;
            let result = run(command, &config, &pool).await;
            pool.close().await;
            result
        }
    }
}

async fn connect(config: &Config) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(config.database_url()?)
        .await
        .context("failed to connect to Postgres")
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_env("LOG_LEVEL")
        .unwrap_or_else(|_| EnvFilter::new("course_feedback=info,tower_http=info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();
}

fn http_classifier(config: &Config) -> anyhow::Result<Arc<dyn Classifier>> {
    let classifier = HttpClassifier::new(config.classifier_url()?, config.classifier_timeout)
        .context("failed to build classifier client")?;
    Ok(Arc::new(classifier))
}

async fn classify(config: &Config, text: &str) -> anyhow::Result<()> {
    let sentiment = http_classifier(config)?.classify(text).await?;
    println!("{sentiment}");
    Ok(())
}

async fn run(command: Commands, config: &Config, pool: &PgPool) -> anyhow::Result<()> {
    let store: Arc<dyn FeedbackStore> = Arc::new(PgStore::new(pool.clone()));

    match command {
        Commands::InitDb => {
            db::init_db(pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let inserted = db::seed(pool).await?;
            println!("Seed data inserted ({inserted} new courses).");
        }
        Commands::Serve => {
            let state = api::AppState::new(http_classifier(config)?, store);
            let listener = tokio::net::TcpListener::bind(config.bind_address())
                .await
                .with_context(|| format!("failed to bind {}", config.bind_address()))?;
            info!(address = %config.bind_address(), "serving course feedback API");
            axum::serve(listener, api::router(state))
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("server crashed")?;
        }
        Commands::AddCourse { name } => {
            let course = store.create_course(&name).await?;
            println!("Created course {} ({}).", course.course_name, course.id);
        }
        Commands::Courses => {
            let courses = store.list_courses().await?;
            if courses.is_empty() {
                println!("No courses yet.");
                return Ok(());
            }
            for course in courses {
                println!(
                    "- {} ({}) with {} feedback records",
                    course.course_name,
                    course.id,
                    course.feedback.len()
                );
            }
        }
        Commands::Classify { text } => classify(config, &text).await?,
        Commands::Import { csv } => {
            let aggregator = Aggregator::new(http_classifier(config)?, store);
            let file = std::fs::File::open(&csv)
                .with_context(|| format!("failed to open {}", csv.display()))?;
            let summary = import::import_csv(&aggregator, file).await;
            println!(
                "Submitted {} feedback rows from {}.",
                summary.submitted,
                csv.display()
            );
            for (row, err) in &summary.failed {
                println!("- row {row} rejected ({}): {err}", err.kind());
            }
        }
        Commands::Report { course, out } => {
            let found = store
                .find_course(course)
                .await?
                .with_context(|| format!("course {course} not found"))?;
            let records = store.course_feedback(course).await?;
            let analytics = analytics::summarize(course, &records);
            let report = report::build_report(&found, &analytics, &records);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Reconcile => {
            let orphans = store.unlinked_feedback().await?;
            if orphans.is_empty() {
                println!("Every feedback record is linked to a course.");
                return Ok(());
            }
            println!("{} feedback records are not linked to any course:", orphans.len());
            for record in orphans {
                println!(
                    "- {} saved {} (overall {})",
                    record.id, record.timestamp, record.overall_sentiment
                );
            }
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn classify_runs_without_a_database() {
        let app = Router::new().route(
            "/analyze_feedback",
            post(|| async { Json(json!({ "sentiment": "happy" })) }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let config = Config::from_lookup(|key| {
            (key == "CLASSIFIER_URL").then(|| format!("http://{addr}/analyze_feedback"))
        })
        .unwrap();
        assert!(config.database_url().is_err());

        classify(&config, "the labs were great").await.unwrap();
    }
}
