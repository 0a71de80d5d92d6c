//! HTTP routes for feedback submission, course reads and analytics.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::aggregator::Aggregator;
use crate::analytics::AnalyticsReader;
use crate::classifier::Classifier;
use crate::error::FeedbackError;
use crate::models::{Course, CourseAnalytics, FeedbackRecord, SentimentLabel};
use crate::store::FeedbackStore;
use crate::validate::{self, FeedbackSubmission};

#[derive(Clone)]
pub struct AppState {
    classifier: Arc<dyn Classifier>,
    store: Arc<dyn FeedbackStore>,
    aggregator: Aggregator,
    analytics: AnalyticsReader,
}

impl AppState {
    pub fn new(classifier: Arc<dyn Classifier>, store: Arc<dyn FeedbackStore>) -> Self {
        Self {
            aggregator: Aggregator::new(classifier.clone(), store.clone()),
            analytics: AnalyticsReader::new(store.clone()),
            classifier,
            store,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/feedback", post(submit_feedback))
        .route("/feedback/{id}", get(find_feedback))
        .route("/course/{id}/feedback", get(course_feedback))
        .route("/course/{id}/analytics", get(course_analytics))
        .route("/analyze-sentiment", post(analyze_sentiment))
        .route("/courses", get(list_courses).post(create_course))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive())
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, FeedbackError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| FeedbackError::Validation(rejection.body_text()))
}

fn parse_id(raw: &str) -> Result<Uuid, FeedbackError> {
    Uuid::parse_str(raw).map_err(|_| FeedbackError::Validation(format!("{raw:?} is not a valid id")))
}

async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "OK" }))
}

async fn submit_feedback(
    State(state): State<AppState>,
    payload: Result<Json<FeedbackSubmission>, JsonRejection>,
) -> Result<(StatusCode, Json<FeedbackRecord>), FeedbackError> {
    let submission = validate::validate(body(payload)?)?;
    let record = state.aggregator.submit(submission).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn find_feedback(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FeedbackRecord>, FeedbackError> {
    let record_id = parse_id(&id)?;
    let record = state
        .store
        .find_feedback(record_id)
        .await?
        .ok_or(FeedbackError::FeedbackNotFound(record_id))?;
    Ok(Json(record))
}

async fn course_feedback(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<FeedbackRecord>>, FeedbackError> {
    let records = state.store.course_feedback(parse_id(&id)?).await?;
    Ok(Json(records))
}

async fn course_analytics(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CourseAnalytics>, FeedbackError> {
    let analytics = state.analytics.analyze(parse_id(&id)?).await?;
    Ok(Json(analytics))
}

#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    feedback: Option<String>,
}

#[derive(Debug, Serialize)]
struct AnalyzeResponse {
    sentiment: SentimentLabel,
}

async fn analyze_sentiment(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>, FeedbackError> {
    let text = body(payload)?
        .feedback
        .ok_or_else(|| FeedbackError::Validation("No feedback provided".to_string()))?;
    let sentiment = state.classifier.classify(&text).await?;
    Ok(Json(AnalyzeResponse { sentiment }))
}

async fn list_courses(State(state): State<AppState>) -> Result<Json<Vec<Course>>, FeedbackError> {
    let courses = state.store.list_courses().await?;
    Ok(Json(courses))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateCourseRequest {
    course_name: Option<String>,
}

async fn create_course(
    State(state): State<AppState>,
    payload: Result<Json<CreateCourseRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Course>), FeedbackError> {
    let name = body(payload)?.course_name.unwrap_or_default();
    let course = state.store.create_course(&name).await?;
    Ok((StatusCode::CREATED, Json(course)))
}
