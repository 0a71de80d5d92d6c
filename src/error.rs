//! Error kinds surfaced by the feedback pipeline.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::models::Section;

/// Failures from a single call to the external classifier.
#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("classifier request failed: {0}")]
    Transport(String),

    #[error("classifier did not answer within {0:?}")]
    Timeout(Duration),

    #[error("classifier returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("classifier returned unrecognized label {0:?}")]
    UnrecognizedLabel(String),

    #[error("classifier response could not be parsed: {0}")]
    MalformedPayload(String),
}

#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("invalid submission: {0}")]
    Validation(String),

    #[error("sentiment analysis failed for {section}: {source}")]
    Classification {
        section: Section,
        #[source]
        source: ClassificationError,
    },

    /// Classifier failure outside a submission (direct proxy calls).
    #[error("sentiment analysis failed: {0}")]
    Analysis(#[from] ClassificationError),

    #[error("failed to save feedback: {0}")]
    Persistence(String),

    #[error("feedback {record_id} was saved but could not be linked to course {course_id}: {reason}")]
    Link {
        record_id: Uuid,
        course_id: Uuid,
        reason: String,
    },

    #[error("course {0} not found")]
    CourseNotFound(Uuid),

    #[error("feedback {0} not found")]
    FeedbackNotFound(Uuid),

    #[error("failed to retrieve feedback: {0}")]
    Retrieval(String),
}

impl FeedbackError {
    pub fn kind(&self) -> &'static str {
        match self {
            FeedbackError::Validation(_) => "validation_error",
            FeedbackError::Classification { .. } | FeedbackError::Analysis(_) => {
                "classification_error"
            }
            FeedbackError::Persistence(_) => "persistence_error",
            FeedbackError::Link { .. } => "link_error",
            FeedbackError::CourseNotFound(_)
            | FeedbackError::FeedbackNotFound(_)
            | FeedbackError::Retrieval(_) => "retrieval_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            FeedbackError::Validation(_) => StatusCode::BAD_REQUEST,
            FeedbackError::CourseNotFound(_) | FeedbackError::FeedbackNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            FeedbackError::Classification { .. }
            | FeedbackError::Analysis(_)
            | FeedbackError::Persistence(_)
            | FeedbackError::Link { .. }
            | FeedbackError::Retrieval(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Failure body: `{ "success": false, "data": { "kind", "record_id"? }, "message" }`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub data: ErrorDetail,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<Uuid>,
}

impl IntoResponse for FeedbackError {
    fn into_response(self) -> Response {
        let detail = ErrorDetail {
            kind: self.kind(),
            record_id: match &self {
                FeedbackError::Link { record_id, .. } => Some(*record_id),
                _ => None,
            },
        };
        let body = ErrorBody {
            success: false,
            data: detail,
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_distinct_per_failure_class() {
        let link = FeedbackError::Link {
            record_id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            reason: "course not found".to_string(),
        };
        let persistence = FeedbackError::Persistence("disk full".to_string());
        assert_eq!(link.kind(), "link_error");
        assert_eq!(persistence.kind(), "persistence_error");
        assert_ne!(link.kind(), persistence.kind());
    }

    #[test]
    fn validation_maps_to_bad_request() {
        let err = FeedbackError::Validation("missing courseId".to_string());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn classification_message_names_section() {
        let err = FeedbackError::Classification {
            section: Section::LabInfrastructure,
            source: ClassificationError::Timeout(Duration::from_secs(10)),
        };
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("labInfrastructure"));
    }

    #[tokio::test]
    async fn link_error_body_carries_record_id() {
        let record_id = Uuid::new_v4();
        let response = FeedbackError::Link {
            record_id,
            course_id: Uuid::new_v4(),
            reason: "course not found".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["data"]["kind"], "link_error");
        assert_eq!(json["data"]["record_id"], record_id.to_string());
    }
}
