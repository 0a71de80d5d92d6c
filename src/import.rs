use std::io::Read;

use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::aggregator::Aggregator;
use crate::error::FeedbackError;
use crate::validate::{self, FeedbackSubmission};

#[derive(Debug, Deserialize)]
struct CsvRow {
    course_id: String,
    course_expertise: String,
    course_contents: String,
    lab_infrastructure: String,
    library_facility: String,
}

impl From<CsvRow> for FeedbackSubmission {
    fn from(row: CsvRow) -> Self {
        FeedbackSubmission {
            course_id: Some(row.course_id),
            course_name: None,
            feedback: Some(json!({
                "courseExpertise": row.course_expertise,
                "courseContents": row.course_contents,
                "labInfrastructure": row.lab_infrastructure,
                "libraryFacility": row.library_facility,
            })),
        }
    }
}

#[derive(Debug, Default)]
pub struct ImportSummary {
    pub submitted: usize,
    /// 1-based data row number and the reason it was rejected.
    pub failed: Vec<(usize, FeedbackError)>,
}

/// Submits each row through validation and the aggregator, one row at a time.
/// A failing row is recorded and the import carries on.
pub async fn import_csv<R: Read>(aggregator: &Aggregator, source: R) -> ImportSummary {
    let mut reader = csv::Reader::from_reader(source);
    let mut summary = ImportSummary::default();

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row_number = index + 1;
        let outcome = match result {
            Ok(row) => match validate::validate(row.into()) {
                Ok(submission) => aggregator.submit(submission).await.map(|_| ()),
                Err(err) => Err(err),
            },
            Err(err) => Err(FeedbackError::Validation(format!("malformed row: {err}"))),
        };

        match outcome {
            Ok(()) => summary.submitted += 1,
            Err(err) => {
                warn!(row = row_number, kind = err.kind(), error = %err, "feedback row rejected");
                summary.failed.push((row_number, err));
            }
        }
    }

    summary
}
