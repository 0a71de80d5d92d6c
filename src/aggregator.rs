//! Classifies, persists and links one validated submission.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::classifier::Classifier;
use crate::error::FeedbackError;
use crate::models::{FeedbackDraft, FeedbackRecord, Section, SectionFeedback, Sections, SentimentLabel};
use crate::store::FeedbackStore;
use crate::validate::ValidatedSubmission;

#[derive(Clone)]
pub struct Aggregator {
    classifier: Arc<dyn Classifier>,
    store: Arc<dyn FeedbackStore>,
}

impl Aggregator {
    pub fn new(classifier: Arc<dyn Classifier>, store: Arc<dyn FeedbackStore>) -> Self {
        Self { classifier, store }
    }

    pub async fn classify_sections(
        &self,
        texts: &Sections<String>,
    ) -> Result<Sections<SentimentLabel>, FeedbackError> {
        let classify = |section: Section| async move {
            self.classifier
                .classify(texts.get(section))
                .await
                .map_err(|source| {
                    warn!(section = %section, error = %source, "section classification failed");
                    FeedbackError::Classification { section, source }
                })
        };

        let (course_expertise, course_contents, lab_infrastructure, library_facility) = tokio::try_join!(
            classify(Section::CourseExpertise),
            classify(Section::CourseContents),
            classify(Section::LabInfrastructure),
            classify(Section::LibraryFacility),
        )?;

        Ok(Sections {
            course_expertise,
            course_contents,
            lab_infrastructure,
            library_facility,
        })
    }

    pub async fn submit(&self, submission: ValidatedSubmission) -> Result<FeedbackRecord, FeedbackError> {
        let ValidatedSubmission {
            course_id,
            course_name,
            sections,
        } = submission;

        let labels = self.classify_sections(&sections).await?;
        let draft = FeedbackDraft::new(
            sections.map(|section, text| SectionFeedback::new(text, *labels.get(section))),
        );

        let record = self.store.save(draft).await?;

        if let Err(err) = self.store.link_to_course(course_id, record.id).await {
            error!(
                record_id = %record.id,
                course_id = %course_id,
                error = %err,
                "feedback saved but not linked; record is orphaned"
            );
            return Err(match err {
                link @ FeedbackError::Link { .. } => link,
                other => FeedbackError::Link {
                    record_id: record.id,
                    course_id,
                    reason: other.to_string(),
                },
            });
        }

        info!(
            record_id = %record.id,
            course_id = %course_id,
            course_name = course_name.as_deref().unwrap_or(""),
            overall = %record.overall_sentiment,
            "feedback recorded"
        );
        Ok(record)
    }
}
