use std::sync::Arc;

use uuid::Uuid;

use crate::error::FeedbackError;
use crate::models::{CourseAnalytics, FeedbackRecord, Sections, SentimentDistribution, SentimentLabel};
use crate::store::FeedbackStore;

pub fn distribution(records: &[FeedbackRecord]) -> SentimentDistribution {
    let mut counts = SentimentDistribution::default();
    for record in records {
        match record.overall_sentiment {
            SentimentLabel::Happy => counts.happy += 1,
            SentimentLabel::Neutral => counts.neutral += 1,
            SentimentLabel::Unhappy => counts.unhappy += 1,
        }
    }
    counts
}

/// Mean score per section, `None` when there are no records.
pub fn section_means(records: &[FeedbackRecord]) -> Sections<Option<f64>> {
    Sections::from_fn(|section| {
        if records.is_empty() {
            return None;
        }
        let total: u32 = records
            .iter()
            .map(|record| u32::from(record.feedback.get(section).score()))
            .sum();
        Some(f64::from(total) / records.len() as f64)
    })
}

pub fn summarize(course_id: Uuid, records: &[FeedbackRecord]) -> CourseAnalytics {
    CourseAnalytics {
        course_id,
        total: records.len(),
        distribution: distribution(records),
        section_means: section_means(records),
    }
}

/// Read-only analytics over a course's linked feedback.
#[derive(Clone)]
pub struct AnalyticsReader {
    store: Arc<dyn FeedbackStore>,
}

impl AnalyticsReader {
    pub fn new(store: Arc<dyn FeedbackStore>) -> Self {
        Self { store }
    }

    pub async fn analyze(&self, course_id: Uuid) -> Result<CourseAnalytics, FeedbackError> {
        let records = self
            .store
            .course_feedback(course_id)
            .await
            .map_err(|err| match err {
                FeedbackError::CourseNotFound(_) | FeedbackError::Retrieval(_) => err,
                other => FeedbackError::Retrieval(other.to_string()),
            })?;
        Ok(summarize(course_id, &records))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::SentimentLabel::{Happy, Neutral, Unhappy};
    use crate::models::{FeedbackDraft, SectionFeedback};
    use crate::store::memory::MemoryStore;

    fn record(labels: [SentimentLabel; 4]) -> FeedbackRecord {
        let sections = Sections {
            course_expertise: labels[0],
            course_contents: labels[1],
            lab_infrastructure: labels[2],
            library_facility: labels[3],
        }
        .map(|section, label| SectionFeedback::new(section.title().to_string(), label));
        FeedbackRecord::from_draft(Uuid::new_v4(), Utc::now(), FeedbackDraft::new(sections))
    }

    #[test]
    fn counts_by_overall_sentiment() {
        let records = vec![
            record([Happy, Happy, Happy, Happy]),
            record([Happy, Happy, Neutral, Neutral]),
            record([Unhappy, Unhappy, Unhappy, Unhappy]),
            record([Happy, Unhappy, Unhappy, Unhappy]),
        ];
        let counts = distribution(&records);
        assert_eq!(counts.happy, 1);
        assert_eq!(counts.neutral, 1);
        assert_eq!(counts.unhappy, 2);
    }

    #[test]
    fn means_are_per_section() {
        let records = vec![
            record([Happy, Neutral, Unhappy, Happy]),
            record([Neutral, Neutral, Unhappy, Unhappy]),
        ];
        let means = section_means(&records);
        assert_eq!(means.course_expertise, Some(2.5));
        assert_eq!(means.course_contents, Some(2.0));
        assert_eq!(means.lab_infrastructure, Some(1.0));
        assert_eq!(means.library_facility, Some(2.0));
    }

    #[test]
    fn no_records_means_no_data() {
        let summary = summarize(Uuid::new_v4(), &[]);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.distribution, SentimentDistribution::default());
        assert!(summary.section_means.iter().all(|(_, mean)| mean.is_none()));
    }

    #[tokio::test]
    async fn analyze_reads_linked_records_only() {
        let store = Arc::new(MemoryStore::new());
        let course = store.create_course("Databases").await.unwrap();
        let linked = store
            .save(FeedbackDraft::new(record([Happy, Happy, Happy, Neutral]).feedback))
            .await
            .unwrap();
        store.link_to_course(course.id, linked.id).await.unwrap();
        store
            .save(FeedbackDraft::new(record([Unhappy, Unhappy, Unhappy, Unhappy]).feedback))
            .await
            .unwrap();

        let analytics = AnalyticsReader::new(store).analyze(course.id).await.unwrap();
        assert_eq!(analytics.total, 1);
        assert_eq!(analytics.distribution.happy, 1);
        assert_eq!(analytics.section_means.library_facility, Some(2.0));
    }

    #[tokio::test]
    async fn analyze_unknown_course_is_not_found() {
        let reader = AnalyticsReader::new(Arc::new(MemoryStore::new()));
        let err = reader.analyze(Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.kind(), "retrieval_error");
    }
}
