use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::scoring;

/// One of the three labels the external classifier can return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Happy,
    Neutral,
    Unhappy,
}

impl SentimentLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            SentimentLabel::Happy => "happy",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Unhappy => "unhappy",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        match value {
            "happy" => Some(SentimentLabel::Happy),
            "neutral" => Some(SentimentLabel::Neutral),
            "unhappy" => Some(SentimentLabel::Unhappy),
            _ => None,
        }
    }

    /// Fixed score table: happy 3, neutral 2, unhappy 1.
    pub fn score(self) -> u8 {
        match self {
            SentimentLabel::Happy => 3,
            SentimentLabel::Neutral => 2,
            SentimentLabel::Unhappy => 1,
        }
    }
}

impl std::fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four recognized feedback sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    CourseExpertise,
    CourseContents,
    LabInfrastructure,
    LibraryFacility,
}

impl Section {
    pub const ALL: [Section; 4] = [
        Section::CourseExpertise,
        Section::CourseContents,
        Section::LabInfrastructure,
        Section::LibraryFacility,
    ];

    /// Wire key used in JSON payloads.
    pub fn key(self) -> &'static str {
        match self {
            Section::CourseExpertise => "courseExpertise",
            Section::CourseContents => "courseContents",
            Section::LabInfrastructure => "labInfrastructure",
            Section::LibraryFacility => "libraryFacility",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Section::ALL.into_iter().find(|section| section.key() == key)
    }

    pub fn title(self) -> &'static str {
        match self {
            Section::CourseExpertise => "Course Expertise",
            Section::CourseContents => "Course Contents",
            Section::LabInfrastructure => "Lab Infrastructure",
            Section::LibraryFacility => "Library Facility",
        }
    }

    /// Column prefix in the `feedback` table.
    pub fn column(self) -> &'static str {
        match self {
            Section::CourseExpertise => "course_expertise",
            Section::CourseContents => "course_contents",
            Section::LabInfrastructure => "lab_infrastructure",
            Section::LibraryFacility => "library_facility",
        }
    }
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// A value per recognized section. The field set is the section set, so a
/// `Sections<T>` can never carry an extra or a missing section.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sections<T> {
    pub course_expertise: T,
    pub course_contents: T,
    pub lab_infrastructure: T,
    pub library_facility: T,
}

impl<T> Sections<T> {
    pub fn from_fn(mut f: impl FnMut(Section) -> T) -> Self {
        Sections {
            course_expertise: f(Section::CourseExpertise),
            course_contents: f(Section::CourseContents),
            lab_infrastructure: f(Section::LabInfrastructure),
            library_facility: f(Section::LibraryFacility),
        }
    }

    pub fn get(&self, section: Section) -> &T {
        match section {
            Section::CourseExpertise => &self.course_expertise,
            Section::CourseContents => &self.course_contents,
            Section::LabInfrastructure => &self.lab_infrastructure,
            Section::LibraryFacility => &self.library_facility,
        }
    }

    pub fn map<U>(self, mut f: impl FnMut(Section, T) -> U) -> Sections<U> {
        Sections {
            course_expertise: f(Section::CourseExpertise, self.course_expertise),
            course_contents: f(Section::CourseContents, self.course_contents),
            lab_infrastructure: f(Section::LabInfrastructure, self.lab_infrastructure),
            library_facility: f(Section::LibraryFacility, self.library_facility),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Section, &T)> {
        Section::ALL.into_iter().map(move |section| (section, self.get(section)))
    }
}

/// Classified text for one section. The score is always derived from the
/// sentiment, so the two cannot diverge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionFeedback {
    text: String,
    sentiment: SentimentLabel,
    score: u8,
}

impl SectionFeedback {
    pub fn new(text: String, sentiment: SentimentLabel) -> Self {
        Self {
            text,
            sentiment,
            score: sentiment.score(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn sentiment(&self) -> SentimentLabel {
        self.sentiment
    }

    pub fn score(&self) -> u8 {
        self.score
    }
}

/// A fully classified submission that has not been persisted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackDraft {
    sections: Sections<SectionFeedback>,
    overall_sentiment: SentimentLabel,
}

impl FeedbackDraft {
    pub fn new(sections: Sections<SectionFeedback>) -> Self {
        let scores = sections.iter().map(|(_, entry)| entry.score());
        let overall_sentiment = scoring::overall_sentiment(scores);
        Self {
            sections,
            overall_sentiment,
        }
    }

    pub fn sections(&self) -> &Sections<SectionFeedback> {
        &self.sections
    }

    pub fn overall_sentiment(&self) -> SentimentLabel {
        self.overall_sentiment
    }
}

/// An immutable, persisted feedback record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub feedback: Sections<SectionFeedback>,
    pub overall_sentiment: SentimentLabel,
}

impl FeedbackRecord {
    pub fn from_draft(id: Uuid, timestamp: DateTime<Utc>, draft: FeedbackDraft) -> Self {
        Self {
            id,
            timestamp,
            feedback: draft.sections,
            overall_sentiment: draft.overall_sentiment,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: Uuid,
    pub course_name: String,
    pub created_at: DateTime<Utc>,
    /// Linked feedback record ids in link order.
    pub feedback: Vec<Uuid>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SentimentDistribution {
    pub happy: usize,
    pub neutral: usize,
    pub unhappy: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseAnalytics {
    pub course_id: Uuid,
    pub total: usize,
    pub distribution: SentimentDistribution,
    /// `None` when the course has no feedback yet.
    pub section_means: Sections<Option<f64>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_table_is_fixed() {
        assert_eq!(SentimentLabel::Happy.score(), 3);
        assert_eq!(SentimentLabel::Neutral.score(), 2);
        assert_eq!(SentimentLabel::Unhappy.score(), 1);
    }

    #[test]
    fn labels_parse_only_exact_values() {
        for label in [SentimentLabel::Happy, SentimentLabel::Neutral, SentimentLabel::Unhappy] {
            assert_eq!(SentimentLabel::from_label(label.as_str()), Some(label));
        }
        assert_eq!(SentimentLabel::from_label("Happy"), None);
        assert_eq!(SentimentLabel::from_label("positive"), None);
        assert_eq!(SentimentLabel::from_label(""), None);
    }

    #[test]
    fn section_keys_round_trip() {
        for section in Section::ALL {
            assert_eq!(Section::from_key(section.key()), Some(section));
        }
        assert_eq!(Section::from_key("course_expertise"), None);
    }

    #[test]
    fn section_feedback_derives_score() {
        let entry = SectionFeedback::new("great lab".to_string(), SentimentLabel::Neutral);
        assert_eq!(entry.score(), 2);
        assert_eq!(entry.sentiment(), SentimentLabel::Neutral);
    }

    #[test]
    fn record_serializes_with_wire_keys() {
        let sections = Sections::from_fn(|section| {
            SectionFeedback::new(section.title().to_string(), SentimentLabel::Happy)
        });
        let record = FeedbackRecord::from_draft(Uuid::nil(), Utc::now(), FeedbackDraft::new(sections));
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["overallSentiment"], "happy");
        assert_eq!(json["feedback"]["labInfrastructure"]["score"], 3);
        assert_eq!(json["feedback"]["courseExpertise"]["sentiment"], "happy");
        assert_eq!(json["feedback"]["libraryFacility"]["text"], "Library Facility");
    }
}
