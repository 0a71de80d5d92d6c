use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::FeedbackError;
use crate::models::{Section, Sections};

/// Inbound submission as received on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackSubmission {
    #[serde(default)]
    pub course_id: Option<String>,
    #[serde(default)]
    pub course_name: Option<String>,
    #[serde(default)]
    pub feedback: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSubmission {
    pub course_id: Uuid,
    pub course_name: Option<String>,
    pub sections: Sections<String>,
}

pub fn validate(submission: FeedbackSubmission) -> Result<ValidatedSubmission, FeedbackError> {
    let raw_course_id = submission
        .course_id
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| FeedbackError::Validation("missing courseId".to_string()))?;
    let course_id = Uuid::parse_str(raw_course_id).map_err(|_| {
        FeedbackError::Validation(format!("courseId {raw_course_id:?} is not a valid id"))
    })?;

    let feedback = submission
        .feedback
        .ok_or_else(|| FeedbackError::Validation("missing feedback".to_string()))?;
    let Value::Object(map) = feedback else {
        return Err(FeedbackError::Validation(
            "feedback must be an object keyed by section".to_string(),
        ));
    };

    let mut unknown: Vec<&str> = map
        .keys()
        .map(String::as_str)
        .filter(|key| Section::from_key(key).is_none())
        .collect();
    if !unknown.is_empty() {
        unknown.sort_unstable();
        return Err(FeedbackError::Validation(format!(
            "unrecognized feedback sections: {}",
            unknown.join(", ")
        )));
    }

    let missing: Vec<&str> = Section::ALL
        .into_iter()
        .filter(|section| !matches!(map.get(section.key()), Some(Value::String(_))))
        .map(Section::key)
        .collect();
    if !missing.is_empty() {
        return Err(FeedbackError::Validation(format!(
            "feedback sections must be present as text: {}",
            missing.join(", ")
        )));
    }

    let sections = Sections::from_fn(|section| {
        map.get(section.key())
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    });

    Ok(ValidatedSubmission {
        course_id,
        course_name: submission.course_name,
        sections,
    })
}
