use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::FeedbackError;
use crate::models::{Course, FeedbackDraft, FeedbackRecord, Section, SectionFeedback, Sections, SentimentLabel};
use crate::store::{require_course_name, FeedbackStore};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<usize> {
    let courses = vec![
        (
            Uuid::parse_str("6f1c2a8e-4b7d-4c3e-9a51-2d8f0b6e7c14")?,
            "Advanced Software Engineering",
        ),
        (
            Uuid::parse_str("a3d95b10-7e2f-4f86-b0c4-58e1d7a2c963")?,
            "Database Systems",
        ),
        (
            Uuid::parse_str("c8e47f25-1a9b-4d60-8f3e-b7265d0a9e41")?,
            "Computer Networks",
        ),
    ];

    let mut inserted = 0usize;
    for (id, name) in courses {
        let result = sqlx::query(
            r#"
            INSERT INTO course_feedback.courses (id, course_name)
            VALUES ($1, $2)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(name)
        .execute(pool)
        .await?;
        inserted += result.rows_affected() as usize;
    }

    Ok(inserted)
}

fn feedback_columns() -> String {
    let mut columns = vec!["f.id".to_string(), "f.created_at".to_string()];
    for section in Section::ALL {
        let prefix = section.column();
        columns.push(format!("f.{prefix}_text"));
        columns.push(format!("f.{prefix}_sentiment"));
        columns.push(format!("f.{prefix}_score"));
    }
    columns.push("f.overall_sentiment".to_string());
    columns.join(", ")
}

fn insert_feedback_sql() -> String {
    let mut columns = vec!["id".to_string()];
    for section in Section::ALL {
        let prefix = section.column();
        columns.push(format!("{prefix}_text"));
        columns.push(format!("{prefix}_sentiment"));
        columns.push(format!("{prefix}_score"));
    }
    columns.push("overall_sentiment".to_string());
    let placeholders: Vec<String> = (1..=columns.len()).map(|n| format!("${n}")).collect();
    format!(
        "INSERT INTO course_feedback.feedback ({}) VALUES ({}) RETURNING created_at",
        columns.join(", "),
        placeholders.join(", ")
    )
}

const COURSE_SELECT: &str = r#"
    SELECT c.id, c.course_name, c.created_at,
           COALESCE(
               array_agg(cf.feedback_id ORDER BY cf.position) FILTER (WHERE cf.feedback_id IS NOT NULL),
               '{}'
           ) AS feedback
    FROM course_feedback.courses c
    LEFT JOIN course_feedback.course_feedback cf ON cf.course_id = c.id
"#;

fn retrieval(err: sqlx::Error) -> FeedbackError {
    FeedbackError::Retrieval(err.to_string())
}

fn parse_label(value: &str) -> Result<SentimentLabel, FeedbackError> {
    SentimentLabel::from_label(value)
        .ok_or_else(|| FeedbackError::Retrieval(format!("stored sentiment {value:?} is not a known label")))
}

fn section_from_row(row: &PgRow, section: Section) -> Result<SectionFeedback, FeedbackError> {
    let prefix = section.column();
    let text: String = row.try_get(format!("{prefix}_text").as_str()).map_err(retrieval)?;
    let sentiment: String = row
        .try_get(format!("{prefix}_sentiment").as_str())
        .map_err(retrieval)?;
    let score: i16 = row.try_get(format!("{prefix}_score").as_str()).map_err(retrieval)?;

    let entry = SectionFeedback::new(text, parse_label(&sentiment)?);
    if i16::from(entry.score()) != score {
        return Err(FeedbackError::Retrieval(format!(
            "stored score {score} for {section} does not match sentiment {sentiment}"
        )));
    }
    Ok(entry)
}

fn record_from_row(row: &PgRow) -> Result<FeedbackRecord, FeedbackError> {
    let id: Uuid = row.try_get("id").map_err(retrieval)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(retrieval)?;
    let stored_overall: String = row.try_get("overall_sentiment").map_err(retrieval)?;

    let draft = FeedbackDraft::new(Sections {
        course_expertise: section_from_row(row, Section::CourseExpertise)?,
        course_contents: section_from_row(row, Section::CourseContents)?,
        lab_infrastructure: section_from_row(row, Section::LabInfrastructure)?,
        library_facility: section_from_row(row, Section::LibraryFacility)?,
    });
    if parse_label(&stored_overall)? != draft.overall_sentiment() {
        return Err(FeedbackError::Retrieval(format!(
            "stored overall sentiment of {id} does not match its section scores"
        )));
    }

    Ok(FeedbackRecord::from_draft(id, created_at, draft))
}

fn course_from_row(row: &PgRow) -> Result<Course, FeedbackError> {
    Ok(Course {
        id: row.try_get("id").map_err(retrieval)?,
        course_name: row.try_get("course_name").map_err(retrieval)?,
        created_at: row.try_get("created_at").map_err(retrieval)?,
        feedback: row.try_get("feedback").map_err(retrieval)?,
    })
}

/// Postgres-backed store. The pool is owned by the caller and closed there.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FeedbackStore for PgStore {
    async fn save(&self, draft: FeedbackDraft) -> Result<FeedbackRecord, FeedbackError> {
        let id = Uuid::new_v4();
        let sql = insert_feedback_sql();
        let mut query = sqlx::query(&sql).bind(id);
        for (_, entry) in draft.sections().iter() {
            query = query
                .bind(entry.text())
                .bind(entry.sentiment().as_str())
                .bind(i16::from(entry.score()));
        }
        let row = query
            .bind(draft.overall_sentiment().as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|err| FeedbackError::Persistence(err.to_string()))?;
        let created_at: DateTime<Utc> = row
            .try_get("created_at")
            .map_err(|err| FeedbackError::Persistence(err.to_string()))?;

        Ok(FeedbackRecord::from_draft(id, created_at, draft))
    }

    async fn link_to_course(&self, course_id: Uuid, record_id: Uuid) -> Result<(), FeedbackError> {
        let link_error = |reason: String| FeedbackError::Link {
            record_id,
            course_id,
            reason,
        };

        // One statement: the course lookup and the append cannot interleave
        // with another submission's append.
        let result = sqlx::query(
            r#"
            INSERT INTO course_feedback.course_feedback (course_id, feedback_id)
            SELECT c.id, $2
            FROM course_feedback.courses c
            WHERE c.id = $1
            "#,
        )
        .bind(course_id)
        .bind(record_id)
        .execute(&self.pool)
        .await
        .map_err(|err| link_error(err.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(link_error("course not found".to_string()));
        }
        Ok(())
    }

    async fn create_course(&self, course_name: &str) -> Result<Course, FeedbackError> {
        let course_name = require_course_name(course_name)?;
        let row = sqlx::query(
            r#"
            INSERT INTO course_feedback.courses (id, course_name)
            VALUES ($1, $2)
            RETURNING id, course_name, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(course_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| FeedbackError::Persistence(err.to_string()))?;

        Ok(Course {
            id: row.try_get("id").map_err(retrieval)?,
            course_name: row.try_get("course_name").map_err(retrieval)?,
            created_at: row.try_get("created_at").map_err(retrieval)?,
            feedback: Vec::new(),
        })
    }

    async fn list_courses(&self) -> Result<Vec<Course>, FeedbackError> {
        let query = format!("{COURSE_SELECT} GROUP BY c.id ORDER BY c.created_at, c.course_name");
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(retrieval)?;
        rows.iter().map(course_from_row).collect()
    }

    async fn find_course(&self, course_id: Uuid) -> Result<Option<Course>, FeedbackError> {
        let query = format!("{COURSE_SELECT} WHERE c.id = $1 GROUP BY c.id");
        let row = sqlx::query(&query)
            .bind(course_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(retrieval)?;
        row.as_ref().map(course_from_row).transpose()
    }

    async fn course_feedback(&self, course_id: Uuid) -> Result<Vec<FeedbackRecord>, FeedbackError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM course_feedback.courses WHERE id = $1)",
        )
        .bind(course_id)
        .fetch_one(&self.pool)
        .await
        .map_err(retrieval)?;
        if !exists {
            return Err(FeedbackError::CourseNotFound(course_id));
        }

        let query = format!(
            "SELECT {} FROM course_feedback.course_feedback cf \
             JOIN course_feedback.feedback f ON f.id = cf.feedback_id \
             WHERE cf.course_id = $1 ORDER BY cf.position",
            feedback_columns()
        );
        let rows = sqlx::query(&query)
            .bind(course_id)
            .fetch_all(&self.pool)
            .await
            .map_err(retrieval)?;
        rows.iter().map(record_from_row).collect()
    }

    async fn find_feedback(&self, record_id: Uuid) -> Result<Option<FeedbackRecord>, FeedbackError> {
        let query = format!(
            "SELECT {} FROM course_feedback.feedback f WHERE f.id = $1",
            feedback_columns()
        );
        let row = sqlx::query(&query)
            .bind(record_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(retrieval)?;
        row.as_ref().map(record_from_row).transpose()
    }

    async fn unlinked_feedback(&self) -> Result<Vec<FeedbackRecord>, FeedbackError> {
        let query = format!(
            "SELECT {} FROM course_feedback.feedback f \
             WHERE NOT EXISTS (SELECT 1 FROM course_feedback.course_feedback cf WHERE cf.feedback_id = f.id) \
             ORDER BY f.created_at",
            feedback_columns()
        );
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(retrieval)?;
        rows.iter().map(record_from_row).collect()
    }
}
