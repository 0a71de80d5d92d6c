use std::fmt::Write;

use crate::models::{Course, CourseAnalytics, FeedbackRecord};

fn share(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 * 100.0 / total as f64
    }
}

pub fn build_report(course: &Course, analytics: &CourseAnalytics, records: &[FeedbackRecord]) -> String {
    let mut output = String::new();
    let total = analytics.total;

    let _ = writeln!(output, "# Course Feedback Report");
    let _ = writeln!(
        output,
        "Generated for {} ({}) across {} feedback records",
        course.course_name, course.id, total
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overall Sentiment");

    if total == 0 {
        let _ = writeln!(output, "No feedback recorded for this course.");
    } else {
        let distribution = &analytics.distribution;
        for (label, count) in [
            ("Happy", distribution.happy),
            ("Neutral", distribution.neutral),
            ("Unhappy", distribution.unhappy),
        ] {
            let _ = writeln!(output, "- {}: {} ({:.1}%)", label, count, share(count, total));
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Section Scores");

    for (section, mean) in analytics.section_means.iter() {
        match mean {
            Some(mean) => {
                let _ = writeln!(output, "- {}: {:.2} / 3", section.title(), mean);
            }
            None => {
                let _ = writeln!(output, "- {}: no data", section.title());
            }
        }
    }

    let mut recent = records.to_vec();
    recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Feedback");

    if recent.is_empty() {
        let _ = writeln!(output, "No feedback recorded for this course.");
    } else {
        for record in recent.iter().take(5) {
            let _ = writeln!(
                output,
                "- {} on {}: {}",
                record.id,
                record.timestamp.format("%Y-%m-%d %H:%M"),
                record.overall_sentiment
            );
        }
    }

    output
}
