use crate::models::SentimentLabel;

/// Averages above this are happy.
pub const HAPPY_THRESHOLD: f64 = 2.5;
/// Averages above this (and not above [`HAPPY_THRESHOLD`]) are neutral.
pub const NEUTRAL_THRESHOLD: f64 = 1.5;

/// Plain arithmetic mean of the section scores.
pub fn average_score(scores: impl IntoIterator<Item = u8>) -> f64 {
    let (total, count) = scores
        .into_iter()
        .fold((0u32, 0u32), |(total, count), score| (total + u32::from(score), count + 1));
    f64::from(total) / f64::from(count)
}

/// Both comparisons are strict: 2.5 is neutral and 1.5 is unhappy.
pub fn sentiment_for_average(average: f64) -> SentimentLabel {
    if average > HAPPY_THRESHOLD {
        SentimentLabel::Happy
    } else if average > NEUTRAL_THRESHOLD {
        SentimentLabel::Neutral
    } else {
        SentimentLabel::Unhappy
    }
}

pub fn overall_sentiment(scores: impl IntoIterator<Item = u8>) -> SentimentLabel {
    sentiment_for_average(average_score(scores))
}
