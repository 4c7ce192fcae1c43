use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-text sentiment class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentClass {
    Positive,
    Neutral,
    Negative,
}

impl SentimentClass {
    /// Classify a polarity value with a symmetric 0.1 dead zone.
    pub fn from_polarity(polarity: f64) -> Self {
        if polarity > 0.1 {
            Self::Positive
        } else if polarity < -0.1 {
            Self::Negative
        } else {
            Self::Neutral
        }
    }
}

impl fmt::Display for SentimentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Positive => write!(f, "positive"),
            Self::Neutral => write!(f, "neutral"),
            Self::Negative => write!(f, "negative"),
        }
    }
}

/// Discrete label for the aggregate score of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentimentTrend {
    VeryPositive,
    Positive,
    Neutral,
    Negative,
    VeryNegative,
    NoData,
}

impl SentimentTrend {
    pub fn from_score(score: f64) -> Self {
        if score > 0.3 {
            Self::VeryPositive
        } else if score > 0.1 {
            Self::Positive
        } else if score < -0.3 {
            Self::VeryNegative
        } else if score < -0.1 {
            Self::Negative
        } else {
            Self::Neutral
        }
    }
}

impl fmt::Display for SentimentTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VeryPositive => write!(f, "Very Positive"),
            Self::Positive => write!(f, "Positive"),
            Self::Neutral => write!(f, "Neutral"),
            Self::Negative => write!(f, "Negative"),
            Self::VeryNegative => write!(f, "Very Negative"),
            Self::NoData => write!(f, "No Data"),
        }
    }
}

/// Sentiment of a single text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSentiment {
    pub polarity: f64,     // -1.0 to 1.0
    pub subjectivity: f64, // 0.0 to 1.0
    pub class: SentimentClass,
    pub positive_keywords: usize,
    pub negative_keywords: usize,
}

impl TextSentiment {
    pub fn neutral() -> Self {
        Self {
            polarity: 0.0,
            subjectivity: 0.0,
            class: SentimentClass::Neutral,
            positive_keywords: 0,
            negative_keywords: 0,
        }
    }
}

/// Aggregate over a batch of news items. Recomputed on every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentSummary {
    pub avg_sentiment: f64,
    /// (positive - negative) / total, always within [-1, 1]
    pub sentiment_score: f64,
    pub positive_count: usize,
    pub negative_count: usize,
    pub neutral_count: usize,
    pub total_articles: usize,
    pub trend: SentimentTrend,
}

impl SentimentSummary {
    pub fn empty() -> Self {
        Self {
            avg_sentiment: 0.0,
            sentiment_score: 0.0,
            positive_count: 0,
            negative_count: 0,
            neutral_count: 0,
            total_articles: 0,
            trend: SentimentTrend::NoData,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_thresholds() {
        assert_eq!(SentimentClass::from_polarity(0.11), SentimentClass::Positive);
        assert_eq!(SentimentClass::from_polarity(0.1), SentimentClass::Neutral);
        assert_eq!(SentimentClass::from_polarity(-0.1), SentimentClass::Neutral);
        assert_eq!(SentimentClass::from_polarity(-0.11), SentimentClass::Negative);
    }

    #[test]
    fn test_trend_thresholds() {
        assert_eq!(SentimentTrend::from_score(0.31), SentimentTrend::VeryPositive);
        assert_eq!(SentimentTrend::from_score(0.3), SentimentTrend::Positive);
        assert_eq!(SentimentTrend::from_score(0.1), SentimentTrend::Neutral);
        assert_eq!(SentimentTrend::from_score(-0.2), SentimentTrend::Negative);
        assert_eq!(SentimentTrend::from_score(-0.5), SentimentTrend::VeryNegative);
        assert_eq!(SentimentTrend::NoData.to_string(), "No Data");
        assert_eq!(SentimentTrend::VeryPositive.to_string(), "Very Positive");
    }
}
