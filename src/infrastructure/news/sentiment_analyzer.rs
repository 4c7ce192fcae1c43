//! Local NLP-based sentiment scoring using VADER
//!
//! Each text gets a general polarity from VADER's compound score, which is
//! then blended with a finance keyword signal. Batches of news items are
//! reduced to a [`SentimentSummary`] and finally to a bounded weight that the
//! forecaster uses to nudge its predictions.
//!
//! # Example
//! ```rust,ignore
//! use stockcast::infrastructure::news::sentiment_analyzer::SentimentAnalyzer;
//!
//! let analyzer = SentimentAnalyzer::new();
//! let scored = analyzer.score_text("Profits surge after record quarter");
//! assert!(scored.polarity > 0.1);
//! ```

use crate::domain::market::NewsItem;
use crate::domain::sentiment::{SentimentClass, SentimentSummary, SentimentTrend, TextSentiment};
use tracing::debug;
use vader_sentiment::SentimentIntensityAnalyzer;

/// Default maximum magnitude of the sentiment weight.
pub const DEFAULT_BASE_WEIGHT: f64 = 0.3;

/// Article count at which confidence in the batch saturates.
const FULL_CONFIDENCE_ARTICLES: f64 = 20.0;

/// Finance terms that VADER's general lexicon under-weights.
/// Matched as case-insensitive substrings, each counted at most once.
const POSITIVE_KEYWORDS: &[&str] = &[
    "profit",
    "growth",
    "increase",
    "gain",
    "rise",
    "up",
    "high",
    "strong",
    "beat",
    "exceed",
    "success",
    "improve",
    "surge",
    "rally",
    "bullish",
    "outperform",
    "upgrade",
    "buy",
];

const NEGATIVE_KEYWORDS: &[&str] = &[
    "loss",
    "decline",
    "decrease",
    "drop",
    "fall",
    "down",
    "low",
    "weak",
    "miss",
    "fail",
    "concern",
    "risk",
    "crash",
    "plunge",
    "bearish",
    "underperform",
    "downgrade",
    "sell",
    "warning",
];

/// VADER sentiment scorer with finance keyword blending.
pub struct SentimentAnalyzer {
    analyzer: SentimentIntensityAnalyzer<'static>,
}

impl SentimentAnalyzer {
    pub fn new() -> Self {
        Self {
            analyzer: SentimentIntensityAnalyzer::new(),
        }
    }

    fn keyword_hits(text_lower: &str) -> (usize, usize) {
        let positive = POSITIVE_KEYWORDS
            .iter()
            .filter(|k| text_lower.contains(*k))
            .count();
        let negative = NEGATIVE_KEYWORDS
            .iter()
            .filter(|k| text_lower.contains(*k))
            .count();
        (positive, negative)
    }

    /// Score a single text.
    ///
    /// When any finance keyword matches, the VADER polarity is averaged with
    /// the keyword balance `(pos - neg) / (pos + neg)`. Empty text is neutral.
    pub fn score_text(&self, text: &str) -> TextSentiment {
        if text.trim().is_empty() {
            return TextSentiment::neutral();
        }

        let scores = self.analyzer.polarity_scores(text);
        let general = scores.get("compound").copied().unwrap_or(0.0);
        let subjectivity = (scores.get("pos").copied().unwrap_or(0.0)
            + scores.get("neg").copied().unwrap_or(0.0))
        .clamp(0.0, 1.0);

        let (positive_keywords, negative_keywords) = Self::keyword_hits(&text.to_lowercase());

        let polarity = if positive_keywords + negative_keywords > 0 {
            let keyword_balance = (positive_keywords as f64 - negative_keywords as f64)
                / (positive_keywords + negative_keywords) as f64;
            (general + keyword_balance) / 2.0
        } else {
            general
        }
        .clamp(-1.0, 1.0);

        TextSentiment {
            polarity,
            subjectivity,
            class: SentimentClass::from_polarity(polarity),
            positive_keywords,
            negative_keywords,
        }
    }

    /// Aggregate a batch of news items (headline and summary concatenated).
    pub fn score_batch(&self, items: &[NewsItem]) -> SentimentSummary {
        if items.is_empty() {
            return SentimentSummary::empty();
        }

        let mut polarity_sum = 0.0;
        let (mut positive_count, mut negative_count, mut neutral_count) = (0, 0, 0);

        for item in items {
            let text = format!("{} {}", item.headline, item.summary);
            let scored = self.score_text(&text);
            polarity_sum += scored.polarity;
            match scored.class {
                SentimentClass::Positive => positive_count += 1,
                SentimentClass::Negative => negative_count += 1,
                SentimentClass::Neutral => neutral_count += 1,
            }
        }

        let total = items.len();
        let sentiment_score = (positive_count as f64 - negative_count as f64) / total as f64;

        debug!(
            "Scored {} articles: +{} / -{} / ={} (score {:.3})",
            total, positive_count, negative_count, neutral_count, sentiment_score
        );

        SentimentSummary {
            avg_sentiment: polarity_sum / total as f64,
            sentiment_score,
            positive_count,
            negative_count,
            neutral_count,
            total_articles: total,
            trend: SentimentTrend::from_score(sentiment_score),
        }
    }

    /// Bounded weight in `[-base_weight, base_weight]` for the forecaster.
    ///
    /// Confidence grows linearly with article count and saturates at 20.
    pub fn weight_for(summary: &SentimentSummary, base_weight: f64) -> f64 {
        if summary.total_articles == 0 {
            return 0.0;
        }

        let confidence = (summary.total_articles as f64 / FULL_CONFIDENCE_ARTICLES).min(1.0);
        summary.sentiment_score * confidence * base_weight
    }
}

impl Default for SentimentAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
