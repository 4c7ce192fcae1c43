pub mod mock_news;
pub mod sentiment_analyzer;

pub use mock_news::MockNewsProvider;
pub use sentiment_analyzer::SentimentAnalyzer;
