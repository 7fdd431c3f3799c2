pub mod clean;
pub mod error;
pub mod financial_data;
pub mod news_scraper;
pub mod processor;
pub mod report;
pub mod sentiment;
pub mod sources;
pub mod trend;

pub mod test_support;

pub use error::AgentError;
pub use financial_data::FinancialDataAgent;
pub use news_scraper::NewsScraperAgent;
pub use processor::DataProcessorAgent;
pub use report::ReportGenerationAgent;
pub use sentiment::SentimentAnalyzer;
pub use sources::{
    AlphaVantageProvider, FeedEntry, MarketDataProvider, NewsFeedSource, RssFeedSource,
};
pub use trend::TrendIdentificationAgent;
