pub mod config;
pub mod events;
pub mod session;
pub mod warehouse_schema;

pub use config::{AnalysisConfig, FeedConfig, JobConfig, MarketConfig, MtapConfig, StorageConfig};
pub use events::{DailyBar, Event, EventKind, RawArticle};
pub use session::{SessionId, SessionIdError};
pub use warehouse_schema::{FinancialRow, NewsRow, WAREHOUSE_DDL};
