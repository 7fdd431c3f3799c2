pub mod blob;
pub mod error;
pub mod warehouse;

pub use blob::BlobStore;
pub use error::StoreError;
pub use warehouse::{
    AnomalyRow, AnomalyUpdate, PriceChangeRow, ReportArticleRow, SentimentCounts, SentimentUpdate,
    UnscoredArticle, Warehouse,
};
