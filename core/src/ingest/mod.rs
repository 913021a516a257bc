pub mod feed;
pub mod index;

pub use feed::{FeedIngestor, IngestReport, documents_from_feed};
pub use index::index_report;
