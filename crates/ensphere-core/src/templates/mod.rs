//! Application template retrieval

pub mod fetcher;

pub use fetcher::{ArchiveFetcher, ArchiveSource};
