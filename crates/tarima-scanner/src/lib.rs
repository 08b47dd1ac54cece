pub mod cache;
pub mod config;
pub mod listing;
pub mod scanner;

pub use cache::DirectoryCache;
pub use config::ScannerConfig;
pub use listing::{PagedRequest, PagedResult, PropertyFilter, ResultFilter, SortDirection, SortKey};
pub use scanner::{AlbumEntry, AlbumScanner, ScannerError};
