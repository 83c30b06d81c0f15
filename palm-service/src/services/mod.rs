pub mod metrics;
pub mod palm_reader;
pub mod providers;
pub mod store;

pub use palm_reader::{PalmReader, ReadingError};
pub use store::{AnalysisStore, MemStorage, StoreError};
