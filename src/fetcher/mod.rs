pub mod backend;
pub mod credentials;
pub mod error;
pub mod prompt;
pub mod record_fetcher;
pub mod response;
pub mod types;

pub use error::{FetchError, FetchErrorKind};
pub use record_fetcher::{FetchOutcome, RecordFetcher};
pub use types::{ObjectClass, Record};
