pub mod config;
pub mod error;
pub mod range;
pub mod request;
pub mod result;

pub use config::{HttpMethod, LoaderConfig};
pub use error::PagelessError;
pub use range::{IndexRange, NodeId};
pub use request::FetchRequest;
pub use result::PagelessResult;
