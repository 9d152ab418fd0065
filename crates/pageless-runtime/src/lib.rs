pub mod http;
pub mod loader;
pub mod memory;
pub mod task;
pub mod traits;

pub use http::HttpSource;
pub use loader::{LoadEvent, LoaderSnapshot, RangeLoader};
pub use memory::{MemoryDocument, NodeKind, NodeSnapshot, RangeSource};
pub use task::DebouncedTask;
pub use traits::{Content, Fetcher, Layout, ScrollEvent};
