pub mod document;
pub mod source;

pub use document::{MemoryDocument, NodeKind, NodeSnapshot};
pub use source::RangeSource;
