use crate::config::{HttpMethod, LoaderConfig};
use crate::range::IndexRange;

/// A request for the rendered items of one index range.
///
/// Carries everything a transport needs; encoding it onto the wire is the
/// fetcher's concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub method: HttpMethod,
    pub start: usize,
    pub count: usize,
    pub start_param: String,
    pub count_param: String,
}

impl FetchRequest {
    pub fn new(config: &LoaderConfig, start: usize, count: usize) -> Self {
        Self {
            url: config.url.clone(),
            method: config.method,
            start,
            count,
            start_param: config.start_param_name.clone(),
            count_param: config.count_param_name.clone(),
        }
    }

    /// The requested index range.
    pub fn range(&self) -> IndexRange {
        IndexRange::from_start(self.start, self.count)
    }

    /// The two range parameters as `(name, value)` pairs.
    pub fn params(&self) -> [(&str, String); 2] {
        [
            (self.start_param.as_str(), self.start.to_string()),
            (self.count_param.as_str(), self.count.to_string()),
        ]
    }
}
