use crate::error::PagelessError;

pub type PagelessResult<T> = Result<T, PagelessError>;
