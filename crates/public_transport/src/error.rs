use std::fmt;

use database::StoreError;
use model::error::ValidationError;

/// Raised by a `ScheduleReader` method: either the underlying store failed,
/// or a row it returned could not be decoded into a valid entity.
#[derive(Debug)]
pub enum ReaderError {
    Store(StoreError),
    Decode(String),
    Invalid(ValidationError),
    NotFound,
}

impl fmt::Display for ReaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(why) => write!(f, "store error: {why}"),
            Self::Decode(why) => write!(f, "could not decode row: {why}"),
            Self::Invalid(why) => write!(f, "invalid entity: {why}"),
            Self::NotFound => write!(f, "not found"),
        }
    }
}

impl std::error::Error for ReaderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(why) => Some(why),
            Self::Invalid(why) => Some(why),
            _ => None,
        }
    }
}

impl From<StoreError> for ReaderError {
    fn from(why: StoreError) -> Self {
        Self::Store(why)
    }
}

impl From<ValidationError> for ReaderError {
    fn from(why: ValidationError) -> Self {
        Self::Invalid(why)
    }
}

pub type Result<T> = std::result::Result<T, ReaderError>;
