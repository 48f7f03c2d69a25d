use thiserror::Error;

/// One failed item of a bulk operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkFailure {
    pub id: String,
    pub reason: String,
}

#[derive(Error, Debug)]
pub enum QuireError {
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Front matter error: {0}")]
    FrontMatter(#[from] serde_yaml::Error),

    #[error("Unavailable: {0}")]
    Unavailable(String),

    #[error("{} of {} deletions failed", .failures.len(), .failures.len() + .deleted.len())]
    PartialBulkFailure {
        deleted: Vec<String>,
        failures: Vec<BulkFailure>,
    },

    #[error("Unsupported image type: {0}")]
    UnsupportedImage(String),

    #[error("Invalid setting: {0}")]
    InvalidSetting(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Api Error: {0}")]
    Api(String),
}

/// Coarse failure classes shown to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidRecord,
    NotFound,
    IoFailure,
    Unavailable,
    PartialBulkFailure,
}

impl QuireError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QuireError::InvalidRecord(_)
            | QuireError::UnsupportedImage(_)
            | QuireError::InvalidSetting(_)
            | QuireError::Api(_) => ErrorKind::InvalidRecord,
            QuireError::NotFound(_) => ErrorKind::NotFound,
            QuireError::Io(_)
            | QuireError::Serialization(_)
            | QuireError::FrontMatter(_)
            | QuireError::Store(_) => ErrorKind::IoFailure,
            QuireError::Unavailable(_) => ErrorKind::Unavailable,
            QuireError::PartialBulkFailure { .. } => ErrorKind::PartialBulkFailure,
        }
    }
}

pub type Result<T> = std::result::Result<T, QuireError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_failure_message_counts_items() {
        let err = QuireError::PartialBulkFailure {
            deleted: vec!["a".into(), "b".into()],
            failures: vec![BulkFailure {
                id: "c".into(),
                reason: "boom".into(),
            }],
        };
        assert_eq!(err.to_string(), "1 of 3 deletions failed");
        assert_eq!(err.kind(), ErrorKind::PartialBulkFailure);
    }

    #[test]
    fn io_errors_map_to_io_failure() {
        let err: QuireError = std::io::Error::other("disk gone").into();
        assert_eq!(err.kind(), ErrorKind::IoFailure);
    }
}
