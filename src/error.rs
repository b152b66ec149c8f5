use thiserror::Error;

pub type Result<T> = std::result::Result<T, ZambeziError>;

#[derive(Debug, Error)]
pub enum ZambeziError {
    #[error("dictionary is full, capacity: {capacity}")]
    DictionaryFull { capacity: u32 },
    #[error("segment pool exhausted: {max_segments} segments of {segment_size} words in use")]
    PoolExhausted { max_segments: u32, segment_size: u32 },
    #[error("block of {len} words does not fit in a segment of {segment_size} words")]
    BlockTooLarge { len: usize, segment_size: u32 },
    #[error("document id {docid} is not greater than the previous document id {last}")]
    DocIdNotIncreasing { docid: u32, last: u32 },
    #[error("expected {expected} scores, got {actual}")]
    ScoreCountMismatch { expected: usize, actual: usize },
    #[error("failed to parse options: {0}")]
    ParseOptions(#[from] toml::de::Error),
    #[error("invalid options: {0}")]
    InvalidOptions(#[from] validator::ValidationErrors),
    #[error("deserialization error: {0}")]
    Deserialize(std::io::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ZambeziError {
    pub fn deserialize(e: std::io::Error) -> Self {
        ZambeziError::Deserialize(e)
    }
}

/// Shorthand for rejecting inconsistent values read back from a stream.
pub(crate) fn invalid_data(msg: impl Into<String>) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, msg.into())
}
