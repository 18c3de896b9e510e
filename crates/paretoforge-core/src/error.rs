use paretoforge_protocol::ConfigError;
use thiserror::Error;

/// Failures of the fixed-width record codec. Always recoverable: callers
/// either clip or turn the candidate into a penalized one.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    #[error("field '{field}' is not numeric: {text:?}")]
    NotNumeric { field: String, text: String },

    #[error("field '{field}' lies outside the record (length {len})")]
    OutOfRecord { field: String, len: usize },

    #[error("value {value} does not fit {width} bytes of field '{field}'")]
    Overflow {
        field: String,
        value: f64,
        width: usize,
    },

    #[error("layout '{keyword}' has {count} fields, got {got}")]
    FieldCount {
        keyword: String,
        count: usize,
        got: usize,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VariationError {
    /// `payload` is the offending text so it can still be archived and
    /// penalized by the evaluator.
    #[error("malformed genome: {reason}")]
    MalformedGenome { reason: String, payload: String },

    #[error("generative backend failed: {0}")]
    Backend(String),

    #[error("operator '{operator}' takes {expected} parents, got {got}")]
    Arity {
        operator: &'static str,
        expected: usize,
        got: usize,
    },
}

impl VariationError {
    pub fn malformed(reason: impl Into<String>, payload: impl Into<String>) -> Self {
        VariationError::MalformedGenome {
            reason: reason.into(),
            payload: payload.into(),
        }
    }

    /// Text to archive for a rejected proposal.
    pub fn payload(&self) -> &str {
        match self {
            VariationError::MalformedGenome { payload, .. } => payload,
            _ => "",
        }
    }
}

#[derive(Error, Debug)]
pub enum ForgeError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Checkpoint Corruption: {0}")]
    CheckpointCorruption(String),

    #[error("Codec Error: {0}")]
    Codec(#[from] CodecError),

    #[error("Variation Error: {0}")]
    Variation(#[from] VariationError),
}

impl From<ConfigError> for ForgeError {
    fn from(e: ConfigError) -> Self {
        ForgeError::Config(e.to_string())
    }
}

pub type ForgeResult<T> = Result<T, ForgeError>;
