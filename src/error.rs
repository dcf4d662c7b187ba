use thiserror::Error;

/// Everything the pipeline itself can get wrong. Upstream service errors
/// (auth, throttling, unknown log group) are not translated; they come out
/// of the SDK and propagate as-is.
#[derive(Debug, Error)]
pub enum CjlError {
    /// Time expression does not match the relative grammar `<N><m|h|d>`.
    #[error("unsupported time expression: '{0}' (expected eg. 30m, 6h, 2d)")]
    UnsupportedTime(String),

    /// Event message body could not be decoded as a JSON object.
    #[error("message decode failed: {reason}: {preview}")]
    Decode { preview: String, reason: String },

    /// A timestamp value could not be interpreted.
    #[error("cannot interpret timestamp: {0}")]
    BadTimestamp(String),

    /// A required field was absent from an event.
    #[error("required field missing: {0}")]
    KeyMissing(&'static str),
}
