use thiserror::Error;

/// Errors originating from the audio module.
#[derive(Error, Debug)]
pub enum AudioError {
    /// The file could not be opened or read.
    #[error("Cannot read audio file: {0}")]
    Io(#[from] std::io::Error),

    /// Container or codec not handled by the decoder.
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// The container has no default audio track.
    #[error("No default audio track found")]
    NoAudioTrack,

    /// Audio decode error.
    #[error("Decode error: {0}")]
    DecodeError(String),

    /// Decoding finished without producing a single sample.
    #[error("File decoded to zero samples")]
    Empty,
}
