use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Failures of the pure text decoders (national ID number and MRZ).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("national ID must have 14 digits, got {found} characters")]
    InvalidLength { found: usize },
    #[error("non-numeric character at position {position}")]
    InvalidFormat { position: usize },
    #[error("invalid century digit '{0}', expected 2 or 3")]
    InvalidCentury(char),
    #[error("MRZ needs at least 2 lines, got {found}")]
    InsufficientMrzData { found: usize },
}

#[derive(Debug, Error)]
pub enum KycError {
    #[error("Image decode failure: {0}")]
    ImageDecodeFailure(String),
    #[error("Image encode failure: {0}")]
    ImageEncode(String),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("Field detector error: {0}")]
    Detector(String),
    #[error("Text recognizer error: {0}")]
    Recognizer(String),
    #[error("Stage '{stage}' timed out after {limit:?}")]
    StageTimeout { stage: &'static str, limit: Duration },
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Machine-checkable failure kind reported to callers alongside messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    InvalidLength,
    InvalidFormat,
    InvalidCentury,
    InsufficientMrzData,
    ImageDecodeFailure,
    DetectorFailure,
    RecognizerFailure,
    Timeout,
    Configuration,
    Io,
}

impl DecodeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DecodeError::InvalidLength { .. } => ErrorKind::InvalidLength,
            DecodeError::InvalidFormat { .. } => ErrorKind::InvalidFormat,
            DecodeError::InvalidCentury(_) => ErrorKind::InvalidCentury,
            DecodeError::InsufficientMrzData { .. } => ErrorKind::InsufficientMrzData,
        }
    }
}

impl KycError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            KycError::ImageDecodeFailure(_) | KycError::ImageEncode(_) => {
                ErrorKind::ImageDecodeFailure
            }
            KycError::Decode(e) => e.kind(),
            KycError::Detector(_) => ErrorKind::DetectorFailure,
            KycError::Recognizer(_) => ErrorKind::RecognizerFailure,
            KycError::StageTimeout { .. } => ErrorKind::Timeout,
            KycError::Config(_) => ErrorKind::Configuration,
            KycError::Io(_) => ErrorKind::Io,
        }
    }
}
