//! Ingestion failure classification

use std::fmt;

use crate::{ErrorMetadata, VaultError};

/// Wraps an ingestion failure with a recoverability flag so the consumer can
/// decide between queue redelivery and failing the file record outright.
#[derive(Debug)]
pub struct IngestError {
    source: anyhow::Error,
    recoverable: bool,
}

impl IngestError {
    pub fn recoverable(source: anyhow::Error) -> Self {
        Self {
            source,
            recoverable: true,
        }
    }

    pub fn unrecoverable(source: anyhow::Error) -> Self {
        Self {
            source,
            recoverable: false,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        self.recoverable
    }

    /// Full cause chain in one line, for capturing into `error_detail`.
    pub fn detail(&self) -> String {
        format!("{:#}", self.source)
    }
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl std::error::Error for IngestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

/// Classification follows the error taxonomy: storage and internal failures
/// are worth redelivering, validation and crypto failures are not.
impl From<VaultError> for IngestError {
    fn from(err: VaultError) -> Self {
        let recoverable = err.is_recoverable();
        Self {
            source: anyhow::Error::from(err),
            recoverable,
        }
    }
}

pub trait IngestResultExt<T> {
    /// Mark the error as worth redelivering.
    fn recoverable(self) -> Result<T, IngestError>;

    /// Mark the error as fatal for this file.
    fn unrecoverable(self) -> Result<T, IngestError>;
}

impl<T, E> IngestResultExt<T> for Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn recoverable(self) -> Result<T, IngestError> {
        self.map_err(|e| IngestError::recoverable(e.into()))
    }

    fn unrecoverable(self) -> Result<T, IngestError> {
        self.map_err(|e| IngestError::unrecoverable(e.into()))
    }
}
