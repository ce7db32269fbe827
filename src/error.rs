use std::io;

use thiserror::Error;

use crate::format::FourCC;

/// Errors reported to the owner of the simulated hardware
#[derive(Error, Debug)]
pub enum Error {
    #[error("Insufficient resources: {what}")]
    ResourceExhausted { what: &'static str },

    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("Hardware resources are already acquired")]
    SharingViolation,

    #[error("Hardware resources have not been acquired")]
    NotAcquired,

    #[error("Unsupported pixel format: {0}")]
    UnsupportedFormat(FourCC),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Error::InvalidArgument {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
