//! Engine errors and the stable codes surfaced to clients.

use meridian_storage::StoreError;
use thiserror::Error;

use crate::rational::RatError;

/// Stable numeric codes at the transaction boundary.
///
/// Codes are part of the client contract and must never be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Code {
    Ok = 0,
    InvalidInput = 101,
    InvalidBond = 102,
    CandidateEmpty = 103,
    BadDelegatorAddr = 104,
    BadCandidateAddr = 105,
    BadShares = 106,
    InsufficientShares = 107,
    Unauthorized = 108,
    /// Internal failure classes; a client retry cannot help.
    Internal = 500,
}

#[allow(missing_docs)]
#[derive(Error, Debug)]
pub enum Error {
    // Validation errors: malformed input, nothing mutated.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("bond amount must be a positive amount of the bond denomination")]
    InvalidBond,
    #[error("candidate does not exist for that address")]
    CandidateEmpty,
    #[error("delegator address is missing or unknown")]
    BadDelegatorAddr,
    #[error("candidate address is missing or unknown")]
    BadCandidateAddr,
    #[error("shares must be the literal MAX or a positive decimal")]
    BadShares,
    #[error("cannot unbond more shares than are held")]
    InsufficientShares,
    #[error("unauthorized")]
    Unauthorized,

    // Parameter errors: rejected at genesis load.
    #[error("invalid chain parameters: {0}")]
    InvalidParams(String),

    // Internal categories. An invariant violation means the block must
    // abort and consensus halt; it is unreachable on well-formed input.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("encoding error: {0}")]
    Encoding(String),
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

/// Engine functions result
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// The stable boundary code for this error.
    pub fn code(&self) -> Code {
        match self {
            Error::InvalidInput(_) => Code::InvalidInput,
            Error::InvalidBond => Code::InvalidBond,
            Error::CandidateEmpty => Code::CandidateEmpty,
            Error::BadDelegatorAddr => Code::BadDelegatorAddr,
            Error::BadCandidateAddr => Code::BadCandidateAddr,
            Error::BadShares => Code::BadShares,
            Error::InsufficientShares => Code::InsufficientShares,
            Error::Unauthorized => Code::Unauthorized,
            Error::InvalidParams(_)
            | Error::Store(_)
            | Error::Encoding(_)
            | Error::InvariantViolation(_) => Code::Internal,
        }
    }

    /// Whether the host must halt consensus instead of reporting the
    /// error to the client.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::InvariantViolation(_) | Error::Store(_))
    }
}

impl From<RatError> for Error {
    fn from(err: RatError) -> Self {
        // Rational faults inside pool math are bugs, not user errors.
        Error::InvariantViolation(err.to_string())
    }
}
