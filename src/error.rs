//! The errors of the crate.

use alloc::string::String;
use core::fmt;

use crate::{cbor, crypto::CryptoError};

/// Identifies a registry entry that was looked up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Lookup {
    Id(i64),
    Name(String),
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Lookup::Id(id) => write!(f, "identifier {}", id),
            Lookup::Name(name) => write!(f, "name {:?}", name),
        }
    }
}

/// The catch-all error type for this crate.
#[derive(Debug)]
pub enum Error {
    /// Identifier or name is not in the attribute registry.
    UnknownAttribute(Lookup),
    /// Malformed or duplicate header entry, or wrong container type.
    InvalidHeader(&'static str),
    /// Missing or unsupported algorithm, or one that doesn't fit the
    /// recipient variant.
    InvalidAlgorithm(&'static str),
    /// Key is missing required fields or can't be used for the operation.
    InvalidKey(&'static str),
    /// Key belongs to the wrong family for the operation.
    InvalidKeyType(&'static str),
    /// Key parameter has the wrong shape.
    InvalidKeyFormat(&'static str),
    /// Structural violation, e.g. a missing peer key.
    InvalidMessage(&'static str),
    /// Structure doesn't have the shape a recipient class requires.
    MalformedMessage(&'static str),
    /// Set of recipients violates the single-recipient rules.
    InvalidRecipientConfiguration(&'static str),
    /// Value of the critical header is rejected.
    InvalidCriticalValue,
    /// Value of the content type header is rejected.
    InvalidContentType,
    /// Value of a byte string header is rejected.
    InvalidKidValue,
    /// Generic precondition failure.
    ValueError(&'static str),
    /// Operation has no behavior for this variant in its current state.
    NotImplemented(&'static str),
    /// Wraps errors from the `cbor` module.
    Cbor(cbor::CborError),
    /// Wraps errors from the crypto backend.
    Crypto(CryptoError),
}

impl From<cbor::CborError> for Error {
    fn from(e: cbor::CborError) -> Error {
        Error::Cbor(e)
    }
}

impl From<CryptoError> for Error {
    fn from(e: CryptoError) -> Error {
        Error::Crypto(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::UnknownAttribute(l) => write!(f, "Unknown attribute: {}", l),
            Error::InvalidHeader(s) => write!(f, "Invalid header: {}", s),
            Error::InvalidAlgorithm(s) => write!(f, "Invalid algorithm: {}", s),
            Error::InvalidKey(s) => write!(f, "Invalid key: {}", s),
            Error::InvalidKeyType(s) => write!(f, "Invalid key type: {}", s),
            Error::InvalidKeyFormat(s) => {
                write!(f, "Invalid key format: {}", s)
            }
            Error::InvalidMessage(s) => write!(f, "Invalid message: {}", s),
            Error::MalformedMessage(s) => {
                write!(f, "Malformed message: {}", s)
            }
            Error::InvalidRecipientConfiguration(s) => {
                write!(f, "Invalid recipient configuration: {}", s)
            }
            Error::InvalidCriticalValue => {
                write!(f, "Critical header must be a non-empty array of labels")
            }
            Error::InvalidContentType => write!(
                f,
                "Content type must be an unsigned integer or a text string"
            ),
            Error::InvalidKidValue => {
                write!(f, "Header value must be a byte string")
            }
            Error::ValueError(s) => write!(f, "Value error: {}", s),
            Error::NotImplemented(s) => write!(f, "Not implemented: {}", s),
            Error::Cbor(e) => e.fmt(f),
            Error::Crypto(e) => e.fmt(f),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Cbor(e) => Some(e),
            Error::Crypto(e) => Some(e),
            // Other errors don't wrap anything
            _ => None,
        }
    }
}
