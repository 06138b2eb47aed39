use core::fmt;

/// The error type for the `cbor` module.
#[derive(Debug)]
pub enum CborError {
    /// Wraps errors from `serde_cbor`.
    SerdeCbor(serde_cbor::Error),
    /// Input ended in the middle of a data item.
    Truncated,
    /// A tag with an unsupported additional information value.
    InvalidTag,
}

impl From<serde_cbor::Error> for CborError {
    fn from(e: serde_cbor::Error) -> CborError {
        CborError::SerdeCbor(e)
    }
}

impl fmt::Display for CborError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CborError::SerdeCbor(e) => write!(f, "CBOR error: {}", e),
            CborError::Truncated => {
                write!(f, "CBOR error: input ended in the middle of an item")
            }
            CborError::InvalidTag => {
                write!(f, "CBOR error: malformed tag")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CborError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CborError::SerdeCbor(e) => Some(e),
            _ => None,
        }
    }
}
