use core::fmt;
#[cfg(feature = "std")]
use std::error;

use crate::{algorithm::Algorithm, attribute::Curve};

/// The error type for the cryptographic primitives, mostly just wrapping
/// errors from various libraries.
#[derive(Debug)]
pub enum CryptoError {
    /// Wraps errors from `hkdf`.
    Hkdf(hkdf::InvalidLength),
    /// Wraps errors from `aes_kw`, including failed integrity checks.
    KeyWrap(aes_kw::Error),
    /// Error in `aes_gcm` or `ccm`, including failed authentication.
    Aead,
    /// Wraps errors from `rsa`.
    Rsa(rsa::Error),
    /// Point or scalar is not valid for the curve.
    EllipticCurve,
    /// Malformed signature or signing key.
    Signature,
    /// Key has the wrong length for the algorithm.
    InvalidKeyLength,
    /// The backend has no implementation for the algorithm.
    UnsupportedAlgorithm(Algorithm),
    /// The backend has no implementation for the curve.
    UnsupportedCurve(Curve),
    /// The random number generator failed.
    Random,
}

impl From<hkdf::InvalidLength> for CryptoError {
    fn from(e: hkdf::InvalidLength) -> CryptoError {
        CryptoError::Hkdf(e)
    }
}

impl From<aes_kw::Error> for CryptoError {
    fn from(e: aes_kw::Error) -> CryptoError {
        CryptoError::KeyWrap(e)
    }
}

impl From<aes_gcm::aead::Error> for CryptoError {
    fn from(_: aes_gcm::aead::Error) -> CryptoError {
        CryptoError::Aead
    }
}

impl From<rsa::Error> for CryptoError {
    fn from(e: rsa::Error) -> CryptoError {
        CryptoError::Rsa(e)
    }
}

impl From<p256::elliptic_curve::Error> for CryptoError {
    fn from(_: p256::elliptic_curve::Error) -> CryptoError {
        CryptoError::EllipticCurve
    }
}

// Library errors convert into the crate error as `Error::Crypto`
macro_rules! through_crypto_error {
    ($($source:ty),+) => {
        $(
            impl From<$source> for crate::Error {
                fn from(e: $source) -> crate::Error {
                    crate::Error::Crypto(e.into())
                }
            }
        )+
    };
}

through_crypto_error!(
    hkdf::InvalidLength,
    aes_kw::Error,
    aes_gcm::aead::Error,
    rsa::Error,
    p256::elliptic_curve::Error
);

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CryptoError::Hkdf(e) => e.fmt(f),
            CryptoError::KeyWrap(e) => write!(f, "Error using AES-KW: {}", e),
            CryptoError::Aead => write!(f, "Error using AEAD"),
            CryptoError::Rsa(e) => write!(f, "Error using RSA: {}", e),
            CryptoError::EllipticCurve => {
                write!(f, "Invalid elliptic curve point or scalar")
            }
            CryptoError::Signature => write!(f, "Error processing signature"),
            CryptoError::InvalidKeyLength => {
                write!(f, "Key length doesn't fit the algorithm")
            }
            CryptoError::UnsupportedAlgorithm(alg) => {
                write!(f, "Algorithm {} is not supported", alg)
            }
            CryptoError::UnsupportedCurve(crv) => {
                write!(f, "Curve {} is not supported", crv)
            }
            CryptoError::Random => write!(f, "Random number generator failed"),
        }
    }
}

#[cfg(feature = "std")]
impl error::Error for CryptoError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        None
    }
}
