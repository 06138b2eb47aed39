//! The cryptographic primitives the recipient engine and messages call out
//! to, and a default implementation.

use alloc::vec::Vec;
use subtle::ConstantTimeEq;

use crate::{
    algorithm::Algorithm, attribute::Curve, kdf::KdfContext, key::CoseKey,
    Error, Result,
};

mod error;
mod rust_crypto;

pub use error::CryptoError;
pub use rust_crypto::RustCrypto;

/// The AES key wrap block size in bytes.
pub const KW_BLOCK: usize = 8;
/// The shortest input AES key wrap accepts, in bytes.
pub const KW_MIN_INPUT: usize = 16;

/// Provides the primitives behind the algorithms of the registry.
///
/// Implementations report failures of the underlying primitive as
/// [`Error::Crypto`]. Verification of signatures and tags returns `false`
/// rather than failing when the data doesn't check out.
pub trait CryptoBackend {
    /// Encrypts `plaintext` with an AEAD algorithm, appending the tag.
    fn encrypt(
        &self,
        alg: Algorithm,
        key: &CoseKey,
        nonce: &[u8],
        plaintext: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>>;

    /// Decrypts and authenticates `ciphertext` with an AEAD algorithm.
    fn decrypt(
        &self,
        alg: Algorithm,
        key: &CoseKey,
        nonce: &[u8],
        ciphertext: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>>;

    fn sign(&self, alg: Algorithm, key: &CoseKey, data: &[u8])
        -> Result<Vec<u8>>;

    fn verify(
        &self,
        alg: Algorithm,
        key: &CoseKey,
        data: &[u8],
        signature: &[u8],
    ) -> Result<bool>;

    /// Protects a CEK with a key wrap or key transport algorithm.
    fn key_wrap(
        &self,
        alg: Algorithm,
        kek: &CoseKey,
        data: &[u8],
    ) -> Result<Vec<u8>>;

    fn key_unwrap(
        &self,
        alg: Algorithm,
        kek: &CoseKey,
        wrapped: &[u8],
    ) -> Result<Vec<u8>>;

    /// Runs the key agreement of `alg` between our private and the peer's
    /// public key and derives `context.key_length()` bytes from the shared
    /// secret with HKDF.
    fn derive_kek(
        &self,
        alg: Algorithm,
        private: &CoseKey,
        public: &CoseKey,
        salt: Option<&[u8]>,
        context: &KdfContext,
    ) -> Result<Vec<u8>>;

    /// Generates a fresh key pair on the curve.
    fn generate_key(&self, curve: Curve) -> Result<CoseKey>;

    /// Returns `len` bytes from a cryptographically secure source.
    fn random(&self, len: usize) -> Result<Vec<u8>>;

    fn compute_hash(&self, alg: Algorithm, data: &[u8]) -> Result<Vec<u8>>;

    fn compute_tag(
        &self,
        alg: Algorithm,
        key: &CoseKey,
        data: &[u8],
    ) -> Result<Vec<u8>>;

    fn verify_tag(
        &self,
        alg: Algorithm,
        key: &CoseKey,
        data: &[u8],
        tag: &[u8],
    ) -> Result<bool> {
        let expected = self.compute_tag(alg, key, data)?;
        Ok(expected.ct_eq(tag).into())
    }
}

/// Checks the input length AES key wrap needs.
pub fn check_key_wrap_input(data: &[u8]) -> Result<()> {
    if data.len() < KW_MIN_INPUT {
        return Err(Error::ValueError("key wrap input shorter than 16 bytes"));
    }
    if data.len() % KW_BLOCK != 0 {
        return Err(Error::ValueError(
            "key wrap input not a multiple of 8 bytes",
        ));
    }

    Ok(())
}
