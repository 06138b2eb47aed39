//! The key management layer of
//! [COSE](https://tools.ietf.org/html/rfc8152) messages, intended to be
//! usable on embedded devices.
//!
//! The core is the recipient engine: the tree of `COSE_recipient`
//! structures attached to a message, and the computation of the content key
//! through direct encryption, direct key agreement, key agreement with key
//! wrap and key wrap. Around it are the registries of header attributes,
//! algorithms and key parameters, a header container that caches its
//! protected serialization, the `COSE_KDF_Context` builder and `COSE_Key`.
//! The `COSE_Encrypt`, `COSE_Encrypt0`, `COSE_Mac0` and `COSE_Sign1`
//! messages are built on top of these.
//!
//! The cryptographic primitives are behind the [`crypto::CryptoBackend`]
//! trait, with [`crypto::RustCrypto`] as the implementation using the
//! RustCrypto and dalek crates.
//!
//! ## Security
//! This should **not currently be used in production code**, use at your own
//! risk.

#![cfg_attr(not(feature = "std"), no_std)]
#[macro_use]
extern crate alloc;

#[macro_use]
pub mod attribute;

pub mod algorithm;
// Unusual byte groupings are used for consistency with RFC.
#[allow(clippy::unusual_byte_groupings)]
pub mod cbor;
pub mod crypto;
mod error;
pub mod header;
pub mod kdf;
pub mod key;
pub mod message;
pub mod recipient;

pub use error::{Error, Lookup};

/// The result type of this crate.
pub type Result<T> = core::result::Result<T, Error>;
