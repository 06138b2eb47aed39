//! The COSE messages built from headers, keys and recipients.

use alloc::vec::Vec;
use serde_bytes::Bytes;

use crate::{
    algorithm::{Algorithm, Family},
    attribute::HeaderAttribute,
    cbor::{self, Value},
    crypto::CryptoBackend,
    header::Headers,
    key::CoseKey,
    Error, Result,
};

mod encrypt;
mod mac;
mod sign;

pub use encrypt::{Encrypt, Encrypt0};
pub use mac::Mac0;
pub use sign::Sign1;

/// Returns the `Enc_structure` used as associated data in the AEAD.
pub fn enc_structure(
    context: &str,
    protected: &[u8],
    external_aad: &[u8],
) -> Result<Vec<u8>> {
    Ok(cbor::encode((
        context,
        Bytes::new(protected),
        Bytes::new(external_aad),
    ))?)
}

/// Returns the `MAC_structure` the tag of a `COSE_Mac0` is computed over.
pub fn mac_structure(
    protected: &[u8],
    external_aad: &[u8],
    payload: &[u8],
) -> Result<Vec<u8>> {
    Ok(cbor::encode((
        "MAC0",
        Bytes::new(protected),
        Bytes::new(external_aad),
        Bytes::new(payload),
    ))?)
}

/// Returns the `Sig_structure` a `COSE_Sign1` signature is made on.
pub fn sig_structure(
    protected: &[u8],
    external_aad: &[u8],
    payload: &[u8],
) -> Result<Vec<u8>> {
    Ok(cbor::encode((
        "Signature1",
        Bytes::new(protected),
        Bytes::new(external_aad),
        Bytes::new(payload),
    ))?)
}

/// Returns the AEAD nonce for the headers.
///
/// A full IV is used as it is. A Partial IV is left-padded with zeros to the
/// nonce length and XORed with the key's base IV.
pub fn compute_nonce(
    headers: &Headers,
    key: &CoseKey,
    alg: Algorithm,
) -> Result<Vec<u8>> {
    let len = alg
        .nonce_length()
        .ok_or(Error::InvalidAlgorithm("algorithm doesn't take a nonce"))?;
    let iv = headers.get(HeaderAttribute::Iv);
    let piv = headers.get(HeaderAttribute::PartialIv);
    match (iv.and_then(Value::as_bytes), piv.and_then(Value::as_bytes)) {
        (Some(_), Some(_)) => {
            Err(Error::InvalidHeader("both IV and Partial IV are present"))
        }
        (Some(iv), None) if iv.len() == len => Ok(iv.to_vec()),
        (Some(_), None) => {
            Err(Error::InvalidHeader("IV length doesn't fit the algorithm"))
        }
        (None, Some(piv)) => {
            let base_iv = key
                .base_iv()
                .ok_or(Error::InvalidKey("key has no base IV"))?;
            if base_iv.len() != len {
                return Err(Error::InvalidKey(
                    "base IV length doesn't fit the algorithm",
                ));
            }
            if piv.len() > len {
                return Err(Error::InvalidHeader("Partial IV is too long"));
            }
            let mut nonce = vec![0; len];
            nonce[len - piv.len()..].copy_from_slice(piv);
            for (b1, b2) in nonce.iter_mut().zip(base_iv.iter()) {
                *b1 ^= b2;
            }
            Ok(nonce)
        }
        (None, None) => Err(Error::InvalidHeader("no IV in the headers")),
    }
}

/// Puts a fresh random IV into the unprotected header unless there is an IV
/// or Partial IV already.
fn ensure_iv<B: CryptoBackend>(
    headers: &mut Headers,
    alg: Algorithm,
    backend: &B,
) -> Result<()> {
    if headers.contains(HeaderAttribute::Iv)
        || headers.contains(HeaderAttribute::PartialIv)
    {
        return Ok(());
    }
    let len = alg
        .nonce_length()
        .ok_or(Error::InvalidAlgorithm("algorithm doesn't take a nonce"))?;
    let iv = backend.random(len)?;
    headers.set_unprotected(HeaderAttribute::Iv, Value::Bytes(iv))
}

/// Returns the algorithm of the headers if it belongs to the family.
fn algorithm_of(headers: &Headers, family: Family) -> Result<Algorithm> {
    let alg = headers.algorithm()?;
    if alg.family() != family {
        return Err(Error::InvalidAlgorithm(
            "algorithm doesn't fit the message type",
        ));
    }

    Ok(alg)
}

/// Returns the items of a message array, checking the tag if there is one.
fn decode_items(bytes: &[u8], tag: u64, len: usize) -> Result<Vec<Value>> {
    let (found, item) = cbor::untag(bytes)?;
    if found.map_or(false, |found| found != tag) {
        return Err(Error::InvalidMessage("unexpected message tag"));
    }
    log::trace!("Decoding message with tag {}", tag);
    match cbor::decode(item)? {
        Value::Array(items) if items.len() == len => Ok(items),
        _ => Err(Error::InvalidMessage("message has the wrong structure")),
    }
}

/// Returns the headers from the first two items of a message.
fn decode_headers(items: &[Value]) -> Result<Headers> {
    let protected = items[0].as_bytes().ok_or(Error::InvalidMessage(
        "protected header is not a byte string",
    ))?;
    Headers::from_parts(protected, &items[1])
}

fn decode_bytes(item: &Value) -> Result<Vec<u8>> {
    item.as_bytes()
        .map(<[u8]>::to_vec)
        .ok_or(Error::InvalidMessage("expected a byte string"))
}

/// Returns the tagged encoding of the message items.
fn encode_items(tag: u64, items: Vec<Value>) -> Result<Vec<u8>> {
    let bytes = cbor::encode(Value::Array(items))?;
    Ok(cbor::tag(tag, &bytes))
}
