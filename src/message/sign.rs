use alloc::vec::Vec;

use super::{
    algorithm_of, decode_bytes, decode_headers, decode_items, encode_items,
    sig_structure,
};
use crate::{
    algorithm::Family,
    attribute::KeyOp,
    cbor::{Value, TAG_SIGN1},
    crypto::CryptoBackend,
    header::Headers,
    key::CoseKey,
    Error, Result,
};

/// A `COSE_Sign1` message with a single signature.
#[derive(Clone, Debug, PartialEq)]
pub struct Sign1 {
    headers: Headers,
    payload: Vec<u8>,
    signature: Vec<u8>,
}

impl Sign1 {
    /// Signs the payload with the signature algorithm in the headers.
    pub fn sign<B: CryptoBackend>(
        headers: Headers,
        key: &CoseKey,
        payload: &[u8],
        external_aad: &[u8],
        backend: &B,
    ) -> Result<Sign1> {
        let alg = algorithm_of(&headers, Family::Signature)?;
        key.verify(key.kty(), Some(alg), &[KeyOp::Sign])?;
        let to_be_signed = sig_structure(
            &headers.serialize_protected()?,
            external_aad,
            payload,
        )?;
        let signature = backend.sign(alg, key, &to_be_signed)?;

        Ok(Sign1 {
            headers,
            payload: payload.to_vec(),
            signature,
        })
    }

    /// Checks the signature with the signer's public key, failing with
    /// [`Error::InvalidMessage`] if it was not made on this message.
    pub fn verify<B: CryptoBackend>(
        &self,
        key: &CoseKey,
        external_aad: &[u8],
        backend: &B,
    ) -> Result<()> {
        let alg = algorithm_of(&self.headers, Family::Signature)?;
        key.verify(key.kty(), Some(alg), &[KeyOp::Verify])?;
        let to_be_signed = sig_structure(
            &self.headers.serialize_protected()?,
            external_aad,
            &self.payload,
        )?;
        if backend.verify(alg, key, &to_be_signed, &self.signature)? {
            Ok(())
        } else {
            Err(Error::InvalidMessage("signature doesn't verify"))
        }
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Returns the tagged CBOR encoding of the message.
    pub fn encode(&self) -> Result<Vec<u8>> {
        encode_items(
            TAG_SIGN1,
            vec![
                Value::Bytes(self.headers.serialize_protected()?),
                self.headers.unprotected_value(),
                Value::Bytes(self.payload.clone()),
                Value::Bytes(self.signature.clone()),
            ],
        )
    }

    /// Decodes a message, with or without its tag.
    pub fn decode(bytes: &[u8]) -> Result<Sign1> {
        let items = decode_items(bytes, TAG_SIGN1, 4)?;

        Ok(Sign1 {
            headers: decode_headers(&items)?,
            payload: decode_bytes(&items[2])?,
            signature: decode_bytes(&items[3])?,
        })
    }
}
