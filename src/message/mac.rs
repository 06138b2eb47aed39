use alloc::vec::Vec;

use super::{
    algorithm_of, decode_bytes, decode_headers, decode_items, encode_items,
    mac_structure,
};
use crate::{
    algorithm::Family,
    attribute::{KeyOp, KeyType},
    cbor::{Value, TAG_MAC0},
    crypto::CryptoBackend,
    header::Headers,
    key::CoseKey,
    Error, Result,
};

/// A `COSE_Mac0` message, authenticated with a key the receiver already
/// has.
#[derive(Clone, Debug, PartialEq)]
pub struct Mac0 {
    headers: Headers,
    payload: Vec<u8>,
    tag: Vec<u8>,
}

impl Mac0 {
    /// Computes the tag over the payload with the MAC algorithm in the
    /// headers.
    pub fn create<B: CryptoBackend>(
        headers: Headers,
        key: &CoseKey,
        payload: &[u8],
        external_aad: &[u8],
        backend: &B,
    ) -> Result<Mac0> {
        let alg = algorithm_of(&headers, Family::Mac)?;
        key.verify(KeyType::Symmetric, Some(alg), &[KeyOp::MacCreate])?;
        let to_be_maced = mac_structure(
            &headers.serialize_protected()?,
            external_aad,
            payload,
        )?;
        let tag = backend.compute_tag(alg, key, &to_be_maced)?;

        Ok(Mac0 {
            headers,
            payload: payload.to_vec(),
            tag,
        })
    }

    /// Checks the tag, failing with [`Error::InvalidMessage`] if it doesn't
    /// match.
    pub fn verify<B: CryptoBackend>(
        &self,
        key: &CoseKey,
        external_aad: &[u8],
        backend: &B,
    ) -> Result<()> {
        let alg = algorithm_of(&self.headers, Family::Mac)?;
        key.verify(KeyType::Symmetric, Some(alg), &[KeyOp::MacVerify])?;
        let to_be_maced = mac_structure(
            &self.headers.serialize_protected()?,
            external_aad,
            &self.payload,
        )?;
        if backend.verify_tag(alg, key, &to_be_maced, &self.tag)? {
            Ok(())
        } else {
            Err(Error::InvalidMessage("tag doesn't match"))
        }
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn tag(&self) -> &[u8] {
        &self.tag
    }

    /// Returns the tagged CBOR encoding of the message.
    pub fn encode(&self) -> Result<Vec<u8>> {
        encode_items(
            TAG_MAC0,
            vec![
                Value::Bytes(self.headers.serialize_protected()?),
                self.headers.unprotected_value(),
                Value::Bytes(self.payload.clone()),
                Value::Bytes(self.tag.clone()),
            ],
        )
    }

    /// Decodes a message, with or without its tag.
    pub fn decode(bytes: &[u8]) -> Result<Mac0> {
        let items = decode_items(bytes, TAG_MAC0, 4)?;

        Ok(Mac0 {
            headers: decode_headers(&items)?,
            payload: decode_bytes(&items[2])?,
            tag: decode_bytes(&items[3])?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        algorithm::Algorithm, attribute::HeaderAttribute, crypto::RustCrypto,
    };

    const KEY: [u8; 32] = [0x0B; 32];
    const PAYLOAD: &[u8] = b"This is the content.";

    fn headers(alg: Algorithm) -> Headers {
        let mut headers = Headers::new();
        headers
            .set_protected(HeaderAttribute::Algorithm, alg.to_value())
            .unwrap();
        headers
    }

    #[test]
    fn create_and_verify() {
        let key = CoseKey::symmetric(&KEY);
        for (alg, len) in [(Algorithm::Hmac256_64, 8), (Algorithm::Hmac256, 32)]
        {
            let message =
                Mac0::create(headers(alg), &key, PAYLOAD, &[], &RustCrypto)
                    .unwrap();
            assert_eq!(len, message.tag().len());

            let bytes = message.encode().unwrap();
            assert_eq!(0xD1, bytes[0]);
            let decoded = Mac0::decode(&bytes).unwrap();
            assert_eq!(message, decoded);
            assert!(decoded.verify(&key, &[], &RustCrypto).is_ok());
            assert!(matches!(
                decoded.verify(&key, b"aad", &RustCrypto),
                Err(Error::InvalidMessage(_))
            ));
            assert!(matches!(
                decoded.verify(&CoseKey::symmetric(&[0; 32]), &[], &RustCrypto),
                Err(Error::InvalidMessage(_))
            ));
        }
    }

    #[test]
    fn key_restrictions() {
        let mut key = CoseKey::symmetric(&KEY);
        key.set_key_ops(&[KeyOp::MacVerify]).unwrap();
        assert!(matches!(
            Mac0::create(
                headers(Algorithm::Hmac256),
                &key,
                PAYLOAD,
                &[],
                &RustCrypto
            ),
            Err(Error::InvalidKey(_))
        ));
        assert!(matches!(
            Mac0::create(
                headers(Algorithm::A128Gcm),
                &CoseKey::symmetric(&KEY),
                PAYLOAD,
                &[],
                &RustCrypto
            ),
            Err(Error::InvalidAlgorithm(_))
        ));
    }
}
