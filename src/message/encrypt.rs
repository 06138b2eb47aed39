use alloc::vec::Vec;

use super::{
    algorithm_of, compute_nonce, decode_bytes, decode_headers, decode_items,
    enc_structure, encode_items, ensure_iv,
};
use crate::{
    algorithm::Family,
    attribute::{KeyOp, KeyType},
    cbor::{Value, TAG_ENCRYPT, TAG_ENCRYPT0},
    crypto::CryptoBackend,
    header::Headers,
    key::CoseKey,
    recipient::{Context, RecipientId, Recipients},
    Result,
};

/// A `COSE_Encrypt0` message, encrypted with a key the receiver already
/// has.
#[derive(Clone, Debug, PartialEq)]
pub struct Encrypt0 {
    headers: Headers,
    ciphertext: Vec<u8>,
}

impl Encrypt0 {
    /// Encrypts the plaintext with the AEAD algorithm in the headers.
    ///
    /// A random IV is added to the unprotected header if there is neither an
    /// IV nor a Partial IV.
    pub fn encrypt<B: CryptoBackend>(
        mut headers: Headers,
        key: &CoseKey,
        plaintext: &[u8],
        external_aad: &[u8],
        backend: &B,
    ) -> Result<Encrypt0> {
        let alg = algorithm_of(&headers, Family::Aead)?;
        key.verify(KeyType::Symmetric, Some(alg), &[KeyOp::Encrypt])?;
        ensure_iv(&mut headers, alg, backend)?;
        let nonce = compute_nonce(&headers, key, alg)?;
        let aad = enc_structure(
            "Encrypt0",
            &headers.serialize_protected()?,
            external_aad,
        )?;
        let ciphertext = backend.encrypt(alg, key, &nonce, plaintext, &aad)?;

        Ok(Encrypt0 {
            headers,
            ciphertext,
        })
    }

    /// Decrypts and authenticates the ciphertext.
    pub fn decrypt<B: CryptoBackend>(
        &self,
        key: &CoseKey,
        external_aad: &[u8],
        backend: &B,
    ) -> Result<Vec<u8>> {
        let alg = algorithm_of(&self.headers, Family::Aead)?;
        key.verify(KeyType::Symmetric, Some(alg), &[KeyOp::Decrypt])?;
        let nonce = compute_nonce(&self.headers, key, alg)?;
        let aad = enc_structure(
            "Encrypt0",
            &self.headers.serialize_protected()?,
            external_aad,
        )?;

        backend.decrypt(alg, key, &nonce, &self.ciphertext, &aad)
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Returns the tagged CBOR encoding of the message.
    pub fn encode(&self) -> Result<Vec<u8>> {
        encode_items(
            TAG_ENCRYPT0,
            vec![
                Value::Bytes(self.headers.serialize_protected()?),
                self.headers.unprotected_value(),
                Value::Bytes(self.ciphertext.clone()),
            ],
        )
    }

    /// Decodes a message, with or without its tag.
    pub fn decode(bytes: &[u8]) -> Result<Encrypt0> {
        let items = decode_items(bytes, TAG_ENCRYPT0, 3)?;

        Ok(Encrypt0 {
            headers: decode_headers(&items)?,
            ciphertext: decode_bytes(&items[2])?,
        })
    }
}

/// A `COSE_Encrypt` message, whose content key is established through its
/// recipients.
#[derive(Clone, Debug)]
pub struct Encrypt {
    headers: Headers,
    ciphertext: Vec<u8>,
    recipients: Recipients,
}

impl Encrypt {
    /// Establishes a CEK through the recipients and encrypts the plaintext
    /// with it.
    pub fn seal<B: CryptoBackend>(
        mut headers: Headers,
        mut recipients: Recipients,
        plaintext: &[u8],
        external_aad: &[u8],
        backend: &B,
    ) -> Result<Encrypt> {
        let alg = algorithm_of(&headers, Family::Aead)?;
        let cek = recipients.establish_cek(alg, backend)?;
        ensure_iv(&mut headers, alg, backend)?;
        let nonce = compute_nonce(&headers, &cek, alg)?;
        let aad = enc_structure(
            "Encrypt",
            &headers.serialize_protected()?,
            external_aad,
        )?;
        let ciphertext = backend.encrypt(alg, &cek, &nonce, plaintext, &aad)?;
        log::debug!(
            "Sealed message for {} recipients",
            recipients.top_level().len()
        );

        Ok(Encrypt {
            headers,
            ciphertext,
            recipients,
        })
    }

    /// Recovers the CEK through the top level recipient and decrypts the
    /// ciphertext with it.
    ///
    /// The receiver's keys have to be set on the recipient, or on the nested
    /// recipient that establishes its KEK, before.
    pub fn open<B: CryptoBackend>(
        &mut self,
        id: RecipientId,
        external_aad: &[u8],
        backend: &B,
    ) -> Result<Vec<u8>> {
        let alg = algorithm_of(&self.headers, Family::Aead)?;
        let cek = self.recipients.recover_cek(id, alg, backend)?;
        cek.verify(KeyType::Symmetric, Some(alg), &[KeyOp::Decrypt])?;
        let nonce = compute_nonce(&self.headers, &cek, alg)?;
        let aad = enc_structure(
            "Encrypt",
            &self.headers.serialize_protected()?,
            external_aad,
        )?;

        backend.decrypt(alg, &cek, &nonce, &self.ciphertext, &aad)
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn recipients(&self) -> &Recipients {
        &self.recipients
    }

    pub fn recipients_mut(&mut self) -> &mut Recipients {
        &mut self.recipients
    }

    /// Returns the tagged CBOR encoding of the message.
    pub fn encode(&self) -> Result<Vec<u8>> {
        encode_items(
            TAG_ENCRYPT,
            vec![
                Value::Bytes(self.headers.serialize_protected()?),
                self.headers.unprotected_value(),
                Value::Bytes(self.ciphertext.clone()),
                self.recipients.to_cose_objects()?,
            ],
        )
    }

    /// Decodes a message with its recipient tree, with or without its tag.
    pub fn decode(bytes: &[u8]) -> Result<Encrypt> {
        let items = decode_items(bytes, TAG_ENCRYPT, 4)?;
        let mut recipients = Recipients::new(Context::EncRecipient);
        recipients.from_cose_objects(&items[3])?;

        Ok(Encrypt {
            headers: decode_headers(&items)?,
            ciphertext: decode_bytes(&items[2])?,
            recipients,
        })
    }
}
