//! Content key computation for each kind of recipient.

use alloc::vec::Vec;

use super::{
    Recipient, RecipientId, RecipientKind, Recipients, MAX_RECIPIENT_DEPTH,
};
use crate::{
    algorithm::{Algorithm, Family},
    attribute::{Curve, HeaderAttribute, KeyOp, KeyType},
    cbor::Value,
    crypto::{check_key_wrap_input, CryptoBackend},
    kdf::KdfContext,
    key::CoseKey,
    Error, Result,
};

/// What the CEK is needed for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Encrypt,
    Decrypt,
}

impl Operation {
    fn key_op(&self) -> KeyOp {
        match self {
            Operation::Encrypt => KeyOp::Encrypt,
            Operation::Decrypt => KeyOp::Decrypt,
        }
    }
}

impl Recipients {
    /// Returns the CEK the recipient establishes for the `target` content
    /// algorithm, restricted to the operation.
    ///
    /// * Direct encryption: when encrypting, there is no CEK in the
    ///   recipient and `None` is returned. When decrypting, the shared key is
    ///   the CEK.
    /// * Direct key agreement: the CEK derived by [`Recipients::agree`],
    ///   which has to run first.
    /// * Key agreement with key wrap: when encrypting, the payload as it is
    ///   (`None` if empty). When decrypting, the unwrapped payload.
    /// * Key wrap: the payload unwrapped with the recipient's key, or with
    ///   the key its first nested recipient establishes (`None` if empty
    ///   when encrypting).
    pub fn compute_cek<B: CryptoBackend>(
        &self,
        id: RecipientId,
        target: Algorithm,
        op: Operation,
        backend: &B,
    ) -> Result<Option<CoseKey>> {
        let cek = match self.cek_bytes(id, op, backend, 0)? {
            Some(cek) => cek,
            None => return Ok(None),
        };
        if op == Operation::Decrypt
            && target.key_length().map_or(false, |len| len != cek.len())
        {
            return Err(Error::InvalidKey(
                "CEK length doesn't fit the content algorithm",
            ));
        }
        let mut key = CoseKey::symmetric(&cek);
        key.set_algorithm(target)?;
        key.set_key_ops(&[op.key_op()])?;

        Ok(Some(key))
    }

    fn cek_bytes<B: CryptoBackend>(
        &self,
        id: RecipientId,
        op: Operation,
        backend: &B,
        depth: usize,
    ) -> Result<Option<Vec<u8>>> {
        check_depth(depth)?;
        let node = self.get(id)?;
        log::debug!("Computing CEK of {:?} recipient", node.kind);
        match (node.kind, op) {
            (RecipientKind::DirectEncryption, Operation::Encrypt) => {
                if node.payload.is_empty() {
                    Ok(None)
                } else {
                    Err(Error::MalformedMessage(
                        "direct encryption recipient with a payload",
                    ))
                }
            }
            (RecipientKind::DirectEncryption, Operation::Decrypt) => {
                let key = node
                    .key
                    .as_ref()
                    .ok_or(Error::InvalidKey("shared key is missing"))?;
                let k = key.k().ok_or(Error::InvalidKeyType(
                    "shared key must be symmetric",
                ))?;
                Ok(Some(k.to_vec()))
            }
            (RecipientKind::DirectKeyAgreement, _) => node
                .agreed
                .as_ref()
                .and_then(CoseKey::k)
                .map(|k| Some(k.to_vec()))
                .ok_or(Error::NotImplemented(
                    "direct key agreement has not been executed",
                )),
            (RecipientKind::KeyAgreementWithKeyWrap, Operation::Encrypt)
            | (RecipientKind::KeyWrap, Operation::Encrypt)
                if node.payload.is_empty() =>
            {
                Ok(None)
            }
            (RecipientKind::KeyAgreementWithKeyWrap, Operation::Encrypt) => {
                Ok(Some(node.payload.clone()))
            }
            (RecipientKind::KeyAgreementWithKeyWrap, Operation::Decrypt) => {
                Ok(Some(self.decrypt(id, backend)?))
            }
            (RecipientKind::KeyWrap, _) => {
                Ok(Some(self.unwrap_key(id, backend, depth)?))
            }
        }
    }

    /// Unwraps the payload of a key wrap recipient.
    fn unwrap_key<B: CryptoBackend>(
        &self,
        id: RecipientId,
        backend: &B,
        depth: usize,
    ) -> Result<Vec<u8>> {
        let node = self.get(id)?;
        let alg = node.algorithm()?;
        if node.payload.is_empty() {
            return Err(Error::InvalidMessage("no wrapped key in the payload"));
        }
        let kek = match &node.key {
            Some(key) => {
                key.verify(kek_type(alg), Some(alg), &[KeyOp::UnwrapKey])?;
                key.clone()
            }
            None => {
                // The first nested recipient provides the KEK
                let child = *node
                    .children
                    .first()
                    .ok_or(Error::InvalidKey("no key-encryption key"))?;
                let bytes = self
                    .cek_bytes(child, Operation::Decrypt, backend, depth + 1)?
                    .ok_or(Error::InvalidKey("no key-encryption key"))?;
                derived_kek(&bytes, alg, KeyOp::UnwrapKey)?
            }
        };
        log::debug!("Unwrapping CEK with {}", alg);

        backend.key_unwrap(alg, &kek, &node.payload)
    }

    /// Returns the KDF context the recipient's headers and local attributes
    /// yield for deriving a key for `target`.
    pub fn kdf_context(
        &self,
        id: RecipientId,
        target: Algorithm,
    ) -> Result<KdfContext> {
        let node = self.get(id)?;
        KdfContext::build(target, &node.headers, &node.local.kdf)
    }

    /// Generates an ephemeral key on the curve, keeps it as the recipient's
    /// key and publishes its public part in the unprotected header.
    ///
    /// Fails if the header already holds an ephemeral key.
    pub fn setup_ephemeral_key<B: CryptoBackend>(
        &mut self,
        id: RecipientId,
        curve: Curve,
        backend: &B,
    ) -> Result<()> {
        let node = self.get_mut(id)?;
        if node.headers.contains(HeaderAttribute::EphemeralKey) {
            return Err(Error::InvalidMessage(
                "unrelated ephemeral key already present",
            ));
        }
        let key = backend.generate_key(curve)?;
        node.headers.set_unprotected(
            HeaderAttribute::EphemeralKey,
            key.public_only().to_value(),
        )?;
        node.key = Some(key);

        Ok(())
    }

    /// Wraps the payload of a key agreement with key wrap recipient, which
    /// holds the CEK, with a KEK derived from the agreement.
    ///
    /// The receiver's public key has to be set as the static key. For
    /// ephemeral-static agreement, an ephemeral key is generated unless the
    /// recipient already has a key.
    pub fn encrypt<B: CryptoBackend>(
        &mut self,
        id: RecipientId,
        backend: &B,
    ) -> Result<()> {
        let node = self.get(id)?;
        let alg = agreement_with_key_wrap(node)?;
        let peer = node.local.static_key.clone().ok_or(Error::InvalidMessage(
            "static key of the receiver is missing",
        ))?;
        if node.key.is_none() {
            if !alg.is_ephemeral_agreement() {
                return Err(Error::InvalidKey(
                    "static key of the sender is missing",
                ));
            }
            self.setup_ephemeral_key(id, peer.curve()?, backend)?;
        }

        let node = self.get(id)?;
        let private = node
            .key
            .as_ref()
            .ok_or(Error::InvalidKey("private key of the sender is missing"))?;
        let (wrap, kek) =
            agreed_kek(node, alg, private, &peer, KeyOp::WrapKey, backend)?;
        check_key_wrap_input(&node.payload)?;
        let wrapped = backend.key_wrap(wrap, &kek, &node.payload)?;
        self.get_mut(id)?.payload = wrapped;

        Ok(())
    }

    /// Returns the unwrapped payload of a key agreement with key wrap
    /// recipient.
    ///
    /// The sender's public key comes from the ephemeral key header for
    /// ephemeral-static agreement and from the static key otherwise.
    pub fn decrypt<B: CryptoBackend>(
        &self,
        id: RecipientId,
        backend: &B,
    ) -> Result<Vec<u8>> {
        let node = self.get(id)?;
        let alg = agreement_with_key_wrap(node)?;
        let peer = if alg.is_ephemeral_agreement() {
            let value = node
                .headers
                .get(HeaderAttribute::EphemeralKey)
                .ok_or(Error::InvalidMessage("ephemeral key is missing"))?;
            CoseKey::from_value(value)?
        } else {
            node.local.static_key.clone().ok_or(Error::InvalidMessage(
                "static key of the sender is missing",
            ))?
        };
        let private = node.key.as_ref().ok_or(Error::InvalidKey(
            "private key of the receiver is missing",
        ))?;
        let (wrap, kek) =
            agreed_kek(node, alg, private, &peer, KeyOp::UnwrapKey, backend)?;
        if node.payload.is_empty() {
            return Err(Error::InvalidMessage("no wrapped key in the payload"));
        }

        backend.key_unwrap(wrap, &kek, &node.payload)
    }

    /// Runs the key agreement of a direct key agreement recipient and keeps
    /// the derived CEK for `target`.
    ///
    /// A party that knows the other's static key uses it as the peer key,
    /// generating an ephemeral key for ephemeral-static agreement if it has
    /// no key yet. Otherwise the peer key is the ephemeral key in the header.
    pub fn agree<B: CryptoBackend>(
        &mut self,
        id: RecipientId,
        target: Algorithm,
        backend: &B,
    ) -> Result<CoseKey> {
        let node = self.get(id)?;
        if node.kind != RecipientKind::DirectKeyAgreement {
            return Err(Error::InvalidAlgorithm(
                "not a direct key agreement recipient",
            ));
        }
        let alg = node.algorithm()?;
        let peer = match &node.local.static_key {
            Some(peer) => peer.clone(),
            None if alg.is_ephemeral_agreement() => {
                let value = node
                    .headers
                    .get(HeaderAttribute::EphemeralKey)
                    .ok_or(Error::InvalidMessage("ephemeral key is missing"))?;
                CoseKey::from_value(value)?
            }
            None => {
                return Err(Error::InvalidMessage(
                    "static key of the other party is missing",
                ))
            }
        };
        if node.key.is_none() {
            if !alg.is_ephemeral_agreement() {
                return Err(Error::InvalidKey("private key is missing"));
            }
            self.setup_ephemeral_key(id, peer.curve()?, backend)?;
        }

        let node = self.get(id)?;
        let private = node
            .key
            .as_ref()
            .ok_or(Error::InvalidKey("private key is missing"))?;
        let context =
            KdfContext::build(target, &node.headers, &node.local.kdf)?;
        let bytes = backend.derive_kek(
            alg,
            private,
            &peer,
            salt(node),
            &context,
        )?;
        let mut cek = CoseKey::symmetric(&bytes);
        cek.set_algorithm(target)?;
        log::debug!("Derived {} byte CEK with {}", bytes.len(), alg);
        self.get_mut(id)?.agreed = Some(cek.clone());

        Ok(cek)
    }

    /// Protects the CEK in a key wrap or key agreement with key wrap
    /// recipient, setting its payload.
    ///
    /// A key wrap recipient without a key gets a fresh KEK, which is in turn
    /// established through its first nested recipient.
    pub fn wrap_cek<B: CryptoBackend>(
        &mut self,
        id: RecipientId,
        cek: &[u8],
        backend: &B,
    ) -> Result<()> {
        self.wrap_at(id, cek, backend, 0)
    }

    fn wrap_at<B: CryptoBackend>(
        &mut self,
        id: RecipientId,
        cek: &[u8],
        backend: &B,
        depth: usize,
    ) -> Result<()> {
        check_depth(depth)?;
        let node = self.get(id)?;
        match node.kind {
            RecipientKind::KeyAgreementWithKeyWrap => {
                self.get_mut(id)?.payload = cek.to_vec();
                self.encrypt(id, backend)
            }
            RecipientKind::KeyWrap => {
                let alg = node.algorithm()?;
                let kek = match node.key.clone() {
                    Some(key) => {
                        let ops = [KeyOp::WrapKey];
                        key.verify(kek_type(alg), Some(alg), &ops)?;
                        key
                    }
                    None => {
                        let child = *node
                            .children
                            .first()
                            .ok_or(Error::InvalidKey("no key-encryption key"))?;
                        let bytes =
                            self.provide_key(child, alg, backend, depth + 1)?;
                        derived_kek(&bytes, alg, KeyOp::WrapKey)?
                    }
                };
                if alg.family() == Family::KeyWrap {
                    check_key_wrap_input(cek)?;
                }
                log::debug!("Wrapping CEK with {}", alg);
                let wrapped = backend.key_wrap(alg, &kek, cek)?;
                self.get_mut(id)?.payload = wrapped;

                Ok(())
            }
            RecipientKind::DirectEncryption
            | RecipientKind::DirectKeyAgreement => {
                Err(Error::InvalidRecipientConfiguration(
                    "direct recipients don't wrap keys",
                ))
            }
        }
    }

    /// Makes the recipient establish a key for `target` and returns it.
    fn provide_key<B: CryptoBackend>(
        &mut self,
        id: RecipientId,
        target: Algorithm,
        backend: &B,
        depth: usize,
    ) -> Result<Vec<u8>> {
        check_depth(depth)?;
        let node = self.get(id)?;
        let key = match node.kind {
            RecipientKind::DirectEncryption => node
                .key
                .as_ref()
                .and_then(CoseKey::k)
                .ok_or(Error::InvalidKey("shared key is missing"))?
                .to_vec(),
            RecipientKind::DirectKeyAgreement => self
                .agree(id, target, backend)?
                .k()
                .ok_or(Error::InvalidKey("agreement yielded no key"))?
                .to_vec(),
            RecipientKind::KeyAgreementWithKeyWrap | RecipientKind::KeyWrap => {
                let len = target.key_length().ok_or(Error::InvalidAlgorithm(
                    "algorithm has no fixed key length",
                ))?;
                let key = backend.random(len)?;
                self.wrap_at(id, &key, backend, depth)?;
                key
            }
        };
        if target.key_length().map_or(false, |len| len != key.len()) {
            return Err(Error::InvalidKey(
                "key length doesn't fit the algorithm",
            ));
        }

        Ok(key)
    }

    /// Establishes a CEK for `target` through the top level recipients and
    /// returns it.
    ///
    /// A single direct recipient determines the CEK itself. Otherwise a
    /// fresh CEK is generated and wrapped for every recipient.
    pub fn establish_cek<B: CryptoBackend>(
        &mut self,
        target: Algorithm,
        backend: &B,
    ) -> Result<CoseKey> {
        self.verify()?;
        let top = self.top.clone();
        let first = *top.first().ok_or(Error::InvalidRecipientConfiguration(
            "message has no recipients",
        ))?;
        let cek = if self.get(first)?.kind.is_direct() {
            self.provide_key(first, target, backend, 0)?
        } else {
            let len = target.key_length().ok_or(Error::InvalidAlgorithm(
                "algorithm has no fixed key length",
            ))?;
            let cek = backend.random(len)?;
            for id in top {
                self.wrap_at(id, &cek, backend, 0)?;
            }
            cek
        };
        let mut key = CoseKey::symmetric(&cek);
        key.set_algorithm(target)?;
        key.set_key_ops(&[KeyOp::Encrypt])?;

        Ok(key)
    }

    /// Recovers the CEK for `target` through a top level recipient, running
    /// any pending direct key agreement in its subtree first.
    pub fn recover_cek<B: CryptoBackend>(
        &mut self,
        id: RecipientId,
        target: Algorithm,
        backend: &B,
    ) -> Result<CoseKey> {
        self.run_agreements(id, target, backend, 0)?;
        self.compute_cek(id, target, Operation::Decrypt, backend)?
            .ok_or(Error::InvalidMessage("recipient yields no CEK"))
    }

    fn run_agreements<B: CryptoBackend>(
        &mut self,
        id: RecipientId,
        target: Algorithm,
        backend: &B,
        depth: usize,
    ) -> Result<()> {
        check_depth(depth)?;
        let node = self.get(id)?;
        match node.kind {
            RecipientKind::DirectKeyAgreement if node.agreed.is_none() => {
                self.agree(id, target, backend)?;
            }
            RecipientKind::KeyWrap if node.key.is_none() => {
                // Only the first nested recipient is used for the KEK
                let alg = node.algorithm()?;
                if let Some(&child) = node.children.first() {
                    self.run_agreements(child, alg, backend, depth + 1)?;
                }
            }
            _ => (),
        }

        Ok(())
    }
}

fn check_depth(depth: usize) -> Result<()> {
    if depth > MAX_RECIPIENT_DEPTH {
        Err(Error::InvalidMessage("recipients nested too deeply"))
    } else {
        Ok(())
    }
}

/// Returns the algorithm of a key agreement with key wrap recipient.
fn agreement_with_key_wrap(node: &Recipient) -> Result<Algorithm> {
    let alg = node.algorithm()?;
    if alg.family() != Family::AgreementKeyWrap {
        return Err(Error::InvalidAlgorithm(
            "not a key agreement with key wrap algorithm",
        ));
    }

    Ok(alg)
}

/// Returns the key type a KEK of the wrap algorithm has.
fn kek_type(alg: Algorithm) -> KeyType {
    match alg.family() {
        Family::RsaOaep => KeyType::Rsa,
        _ => KeyType::Symmetric,
    }
}

fn salt(node: &Recipient) -> Option<&[u8]> {
    node.headers
        .get(HeaderAttribute::Salt)
        .and_then(Value::as_bytes)
}

/// Returns a KEK for the wrap algorithm holding derived bytes.
fn derived_kek(bytes: &[u8], alg: Algorithm, op: KeyOp) -> Result<CoseKey> {
    let mut kek = CoseKey::symmetric(bytes);
    kek.set_algorithm(alg)?;
    kek.set_key_ops(&[op])?;

    Ok(kek)
}

/// Derives the KEK of a key agreement with key wrap recipient and checks
/// that it may be used for the operation.
fn agreed_kek<B: CryptoBackend>(
    node: &Recipient,
    alg: Algorithm,
    private: &CoseKey,
    peer: &CoseKey,
    op: KeyOp,
    backend: &B,
) -> Result<(Algorithm, CoseKey)> {
    let wrap = alg
        .key_wrap()
        .ok_or(Error::InvalidAlgorithm("algorithm has no key wrap"))?;
    let context = KdfContext::build(wrap, &node.headers, &node.local.kdf)?;
    let bytes =
        backend.derive_kek(alg, private, peer, salt(node), &context)?;
    let kek = derived_kek(&bytes, wrap, op)?;
    kek.verify(KeyType::Symmetric, Some(wrap), &[op])?;

    Ok((wrap, kek))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        crypto::RustCrypto,
        kdf::{KdfParams, PartyInfo},
        recipient::{test_vectors::*, Recipient},
    };

    fn recipient(alg: Algorithm) -> Recipient {
        Recipient::for_algorithm(alg).unwrap()
    }

    /// Returns a copy of the sender's recipient as the receiver sees it.
    fn received(
        sending: &Recipients,
        id: RecipientId,
        key: CoseKey,
        static_key: Option<CoseKey>,
    ) -> (Recipients, RecipientId) {
        let mut node = sending.get(id).unwrap().clone();
        node.set_key(Some(key));
        node.local_mut().static_key = static_key;
        let mut receiving = Recipients::default();
        let id = receiving.push(node).unwrap();
        (receiving, id)
    }

    #[test]
    fn direct_encryption() {
        let mut recipients = Recipients::default();
        let id = recipients
            .push(
                recipient(Algorithm::Direct)
                    .with_key(CoseKey::symmetric(&SHARED_KEY)),
            )
            .unwrap();

        let cek = recipients
            .compute_cek(
                id,
                Algorithm::A256Gcm,
                Operation::Decrypt,
                &RustCrypto,
            )
            .unwrap()
            .unwrap();
        assert_eq!(Some(&SHARED_KEY[..]), cek.k());
        assert_eq!(Some(vec![KeyOp::Decrypt]), cek.key_ops().unwrap());
        assert_eq!(Some(Algorithm::A256Gcm), cek.algorithm().unwrap());

        assert!(recipients
            .compute_cek(
                id,
                Algorithm::A256Gcm,
                Operation::Encrypt,
                &RustCrypto,
            )
            .unwrap()
            .is_none());
        assert!(matches!(
            recipients.compute_cek(
                id,
                Algorithm::A128Gcm,
                Operation::Decrypt,
                &RustCrypto
            ),
            Err(Error::InvalidKey(_))
        ));

        recipients.get_mut(id).unwrap().set_payload(vec![1]);
        assert!(matches!(
            recipients.compute_cek(
                id,
                Algorithm::A256Gcm,
                Operation::Encrypt,
                &RustCrypto
            ),
            Err(Error::MalformedMessage(_))
        ));

        let mut keyless = Recipients::default();
        let id = keyless.push(recipient(Algorithm::Direct)).unwrap();
        assert!(matches!(
            keyless.compute_cek(
                id,
                Algorithm::A256Gcm,
                Operation::Decrypt,
                &RustCrypto
            ),
            Err(Error::InvalidKey(_))
        ));
    }

    #[test]
    fn direct_key_agreement_kdf_context() {
        let mut agreement = recipient(Algorithm::EcdhEsHkdf256);
        agreement.local_mut().kdf = KdfParams {
            party_u: PartyInfo {
                identity: Some(PARTY_U_IDENTITY.to_vec()),
                nonce: Some(Value::Bytes(PARTY_U_NONCE.to_vec())),
                other: Some(PARTY_U_OTHER.to_vec()),
            },
            party_v: PartyInfo {
                identity: Some(PARTY_V_IDENTITY.to_vec()),
                nonce: Some(Value::Bytes(PARTY_V_NONCE.to_vec())),
                other: Some(PARTY_V_OTHER.to_vec()),
            },
            supp_pub_other: Some(SUPP_PUB_OTHER.to_vec()),
            supp_priv_info: Some(SUPP_PRIV_OTHER.to_vec()),
        };
        let mut recipients = Recipients::default();
        let id = recipients.push(agreement).unwrap();

        let alg = Algorithm::EcdhEsHkdf256;
        let context = recipients.kdf_context(id, alg).unwrap();
        assert_eq!(
            alg.key_length().unwrap(),
            context.supp_pub_info.key_data_length
        );
        assert_eq!(
            Some(&PARTY_U_IDENTITY[..]),
            context.party_u.identity.as_deref()
        );
        assert_eq!(
            Some(Value::Bytes(PARTY_U_NONCE.to_vec())),
            context.party_u.nonce
        );
        assert_eq!(Some(&PARTY_U_OTHER[..]), context.party_u.other.as_deref());
        assert_eq!(
            Some(&PARTY_V_IDENTITY[..]),
            context.party_v.identity.as_deref()
        );
        assert_eq!(
            Some(Value::Bytes(PARTY_V_NONCE.to_vec())),
            context.party_v.nonce
        );
        assert_eq!(Some(&PARTY_V_OTHER[..]), context.party_v.other.as_deref());
        assert_eq!(
            Some(&SUPP_PUB_OTHER[..]),
            context.supp_pub_info.other.as_deref()
        );
        assert_eq!(
            Some(&SUPP_PRIV_OTHER[..]),
            context.supp_priv_info.as_deref()
        );
        let headers = recipients.get(id).unwrap().headers();
        assert_eq!(
            headers.serialize_protected().unwrap(),
            context.supp_pub_info.protected
        );
    }

    #[test]
    fn direct_key_agreement_needs_execution() {
        let mut recipients = Recipients::default();
        let id = recipients.push(recipient(Algorithm::EcdhSsHkdf256)).unwrap();
        for op in [Operation::Encrypt, Operation::Decrypt] {
            assert!(matches!(
                recipients.compute_cek(id, Algorithm::A128Gcm, op, &RustCrypto),
                Err(Error::NotImplemented(_))
            ));
        }
        assert!(matches!(
            recipients.agree(id, Algorithm::A128Gcm, &RustCrypto),
            Err(Error::InvalidMessage(_))
        ));
    }

    #[test]
    fn direct_key_agreement_both_sides() {
        for (alg, curve) in [
            (Algorithm::EcdhEsHkdf256, Curve::X25519),
            (Algorithm::EcdhEsHkdf512, Curve::P256),
            (Algorithm::EcdhSsHkdf256, Curve::P256),
        ] {
            let receiver = RustCrypto.generate_key(curve).unwrap();
            let sender = RustCrypto.generate_key(curve).unwrap();

            let mut sending = Recipients::default();
            let mut node =
                recipient(alg).with_static_key(receiver.public_only());
            if !alg.is_ephemeral_agreement() {
                node.set_key(Some(sender.clone()));
            }
            let id = sending.push(node).unwrap();
            let cek = sending
                .agree(id, Algorithm::A128Gcm, &RustCrypto)
                .unwrap();
            assert_eq!(16, cek.k().unwrap().len());

            let ephemeral = sending
                .get(id)
                .unwrap()
                .headers()
                .get_unprotected(HeaderAttribute::EphemeralKey)
                .cloned();
            assert_eq!(alg.is_ephemeral_agreement(), ephemeral.is_some());
            if let Some(ephemeral) = ephemeral {
                let published = CoseKey::from_value(&ephemeral).unwrap();
                assert!(!published.has_private());
            }

            let static_key = if alg.is_ephemeral_agreement() {
                None
            } else {
                Some(sender.public_only())
            };
            let (mut receiving, id) =
                received(&sending, id, receiver, static_key);
            receiving.get_mut(id).unwrap().agreed = None;
            let recovered = receiving
                .recover_cek(id, Algorithm::A128Gcm, &RustCrypto)
                .unwrap();
            assert_eq!(cek.k(), recovered.k());
        }
    }

    #[test]
    fn ephemeral_key_only_once() {
        let mut recipients = Recipients::default();
        let id = recipients.push(recipient(Algorithm::EcdhEsA128Kw)).unwrap();
        recipients
            .setup_ephemeral_key(id, Curve::X25519, &RustCrypto)
            .unwrap();

        let node = recipients.get(id).unwrap();
        let published = node
            .headers()
            .get_unprotected(HeaderAttribute::EphemeralKey)
            .unwrap();
        let published = CoseKey::from_value(published).unwrap();
        assert!(!published.has_private());
        assert_eq!(None, published.d());
        assert!(node.key().unwrap().has_private());
        assert_eq!(published, node.key().unwrap().public_only());

        assert!(matches!(
            recipients.setup_ephemeral_key(id, Curve::X25519, &RustCrypto),
            Err(Error::InvalidMessage(_))
        ));
    }

    #[test]
    fn key_agreement_with_key_wrap() {
        for (alg, curve) in [
            (Algorithm::EcdhEsA128Kw, Curve::X25519),
            (Algorithm::EcdhEsA256Kw, Curve::P256),
            (Algorithm::EcdhSsA192Kw, Curve::X25519),
        ] {
            let receiver = RustCrypto.generate_key(curve).unwrap();
            let sender = RustCrypto.generate_key(curve).unwrap();

            let mut sending = Recipients::default();
            let mut node =
                recipient(alg).with_static_key(receiver.public_only());
            if !alg.is_ephemeral_agreement() {
                node.set_key(Some(sender.clone()));
            }
            node.set_payload(CEK.to_vec());
            let id = sending.push(node).unwrap();
            sending.encrypt(id, &RustCrypto).unwrap();
            let wrapped = sending.get(id).unwrap().payload().to_vec();
            assert_eq!(CEK.len() + 8, wrapped.len());

            // Encrypting passes the payload through
            let passed = sending
                .compute_cek(
                    id,
                    Algorithm::A128Gcm,
                    Operation::Encrypt,
                    &RustCrypto,
                )
                .unwrap()
                .unwrap();
            assert_eq!(Some(&wrapped[..]), passed.k());

            let static_key = if alg.is_ephemeral_agreement() {
                None
            } else {
                Some(sender.public_only())
            };
            let (receiving, id) = received(&sending, id, receiver, static_key);
            let unwrapped = receiving.decrypt(id, &RustCrypto).unwrap();
            assert_eq!(CEK.to_vec(), unwrapped);
            let cek = receiving
                .compute_cek(
                    id,
                    Algorithm::A128Gcm,
                    Operation::Decrypt,
                    &RustCrypto,
                )
                .unwrap()
                .unwrap();
            assert_eq!(Some(&CEK[..]), cek.k());
        }
    }

    #[test]
    fn key_agreement_with_key_wrap_failures() {
        let receiver = RustCrypto.generate_key(Curve::X25519).unwrap();
        let mut recipients = Recipients::default();

        // No receiver key
        let id = recipients.push(recipient(Algorithm::EcdhEsA128Kw)).unwrap();
        recipients.get_mut(id).unwrap().set_payload(CEK.to_vec());
        assert!(matches!(
            recipients.encrypt(id, &RustCrypto),
            Err(Error::InvalidMessage(_))
        ));
        // No sender key for static-static
        let id = recipients
            .push(
                recipient(Algorithm::EcdhSsA128Kw)
                    .with_static_key(receiver.public_only()),
            )
            .unwrap();
        assert!(matches!(
            recipients.encrypt(id, &RustCrypto),
            Err(Error::InvalidKey(_))
        ));
        // Somebody else's ephemeral key
        let id = recipients
            .push(
                recipient(Algorithm::EcdhEsA128Kw)
                    .with_static_key(receiver.public_only()),
            )
            .unwrap();
        recipients
            .get_mut(id)
            .unwrap()
            .set_unprotected(
                HeaderAttribute::EphemeralKey,
                receiver.public_only().to_value(),
            )
            .unwrap();
        assert!(matches!(
            recipients.encrypt(id, &RustCrypto),
            Err(Error::InvalidMessage(_))
        ));
        // CEK too short to wrap
        let id = recipients
            .push(
                recipient(Algorithm::EcdhEsA128Kw)
                    .with_static_key(receiver.public_only()),
            )
            .unwrap();
        recipients.get_mut(id).unwrap().set_payload(vec![0; 8]);
        assert!(matches!(
            recipients.encrypt(id, &RustCrypto),
            Err(Error::ValueError(_))
        ));
        // Not an agreement with key wrap
        let id = recipients.push(recipient(Algorithm::A128Kw)).unwrap();
        assert!(matches!(
            recipients.encrypt(id, &RustCrypto),
            Err(Error::InvalidAlgorithm(_))
        ));
        // Receiver without the ephemeral key
        let id = recipients
            .push(recipient(Algorithm::EcdhEsA128Kw).with_key(receiver))
            .unwrap();
        assert!(matches!(
            recipients.decrypt(id, &RustCrypto),
            Err(Error::InvalidMessage(_))
        ));
    }

    #[test]
    fn key_wrap() {
        for (alg, kek) in [
            (Algorithm::A128Kw, &KEK_128[..]),
            (Algorithm::A192Kw, &KEK_192[..]),
            (Algorithm::A256Kw, &KEK_256[..]),
        ] {
            let mut recipients = Recipients::default();
            let id = recipients
                .push(recipient(alg).with_key(CoseKey::symmetric(kek)))
                .unwrap();
            assert!(recipients
                .compute_cek(
                    id,
                    Algorithm::A128Gcm,
                    Operation::Encrypt,
                    &RustCrypto,
                )
                .unwrap()
                .is_none());

            for short in [&[0; 8][..], &[0; 15][..], &[0; 17][..]] {
                assert!(matches!(
                    recipients.wrap_cek(id, short, &RustCrypto),
                    Err(Error::ValueError(_))
                ));
            }

            recipients.wrap_cek(id, &CEK, &RustCrypto).unwrap();
            let cek = recipients
                .compute_cek(
                    id,
                    Algorithm::A128Gcm,
                    Operation::Decrypt,
                    &RustCrypto,
                )
                .unwrap()
                .unwrap();
            assert_eq!(Some(&CEK[..]), cek.k());
        }
    }

    #[test]
    fn key_wrap_key_restrictions() {
        let mut kek = CoseKey::symmetric(&KEK_128);
        kek.set_algorithm(Algorithm::A256Kw).unwrap();
        let mut recipients = Recipients::default();
        let id = recipients
            .push(recipient(Algorithm::A128Kw).with_key(kek))
            .unwrap();
        assert!(matches!(
            recipients.wrap_cek(id, &CEK, &RustCrypto),
            Err(Error::InvalidKey(_))
        ));

        let mut kek = CoseKey::symmetric(&KEK_128);
        kek.set_key_ops(&[KeyOp::WrapKey]).unwrap();
        let id = recipients
            .push(recipient(Algorithm::A128Kw).with_key(kek))
            .unwrap();
        recipients.wrap_cek(id, &CEK, &RustCrypto).unwrap();
        assert!(matches!(
            recipients.compute_cek(
                id,
                Algorithm::A128Gcm,
                Operation::Decrypt,
                &RustCrypto
            ),
            Err(Error::InvalidKey(_))
        ));
    }

    #[test]
    fn nested_key_wrap() {
        let mut recipients = Recipients::default();
        let top = recipients.push(recipient(Algorithm::A256Kw)).unwrap();
        let middle = recipients
            .push_nested(top, recipient(Algorithm::A128Kw))
            .unwrap();
        recipients
            .push_nested(
                middle,
                recipient(Algorithm::Direct)
                    .with_key(CoseKey::symmetric(&KEK_128)),
            )
            .unwrap();

        let cek = recipients
            .establish_cek(Algorithm::A128Gcm, &RustCrypto)
            .unwrap();
        assert_eq!(24, recipients.get(top).unwrap().payload().len());
        // Wraps the 256 bit KEK of the top level recipient
        assert_eq!(40, recipients.get(middle).unwrap().payload().len());

        let recovered = recipients
            .recover_cek(top, Algorithm::A128Gcm, &RustCrypto)
            .unwrap();
        assert_eq!(cek.k(), recovered.k());
    }

    #[test]
    fn nested_key_agreement() {
        let receiver = RustCrypto.generate_key(Curve::P256).unwrap();
        let mut sending = Recipients::default();
        let top = sending.push(recipient(Algorithm::A128Kw)).unwrap();
        let agreement = sending
            .push_nested(
                top,
                recipient(Algorithm::EcdhEsHkdf256)
                    .with_static_key(receiver.public_only()),
            )
            .unwrap();
        let cek = sending
            .establish_cek(Algorithm::A256Gcm, &RustCrypto)
            .unwrap();

        let mut receiving = sending.clone();
        let node = receiving.get_mut(agreement).unwrap();
        node.set_key(Some(receiver));
        node.local_mut().static_key = None;
        node.agreed = None;
        let recovered = receiving
            .recover_cek(top, Algorithm::A256Gcm, &RustCrypto)
            .unwrap();
        assert_eq!(cek.k(), recovered.k());
    }

    #[test]
    fn several_recipients_share_the_cek() {
        let mut recipients = Recipients::default();
        let a = recipients
            .push(
                recipient(Algorithm::A128Kw)
                    .with_key(CoseKey::symmetric(&KEK_128)),
            )
            .unwrap();
        let b = recipients
            .push(
                recipient(Algorithm::A256Kw)
                    .with_key(CoseKey::symmetric(&KEK_256)),
            )
            .unwrap();
        let cek = recipients
            .establish_cek(Algorithm::AesCcm16_64_128, &RustCrypto)
            .unwrap();
        assert_eq!(Some(vec![KeyOp::Encrypt]), cek.key_ops().unwrap());
        for id in [a, b] {
            let recovered = recipients
                .recover_cek(id, Algorithm::AesCcm16_64_128, &RustCrypto)
                .unwrap();
            assert_eq!(cek.k(), recovered.k());
        }
    }

    #[test]
    fn establish_needs_valid_set() {
        let mut recipients = Recipients::default();
        assert!(matches!(
            recipients.establish_cek(Algorithm::A128Gcm, &RustCrypto),
            Err(Error::InvalidRecipientConfiguration(_))
        ));
        recipients
            .push(
                recipient(Algorithm::Direct)
                    .with_key(CoseKey::symmetric(&KEK_128)),
            )
            .unwrap();
        let cek = recipients
            .establish_cek(Algorithm::A128Gcm, &RustCrypto)
            .unwrap();
        assert_eq!(Some(&KEK_128[..]), cek.k());

        recipients
            .push(
                recipient(Algorithm::A128Kw)
                    .with_key(CoseKey::symmetric(&KEK_128)),
            )
            .unwrap();
        assert!(matches!(
            recipients.establish_cek(Algorithm::A128Gcm, &RustCrypto),
            Err(Error::InvalidRecipientConfiguration(_))
        ));
    }

    #[test]
    fn nesting_depth_bounded() {
        let mut recipients = Recipients::default();
        let mut parent = recipients.push(recipient(Algorithm::A128Kw)).unwrap();
        recipients.get_mut(parent).unwrap().set_payload(vec![0; 24]);
        for _ in 0..MAX_RECIPIENT_DEPTH + 1 {
            let mut node = recipient(Algorithm::A128Kw);
            node.set_payload(vec![0; 24]);
            parent = recipients.push_nested(parent, node).unwrap();
        }
        let top = recipients.top_level()[0];
        assert!(matches!(
            recipients.compute_cek(
                top,
                Algorithm::A128Gcm,
                Operation::Decrypt,
                &RustCrypto
            ),
            Err(Error::InvalidMessage(_))
        ));
    }
}
