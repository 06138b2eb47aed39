//! The recipient structures that establish the content key of a message.
//!
//! Recipients form a tree: a message has a list of recipients, and each
//! recipient can have nested recipients that establish the key it needs. The
//! tree is stored as an arena in [`Recipients`], with nodes addressed by
//! [`RecipientId`].

use alloc::vec::Vec;

use crate::{
    algorithm::{Algorithm, Family},
    attribute::HeaderAttribute,
    cbor::Value,
    header::Headers,
    kdf::KdfParams,
    key::CoseKey,
    Error, Result,
};

mod cek;
mod codec;
#[cfg(test)]
mod test_vectors;

pub use cek::Operation;

/// The deepest nesting of recipients that is accepted.
pub const MAX_RECIPIENT_DEPTH: usize = 16;

/// The ways a recipient can establish the content key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecipientKind {
    /// The CEK is a key both sides already share.
    DirectEncryption,
    /// The CEK is derived from an ECDH agreement.
    DirectKeyAgreement,
    /// A KEK is derived from an ECDH agreement and wraps the CEK.
    KeyAgreementWithKeyWrap,
    /// A pre-shared or public KEK wraps the CEK.
    KeyWrap,
}

impl RecipientKind {
    /// Returns the kind of recipient the algorithm is used in, or `None` for
    /// algorithms that don't establish keys.
    pub fn for_algorithm(alg: Algorithm) -> Option<RecipientKind> {
        match alg.family() {
            Family::Direct => Some(RecipientKind::DirectEncryption),
            Family::DirectAgreement => Some(RecipientKind::DirectKeyAgreement),
            Family::AgreementKeyWrap => {
                Some(RecipientKind::KeyAgreementWithKeyWrap)
            }
            Family::KeyWrap | Family::RsaOaep => Some(RecipientKind::KeyWrap),
            _ => None,
        }
    }

    /// Returns whether the kind binds the CEK without wrapping it, which
    /// rules out any other recipient next to it.
    pub fn is_direct(&self) -> bool {
        matches!(
            self,
            RecipientKind::DirectEncryption | RecipientKind::DirectKeyAgreement
        )
    }
}

/// Returns the kind of recipient an algorithm identifier is used in.
pub fn recipient_type_for(id: i64) -> Option<RecipientKind> {
    let kind = Algorithm::from_id(id)
        .ok()
        .and_then(RecipientKind::for_algorithm);
    log::debug!("Algorithm {} maps to recipient kind {:?}", id, kind);

    kind
}

/// The structure a recipient belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Context {
    /// Recipient of a `COSE_Encrypt`.
    EncRecipient,
    /// Recipient of a `COSE_Mac`.
    MacRecipient,
    /// Recipient nested in another recipient.
    RecRecipient,
}

impl Context {
    /// Returns the context string used in the `Enc_structure`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Context::EncRecipient => "Enc_Recipient",
            Context::MacRecipient => "Mac_Recipient",
            Context::RecRecipient => "Rec_Recipient",
        }
    }
}

/// Identifies a recipient in a [`Recipients`] arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecipientId(usize);

/// Values a recipient needs that are never put on the wire.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LocalAttributes {
    /// The other party's static public key.
    pub static_key: Option<CoseKey>,
    /// Party information and supplementary data for the KDF.
    pub kdf: KdfParams,
}

/// A single recipient structure.
#[derive(Clone, Debug)]
pub struct Recipient {
    kind: RecipientKind,
    headers: Headers,
    payload: Vec<u8>,
    key: Option<CoseKey>,
    local: LocalAttributes,
    context: Context,
    children: Vec<RecipientId>,
    parent: Option<RecipientId>,
    // Set once a direct key agreement was executed
    agreed: Option<CoseKey>,
}

impl Recipient {
    /// Returns a recipient for the algorithm in the headers.
    pub fn new(headers: Headers) -> Result<Recipient> {
        let alg = headers.algorithm()?;
        let kind = RecipientKind::for_algorithm(alg).ok_or(
            Error::InvalidAlgorithm("algorithm doesn't establish a key"),
        )?;

        Ok(Recipient {
            kind,
            headers,
            payload: Vec::new(),
            key: None,
            local: LocalAttributes::default(),
            context: Context::EncRecipient,
            children: Vec::new(),
            parent: None,
            agreed: None,
        })
    }

    /// Returns a recipient with the algorithm set in the header where it
    /// usually goes for its kind.
    ///
    /// Key agreement algorithms go into the protected header, the others into
    /// the unprotected one, since AES key wrap recipients must not have a
    /// protected header.
    pub fn for_algorithm(alg: Algorithm) -> Result<Recipient> {
        let mut headers = Headers::new();
        match RecipientKind::for_algorithm(alg) {
            Some(RecipientKind::DirectKeyAgreement)
            | Some(RecipientKind::KeyAgreementWithKeyWrap) => headers
                .set_protected(HeaderAttribute::Algorithm, alg.to_value())?,
            _ => headers
                .set_unprotected(HeaderAttribute::Algorithm, alg.to_value())?,
        }

        Recipient::new(headers)
    }

    /// Sets the key this party holds for the recipient.
    pub fn with_key(mut self, key: CoseKey) -> Recipient {
        self.key = Some(key);
        self
    }

    /// Sets the other party's static public key.
    pub fn with_static_key(mut self, key: CoseKey) -> Recipient {
        self.local.static_key = Some(key);
        self
    }

    pub fn kind(&self) -> RecipientKind {
        self.kind
    }

    pub fn context(&self) -> Context {
        self.context
    }

    pub fn algorithm(&self) -> Result<Algorithm> {
        self.headers.algorithm()
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Sets an attribute of the protected header.
    ///
    /// The algorithm can't be changed, it determines the kind.
    pub fn set_protected(
        &mut self,
        attribute: HeaderAttribute,
        value: Value,
    ) -> Result<()> {
        fixed_algorithm(attribute)?;
        self.headers.set_protected(attribute, value)
    }

    /// Sets an attribute of the unprotected header.
    pub fn set_unprotected(
        &mut self,
        attribute: HeaderAttribute,
        value: Value,
    ) -> Result<()> {
        fixed_algorithm(attribute)?;
        self.headers.set_unprotected(attribute, value)
    }

    /// Removes an attribute from whichever header carries it.
    pub fn remove_header(
        &mut self,
        attribute: HeaderAttribute,
    ) -> Result<Option<Value>> {
        fixed_algorithm(attribute)?;
        Ok(self
            .headers
            .remove_protected(attribute)
            .or_else(|| self.headers.remove_unprotected(attribute)))
    }

    /// Returns the encrypted key, empty for recipients that carry none.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn set_payload(&mut self, payload: Vec<u8>) {
        self.payload = payload;
    }

    pub fn key(&self) -> Option<&CoseKey> {
        self.key.as_ref()
    }

    pub fn set_key(&mut self, key: Option<CoseKey>) {
        self.key = key;
    }

    pub fn local(&self) -> &LocalAttributes {
        &self.local
    }

    pub fn local_mut(&mut self) -> &mut LocalAttributes {
        &mut self.local
    }

    pub fn children(&self) -> &[RecipientId] {
        &self.children
    }

    pub fn parent(&self) -> Option<RecipientId> {
        self.parent
    }
}

fn fixed_algorithm(attribute: HeaderAttribute) -> Result<()> {
    if attribute == HeaderAttribute::Algorithm {
        return Err(Error::InvalidAlgorithm(
            "algorithm of a recipient can't be changed",
        ));
    }

    Ok(())
}

/// Checks that no recipient in the set binds the CEK directly while there
/// are others next to it.
pub fn verify_recipients<'a, I>(recipients: I) -> Result<()>
where
    I: IntoIterator<Item = &'a Recipient>,
{
    let kinds: Vec<RecipientKind> =
        recipients.into_iter().map(Recipient::kind).collect();
    if kinds.len() > 1 {
        if kinds.contains(&RecipientKind::DirectEncryption) {
            return Err(Error::InvalidRecipientConfiguration(
                "direct encryption must be the only recipient",
            ));
        }
        if kinds.contains(&RecipientKind::DirectKeyAgreement) {
            return Err(Error::InvalidRecipientConfiguration(
                "direct key agreement must be the only recipient",
            ));
        }
    }

    Ok(())
}

/// The recipient tree of one message.
#[derive(Clone, Debug)]
pub struct Recipients {
    nodes: Vec<Recipient>,
    top: Vec<RecipientId>,
    context: Context,
}

impl Default for Recipients {
    fn default() -> Recipients {
        Recipients::new(Context::EncRecipient)
    }
}

impl Recipients {
    /// Returns an empty tree whose top level recipients get `context`.
    pub fn new(context: Context) -> Recipients {
        Recipients {
            nodes: Vec::new(),
            top: Vec::new(),
            context,
        }
    }

    /// Adds a recipient without attaching it anywhere in the tree.
    pub fn insert(&mut self, recipient: Recipient) -> RecipientId {
        self.nodes.push(Recipient {
            children: Vec::new(),
            parent: None,
            ..recipient
        });
        RecipientId(self.nodes.len() - 1)
    }

    /// Adds a recipient to the top level.
    pub fn push(&mut self, recipient: Recipient) -> Result<RecipientId> {
        let id = self.insert(recipient);
        self.attach(None, id)?;

        Ok(id)
    }

    /// Adds a recipient nested in `parent`.
    pub fn push_nested(
        &mut self,
        parent: RecipientId,
        recipient: Recipient,
    ) -> Result<RecipientId> {
        self.get(parent)?;
        let id = self.insert(recipient);
        self.attach(Some(parent), id)?;

        Ok(id)
    }

    /// Attaches a detached recipient to `parent`, or to the top level.
    ///
    /// Fails if the recipient is already part of the tree, or if attaching
    /// it would make a recipient its own ancestor.
    pub fn attach(
        &mut self,
        parent: Option<RecipientId>,
        child: RecipientId,
    ) -> Result<()> {
        if self.get(child)?.parent.is_some() || self.top.contains(&child) {
            return Err(Error::InvalidRecipientConfiguration(
                "recipient is already in the tree",
            ));
        }
        match parent {
            None => {
                let context = self.context;
                self.top.push(child);
                self.node_mut(child).context = context;
            }
            Some(parent) => {
                if self.has_recipient(parent, child) {
                    return Err(Error::InvalidRecipientConfiguration(
                        "recipient would contain itself",
                    ));
                }
                self.get_mut(parent)?.children.push(child);
                let node = self.node_mut(child);
                node.parent = Some(parent);
                node.context = Context::RecRecipient;
            }
        }

        Ok(())
    }

    pub fn get(&self, id: RecipientId) -> Result<&Recipient> {
        self.nodes.get(id.0).ok_or(Error::InvalidRecipientConfiguration(
            "no such recipient",
        ))
    }

    pub fn get_mut(&mut self, id: RecipientId) -> Result<&mut Recipient> {
        self.nodes
            .get_mut(id.0)
            .ok_or(Error::InvalidRecipientConfiguration("no such recipient"))
    }

    // Only for ids this arena handed out
    fn node_mut(&mut self, id: RecipientId) -> &mut Recipient {
        &mut self.nodes[id.0]
    }

    /// Returns the top level recipients.
    pub fn top_level(&self) -> &[RecipientId] {
        &self.top
    }

    pub fn is_empty(&self) -> bool {
        self.top.is_empty()
    }

    /// Returns whether `target` is `within` or one of its descendants.
    pub fn has_recipient(
        &self,
        target: RecipientId,
        within: RecipientId,
    ) -> bool {
        if target == within {
            return true;
        }
        // Walk up from the target instead of down from `within`, the path to
        // the root is unique
        let mut current = self.nodes.get(target.0).and_then(|n| n.parent);
        let mut steps = 0;
        while let Some(id) = current {
            if id == within {
                return true;
            }
            steps += 1;
            if steps > self.nodes.len() {
                break;
            }
            current = self.nodes.get(id.0).and_then(|n| n.parent);
        }

        false
    }

    /// Returns whether the recipient is attached anywhere below the top
    /// level.
    pub fn contains(&self, target: RecipientId) -> bool {
        self.top.iter().any(|&top| self.has_recipient(target, top))
    }

    /// Checks the single recipient rules on the top level and on every list
    /// of nested recipients.
    pub fn verify(&self) -> Result<()> {
        verify_recipients(self.siblings(&self.top)?)?;
        // Only what hangs below the top level, detached nodes don't count
        let mut pending = self.top.clone();
        while let Some(id) = pending.pop() {
            let node = self.get(id)?;
            verify_recipients(self.siblings(&node.children)?)?;
            pending.extend_from_slice(&node.children);
        }

        Ok(())
    }

    fn siblings(&self, ids: &[RecipientId]) -> Result<Vec<&Recipient>> {
        ids.iter().map(|&id| self.get(id)).collect()
    }
}
