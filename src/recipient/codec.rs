//! Conversion between the recipient tree and `COSE_recipient` structures.

use alloc::vec::Vec;

use super::{
    Recipient, RecipientId, RecipientKind, Recipients, MAX_RECIPIENT_DEPTH,
};
use crate::{
    algorithm::Family, cbor, cbor::Value, header::Headers, Error, Result,
};

impl Recipients {
    /// Decodes a `COSE_recipient` with its nested recipients and adds it to
    /// the top level.
    ///
    /// Nothing is added if decoding fails.
    pub fn from_cose_object(&mut self, value: &Value) -> Result<RecipientId> {
        let mark = self.nodes.len();
        let id = self
            .decode_node(value, 0)
            .and_then(|id| self.attach(None, id).map(|_| id));
        if id.is_err() {
            self.nodes.truncate(mark);
        }

        id
    }

    /// Decodes the CBOR encoding of a `COSE_recipient` and adds it to the
    /// top level.
    pub fn decode(&mut self, bytes: &[u8]) -> Result<RecipientId> {
        let value: Value = cbor::decode(bytes)?;
        self.from_cose_object(&value)
    }

    /// Decodes the array of recipients in a message, adding either all of
    /// them or none.
    pub fn from_cose_objects(&mut self, value: &Value) -> Result<()> {
        let recipients = value
            .as_array()
            .ok_or(Error::InvalidMessage("recipients are not an array"))?;
        let (nodes, top) = (self.nodes.len(), self.top.len());
        for recipient in recipients {
            if let Err(e) = self.from_cose_object(recipient) {
                self.nodes.truncate(nodes);
                self.top.truncate(top);
                return Err(e);
            }
        }

        Ok(())
    }

    fn decode_node(
        &mut self,
        value: &Value,
        depth: usize,
    ) -> Result<RecipientId> {
        if depth > MAX_RECIPIENT_DEPTH {
            return Err(Error::InvalidMessage("recipients nested too deeply"));
        }
        let items = value
            .as_array()
            .ok_or(Error::InvalidMessage("recipient is not an array"))?;
        if items.len() < 3 {
            return Err(Error::InvalidMessage(
                "recipient has fewer than 3 elements",
            ));
        }
        if items.len() > 4 {
            return Err(Error::InvalidMessage(
                "recipient has more than 4 elements",
            ));
        }
        let protected = items[0].as_bytes().ok_or(Error::InvalidMessage(
            "protected header is not a byte string",
        ))?;
        let headers = Headers::from_parts(protected, &items[1])?;
        let payload = items[2]
            .as_bytes()
            .ok_or(Error::InvalidMessage("payload is not a byte string"))?;

        let recipient = Recipient::new(headers)?;
        let alg = recipient.algorithm()?;
        log::trace!(
            "Decoding {:?} recipient with {} at depth {}",
            recipient.kind,
            alg,
            depth
        );
        match recipient.kind {
            RecipientKind::DirectEncryption
            | RecipientKind::DirectKeyAgreement
            | RecipientKind::KeyAgreementWithKeyWrap
                if !payload.is_empty() =>
            {
                return Err(Error::MalformedMessage(
                    "recipient must not have a payload",
                ));
            }
            RecipientKind::KeyWrap
                if alg.family() == Family::KeyWrap && !protected.is_empty() =>
            {
                return Err(Error::MalformedMessage(
                    "AES key wrap recipient must not have a protected header",
                ));
            }
            _ => (),
        }

        let id = self.insert(Recipient {
            payload: payload.to_vec(),
            ..recipient
        });
        if let Some(nested) = items.get(3) {
            let nested = nested.as_array().ok_or(Error::InvalidMessage(
                "nested recipients are not an array",
            ))?;
            for child in nested {
                let child = self.decode_node(child, depth + 1)?;
                self.attach(Some(id), child)?;
            }
        }

        Ok(id)
    }

    /// Returns the `COSE_recipient` structure of the recipient, including
    /// its nested recipients.
    pub fn to_cose_object(&self, id: RecipientId) -> Result<Value> {
        self.encode_node(id, 0)
    }

    /// Returns the CBOR encoding of the recipient.
    pub fn encode(&self, id: RecipientId) -> Result<Vec<u8>> {
        Ok(cbor::encode(self.to_cose_object(id)?)?)
    }

    /// Returns the array of top level recipients of a message.
    pub fn to_cose_objects(&self) -> Result<Value> {
        let recipients = self
            .top
            .iter()
            .map(|&id| self.to_cose_object(id))
            .collect::<Result<Vec<_>>>()?;

        Ok(Value::Array(recipients))
    }

    fn encode_node(&self, id: RecipientId, depth: usize) -> Result<Value> {
        if depth > MAX_RECIPIENT_DEPTH {
            return Err(Error::InvalidMessage("recipients nested too deeply"));
        }
        let node = self.get(id)?;
        let mut items = vec![
            Value::Bytes(node.headers.serialize_protected()?),
            node.headers.unprotected_value(),
            Value::Bytes(node.payload.clone()),
        ];
        // The nested array is left out when there is nothing in it
        if !node.children.is_empty() {
            let nested = node
                .children
                .iter()
                .map(|&child| self.encode_node(child, depth + 1))
                .collect::<Result<Vec<_>>>()?;
            items.push(Value::Array(nested));
        }

        Ok(Value::Array(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        algorithm::Algorithm,
        attribute::HeaderAttribute,
        crypto::RustCrypto,
        key::CoseKey,
        recipient::{test_vectors::*, Context, Recipient},
    };

    fn decode(bytes: &[u8]) -> Result<(Recipients, RecipientId)> {
        let mut recipients = Recipients::default();
        let id = recipients.decode(bytes)?;
        Ok((recipients, id))
    }

    #[test]
    fn key_agreement_with_key_wrap() {
        let bytes = kakw_recipient(false);
        let (recipients, id) = decode(&bytes).unwrap();
        let recipient = recipients.get(id).unwrap();
        assert_eq!(RecipientKind::KeyAgreementWithKeyWrap, recipient.kind());
        assert_eq!(Algorithm::EcdhEsA128Kw, recipient.algorithm().unwrap());
        assert_eq!(Context::EncRecipient, recipient.context());
        assert!(recipient.payload().is_empty());
        assert!(recipient.children().is_empty());
        assert!(recipient
            .headers()
            .get_unprotected(HeaderAttribute::EphemeralKey)
            .is_some());

        assert_eq!(bytes, recipients.encode(id).unwrap());
    }

    #[test]
    fn nested() {
        let bytes = kakw_recipient(true);
        let (recipients, id) = decode(&bytes).unwrap();
        let children = recipients.get(id).unwrap().children();
        assert_eq!(1, children.len());
        let child = recipients.get(children[0]).unwrap();
        assert_eq!(RecipientKind::KeyWrap, child.kind());
        assert_eq!(Context::RecRecipient, child.context());
        assert_eq!(Some(id), child.parent());
        assert_eq!(&[0x11; 24][..], child.payload());
        assert_eq!(
            Some(&Value::Bytes(b"kid".to_vec())),
            child.headers().get(HeaderAttribute::Kid)
        );

        assert_eq!(bytes, recipients.encode(id).unwrap());
    }

    #[test]
    fn empty_nested_array() {
        let mut bytes = kakw_recipient(false);
        bytes[0] = 0x84;
        bytes.push(0x80);
        let (recipients, id) = decode(&bytes).unwrap();
        assert!(recipients.get(id).unwrap().children().is_empty());
        // Comes back without the empty array
        assert_eq!(kakw_recipient(false), recipients.encode(id).unwrap());
    }

    #[test]
    fn payload_rules() {
        // Key agreement with key wrap and a payload
        let mut bytes = kakw_recipient(false);
        let last = bytes.len() - 1;
        bytes[last] = 0x41;
        bytes.push(0x00);
        assert!(matches!(decode(&bytes), Err(Error::MalformedMessage(_))));

        // Direct encryption with a payload
        assert!(matches!(
            decode(&[0x83, 0x40, 0xA1, 0x01, 0x25, 0x41, 0x00]),
            Err(Error::MalformedMessage(_))
        ));
        assert!(decode(&[0x83, 0x40, 0xA1, 0x01, 0x25, 0x40]).is_ok());

        // AES key wrap with a protected header
        let mut bytes = vec![0x83, 0x43, 0xA1, 0x01, 0x22, 0xA0, 0x58, 0x18];
        bytes.extend_from_slice(&[0x11; 24]);
        assert!(matches!(decode(&bytes), Err(Error::MalformedMessage(_))));
    }

    #[test]
    fn structure() {
        // Not an array
        assert!(matches!(decode(&[0xA0]), Err(Error::InvalidMessage(_))));
        // Too short and too long
        assert!(matches!(
            decode(&[0x82, 0x40, 0xA0]),
            Err(Error::InvalidMessage(_))
        ));
        assert!(matches!(
            decode(&[0x85, 0x40, 0xA1, 0x01, 0x25, 0x40, 0x80, 0x80]),
            Err(Error::InvalidMessage(_))
        ));
        // Protected header not a byte string
        assert!(matches!(
            decode(&[0x83, 0xA0, 0xA1, 0x01, 0x25, 0x40]),
            Err(Error::InvalidMessage(_))
        ));
        // Payload not a byte string
        assert!(matches!(
            decode(&[0x83, 0x40, 0xA1, 0x01, 0x25, 0xF6]),
            Err(Error::InvalidMessage(_))
        ));
        // Nested recipients not an array
        assert!(matches!(
            decode(&[0x84, 0x40, 0xA1, 0x01, 0x22, 0x40, 0xA0]),
            Err(Error::InvalidMessage(_))
        ));
        // No algorithm, or one that doesn't establish a key
        assert!(matches!(
            decode(&[0x83, 0x40, 0xA0, 0x40]),
            Err(Error::InvalidAlgorithm(_))
        ));
        assert!(matches!(
            decode(&[0x83, 0x40, 0xA1, 0x01, 0x01, 0x40]),
            Err(Error::InvalidAlgorithm(_))
        ));
    }

    #[test]
    fn failed_decode_adds_nothing() {
        // A128KW with nested [direct, A128KW, [h'']], the last one is broken
        let mut bytes = vec![0x84, 0x40, 0xA1, 0x01, 0x22, 0x58, 0x18];
        bytes.extend_from_slice(&[0x11; 24]);
        bytes.extend_from_slice(&[0x83, 0x83, 0x40, 0xA1, 0x01, 0x25, 0x40]);
        bytes.extend_from_slice(&KW_RECIPIENT);
        bytes.extend_from_slice(&[0x81, 0x40]);

        let mut recipients = Recipients::default();
        assert!(matches!(
            recipients.decode(&bytes),
            Err(Error::InvalidMessage(_))
        ));
        assert!(recipients.is_empty());
        assert!(recipients.nodes.is_empty());

        let id = recipients
            .push(
                Recipient::for_algorithm(Algorithm::A128Kw)
                    .unwrap()
                    .with_key(CoseKey::symmetric(&KEK_128)),
            )
            .unwrap();
        assert_eq!(&[id], recipients.top_level());
        assert!(recipients.verify().is_ok());
        assert!(recipients
            .establish_cek(Algorithm::A128Gcm, &RustCrypto)
            .is_ok());
    }

    #[test]
    fn failed_list_decode_adds_nothing() {
        let mut recipients = Recipients::default();
        let kept = recipients.decode(&KW_RECIPIENT).unwrap();
        let value = Value::Array(vec![
            cbor::decode(&KW_RECIPIENT).unwrap(),
            Value::Array(vec![Value::Bytes(Vec::new())]),
        ]);
        assert!(matches!(
            recipients.from_cose_objects(&value),
            Err(Error::InvalidMessage(_))
        ));
        assert_eq!(&[kept], recipients.top_level());
        assert_eq!(1, recipients.nodes.len());
    }

    #[test]
    fn nesting_depth_bounded() {
        let leaf = Value::Array(vec![
            Value::Bytes(Vec::new()),
            Value::Map(vec![(Value::Integer(1), Value::Integer(-6))]),
            Value::Bytes(Vec::new()),
        ]);
        let wrap = |inner: Value| {
            Value::Array(vec![
                Value::Bytes(Vec::new()),
                Value::Map(vec![(Value::Integer(1), Value::Integer(-3))]),
                Value::Bytes(vec![0; 24]),
                Value::Array(vec![inner]),
            ])
        };

        let mut value = leaf;
        for _ in 0..MAX_RECIPIENT_DEPTH {
            value = wrap(value);
        }
        let mut recipients = Recipients::default();
        let id = recipients.from_cose_object(&value).unwrap();
        assert_eq!(value, recipients.to_cose_object(id).unwrap());

        let value = wrap(value);
        let mut recipients = Recipients::default();
        assert!(matches!(
            recipients.from_cose_object(&value),
            Err(Error::InvalidMessage(_))
        ));
    }

    #[test]
    fn message_recipients() {
        let mut recipients = Recipients::new(Context::MacRecipient);
        let value = Value::Array(vec![
            cbor::decode(&KW_RECIPIENT).unwrap(),
            cbor::decode(&KW_RECIPIENT).unwrap(),
        ]);
        recipients.from_cose_objects(&value).unwrap();
        assert_eq!(2, recipients.top_level().len());
        let first = recipients.get(recipients.top_level()[0]).unwrap();
        assert_eq!(Context::MacRecipient, first.context());
        assert_eq!(value, recipients.to_cose_objects().unwrap());
    }
}
