//! The `COSE_KDF_Context` that binds a derived key to its algorithm, the
//! parties and the protected header.

use alloc::vec::Vec;

use crate::{
    algorithm::Algorithm, attribute::HeaderAttribute, cbor, cbor::Value,
    header::Headers, Error, Result,
};

/// One side of a key agreement.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PartyInfo {
    pub identity: Option<Vec<u8>>,
    /// A byte string, integer or nil.
    pub nonce: Option<Value>,
    pub other: Option<Vec<u8>>,
}

impl PartyInfo {
    fn to_value(&self) -> Value {
        Value::Array(vec![
            opt_bytes(&self.identity),
            self.nonce.clone().unwrap_or(Value::Null),
            opt_bytes(&self.other),
        ])
    }
}

/// The public supplementary information.
#[derive(Clone, Debug, PartialEq)]
pub struct SuppPubInfo {
    /// Length of the derived key in bytes, written in bits on the wire.
    pub key_data_length: usize,
    /// The serialized protected header of the structure the key is for.
    pub protected: Vec<u8>,
    pub other: Option<Vec<u8>>,
}

/// Key derivation inputs that don't travel in the headers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KdfParams {
    pub party_u: PartyInfo,
    pub party_v: PartyInfo,
    pub supp_pub_other: Option<Vec<u8>>,
    pub supp_priv_info: Option<Vec<u8>>,
}

/// The input to the expand step of the key derivation.
#[derive(Clone, Debug, PartialEq)]
pub struct KdfContext {
    pub algorithm: Algorithm,
    pub party_u: PartyInfo,
    pub party_v: PartyInfo,
    pub supp_pub_info: SuppPubInfo,
    pub supp_priv_info: Option<Vec<u8>>,
}

impl KdfContext {
    /// Builds the context for deriving a key for `algorithm`.
    ///
    /// Party information is taken from the headers where present and from
    /// `params` otherwise. Fails if the algorithm has no fixed key length.
    pub fn build(
        algorithm: Algorithm,
        headers: &Headers,
        params: &KdfParams,
    ) -> Result<KdfContext> {
        let key_length = algorithm.key_length().ok_or(
            Error::InvalidAlgorithm("algorithm has no fixed key length"),
        )?;
        let party_u = PartyInfo {
            identity: header_bytes(headers, HeaderAttribute::PartyUIdentity)
                .or_else(|| params.party_u.identity.clone()),
            nonce: headers
                .get(HeaderAttribute::PartyUNonce)
                .cloned()
                .or_else(|| params.party_u.nonce.clone()),
            other: header_bytes(headers, HeaderAttribute::PartyUOther)
                .or_else(|| params.party_u.other.clone()),
        };
        let party_v = PartyInfo {
            identity: header_bytes(headers, HeaderAttribute::PartyVIdentity)
                .or_else(|| params.party_v.identity.clone()),
            nonce: headers
                .get(HeaderAttribute::PartyVNonce)
                .cloned()
                .or_else(|| params.party_v.nonce.clone()),
            other: header_bytes(headers, HeaderAttribute::PartyVOther)
                .or_else(|| params.party_v.other.clone()),
        };
        log::debug!(
            "Building KDF context for {} ({} bytes)",
            algorithm,
            key_length
        );

        Ok(KdfContext {
            algorithm,
            party_u,
            party_v,
            supp_pub_info: SuppPubInfo {
                key_data_length: key_length,
                protected: headers.serialize_protected()?,
                other: params.supp_pub_other.clone(),
            },
            supp_priv_info: params.supp_priv_info.clone(),
        })
    }

    /// Returns the length of the key to derive, in bytes.
    pub fn key_length(&self) -> usize {
        self.supp_pub_info.key_data_length
    }

    /// Returns the CBOR encoded `COSE_KDF_Context`.
    ///
    /// The optional `other` element of `SuppPubInfo` and the trailing
    /// `SuppPrivInfo` are only written when present.
    pub fn encode(&self) -> Result<Vec<u8>> {
        // (keyDataLength, protected, ?other)
        let mut supp_pub_info = vec![
            Value::Integer(self.supp_pub_info.key_data_length as i64 * 8),
            Value::Bytes(self.supp_pub_info.protected.clone()),
        ];
        if let Some(other) = &self.supp_pub_info.other {
            supp_pub_info.push(Value::Bytes(other.clone()));
        }
        // (AlgorithmID, PartyUInfo, PartyVInfo, SuppPubInfo, ?SuppPrivInfo)
        let mut context = vec![
            self.algorithm.to_value(),
            self.party_u.to_value(),
            self.party_v.to_value(),
            Value::Array(supp_pub_info),
        ];
        if let Some(supp_priv_info) = &self.supp_priv_info {
            context.push(Value::Bytes(supp_priv_info.clone()));
        }

        Ok(cbor::encode(Value::Array(context))?)
    }
}

fn header_bytes(
    headers: &Headers,
    attribute: HeaderAttribute,
) -> Option<Vec<u8>> {
    headers
        .get(attribute)
        .and_then(Value::as_bytes)
        .map(<[u8]>::to_vec)
}

fn opt_bytes(bytes: &Option<Vec<u8>>) -> Value {
    bytes.clone().map_or(Value::Null, Value::Bytes)
}
