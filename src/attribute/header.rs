use super::validate;
use crate::{cbor::Value, Error, Result};

registry! {
    /// The header parameters a message or recipient can carry.
    pub enum HeaderAttribute {
        unknown = Error::UnknownAttribute;
        invalid = Error::InvalidHeader("header label must be int or tstr");
        Algorithm = 1 => "ALG",
        Critical = 2 => "CRITICAL",
        ContentType = 3 => "CONTENT_TYPE",
        Kid = 4 => "KID",
        Iv = 5 => "IV",
        PartialIv = 6 => "PARTIAL_IV",
        CounterSignature = 7 => "COUNTER_SIGNATURE",
        CounterSignature0 = 9 => "COUNTER_SIGNATURE0",
        KidContext = 10 => "KID_CONTEXT",
        X5Bag = 32 => "X5BAG",
        X5Chain = 33 => "X5CHAIN",
        X5T = 34 => "X5T",
        X5U = 35 => "X5U",
        /// Public part of the sender's ephemeral key.
        EphemeralKey = -1 => "EPHEMERAL_KEY",
        /// The sender's static public key.
        StaticKey = -2 => "STATIC_KEY",
        StaticKeyId = -3 => "STATIC_KEY_ID",
        Salt = -20 => "SALT",
        PartyUIdentity = -21 => "PARTY_U_IDENTITY",
        PartyUNonce = -22 => "PARTY_U_NONCE",
        PartyUOther = -23 => "PARTY_U_OTHER",
        PartyVIdentity = -24 => "PARTY_V_IDENTITY",
        PartyVNonce = -25 => "PARTY_V_NONCE",
        PartyVOther = -26 => "PARTY_V_OTHER",
    }
}

impl HeaderAttribute {
    /// Checks that `value` is acceptable for this attribute.
    pub fn validate(&self, value: &Value) -> Result<()> {
        use HeaderAttribute::*;

        match self {
            Algorithm => validate::algorithm(value),
            Critical => validate::critical(value),
            ContentType => validate::content_type(value),
            Kid | Iv | PartialIv | KidContext | CounterSignature0
            | StaticKeyId => validate::kid(value),
            CounterSignature => validate::counter_signature(value),
            X5Bag | X5Chain => validate::certificates(value),
            X5T => validate::thumbprint(value),
            X5U => validate::uri(value),
            EphemeralKey | StaticKey => validate::cose_key(value),
            PartyUNonce | PartyVNonce => validate::nonce(value),
            Salt | PartyUIdentity | PartyUOther | PartyVIdentity
            | PartyVOther => validate::opaque(value),
        }
    }
}
