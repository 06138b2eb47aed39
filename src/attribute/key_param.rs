use super::validate;
use crate::{cbor::Value, error::Lookup, Error, Result};

registry! {
    /// COSE key types.
    pub enum KeyType {
        unknown = |_| Error::InvalidKeyType("unknown key type");
        invalid = Error::InvalidKeyType("key type must be int or tstr");
        Okp = 1 => "OKP",
        Ec2 = 2 => "EC2",
        Rsa = 3 => "RSA",
        Symmetric = 4 => "SYMMETRIC",
    }
}

registry! {
    /// Elliptic curves for OKP and EC2 keys.
    pub enum Curve {
        unknown = |_| Error::InvalidKeyFormat("unknown curve");
        invalid = Error::InvalidKeyFormat("curve must be int or tstr");
        P256 = 1 => "P_256",
        P384 = 2 => "P_384",
        P521 = 3 => "P_521",
        X25519 = 4 => "X25519",
        X448 = 5 => "X448",
        Ed25519 = 6 => "ED25519",
        Ed448 = 7 => "ED448",
        Secp256k1 = 8 => "SECP256K1",
    }
}

impl Curve {
    /// Returns the key type keys on this curve have.
    pub fn key_type(&self) -> KeyType {
        match self {
            Curve::X25519 | Curve::X448 | Curve::Ed25519 | Curve::Ed448 => {
                KeyType::Okp
            }
            Curve::P256 | Curve::P384 | Curve::P521 | Curve::Secp256k1 => {
                KeyType::Ec2
            }
        }
    }

    /// Returns the length of a coordinate (or OKP public key) in bytes.
    pub fn size(&self) -> usize {
        match self {
            Curve::P256 | Curve::Secp256k1 | Curve::X25519 | Curve::Ed25519 => {
                32
            }
            Curve::P384 => 48,
            Curve::P521 => 66,
            Curve::X448 => 56,
            Curve::Ed448 => 57,
        }
    }
}

registry! {
    /// Operations a key may be used for.
    pub enum KeyOp {
        unknown = |_| Error::InvalidKeyFormat("unknown key operation");
        invalid = Error::InvalidKeyFormat("key operation must be int or tstr");
        Sign = 1 => "SIGN",
        Verify = 2 => "VERIFY",
        Encrypt = 3 => "ENCRYPT",
        Decrypt = 4 => "DECRYPT",
        WrapKey = 5 => "WRAP",
        UnwrapKey = 6 => "UNWRAP",
        DeriveKey = 7 => "DERIVE_KEY",
        DeriveBits = 8 => "DERIVE_BITS",
        MacCreate = 9 => "MAC_CREATE",
        MacVerify = 10 => "MAC_VERIFY",
    }
}

registry! {
    /// Parameters every key type shares.
    pub enum CommonParam {
        unknown = Error::UnknownAttribute;
        invalid = Error::InvalidKeyFormat("key label must be int or tstr");
        Kty = 1 => "KTY",
        Kid = 2 => "KID",
        Alg = 3 => "ALG",
        KeyOps = 4 => "KEY_OPS",
        BaseIv = 5 => "BASE_IV",
    }
}

registry! {
    /// Parameters of octet key pairs.
    pub enum OkpParam {
        unknown = Error::UnknownAttribute;
        invalid = Error::InvalidKeyFormat("key label must be int or tstr");
        Curve = -1 => "CURVE",
        X = -2 => "X",
        D = -4 => "D",
    }
}

registry! {
    /// Parameters of double coordinate elliptic curve keys.
    pub enum Ec2Param {
        unknown = Error::UnknownAttribute;
        invalid = Error::InvalidKeyFormat("key label must be int or tstr");
        Curve = -1 => "CURVE",
        X = -2 => "X",
        Y = -3 => "Y",
        D = -4 => "D",
    }
}

registry! {
    /// Parameters of RSA keys.
    pub enum RsaParam {
        unknown = Error::UnknownAttribute;
        invalid = Error::InvalidKeyFormat("key label must be int or tstr");
        N = -1 => "N",
        E = -2 => "E",
        D = -3 => "D",
        P = -4 => "P",
        Q = -5 => "Q",
        DP = -6 => "DP",
        DQ = -7 => "DQ",
        QInv = -8 => "QINV",
    }
}

registry! {
    /// Parameters of symmetric keys.
    pub enum SymmetricParam {
        unknown = Error::UnknownAttribute;
        invalid = Error::InvalidKeyFormat("key label must be int or tstr");
        K = -1 => "K",
    }
}

/// A key parameter, resolved in the context of a key type.
///
/// Negative identifiers mean different things for different key types, so
/// lookups always need the key type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyParam {
    Common(CommonParam),
    Okp(OkpParam),
    Ec2(Ec2Param),
    Rsa(RsaParam),
    Symmetric(SymmetricParam),
}

impl KeyParam {
    /// Every parameter registered for the key type.
    pub fn all(kty: KeyType) -> impl Iterator<Item = KeyParam> {
        let specific: &'static [KeyParam] = match kty {
            KeyType::Okp => &[
                KeyParam::Okp(OkpParam::Curve),
                KeyParam::Okp(OkpParam::X),
                KeyParam::Okp(OkpParam::D),
            ],
            KeyType::Ec2 => &[
                KeyParam::Ec2(Ec2Param::Curve),
                KeyParam::Ec2(Ec2Param::X),
                KeyParam::Ec2(Ec2Param::Y),
                KeyParam::Ec2(Ec2Param::D),
            ],
            KeyType::Rsa => &[
                KeyParam::Rsa(RsaParam::N),
                KeyParam::Rsa(RsaParam::E),
                KeyParam::Rsa(RsaParam::D),
                KeyParam::Rsa(RsaParam::P),
                KeyParam::Rsa(RsaParam::Q),
                KeyParam::Rsa(RsaParam::DP),
                KeyParam::Rsa(RsaParam::DQ),
                KeyParam::Rsa(RsaParam::QInv),
            ],
            KeyType::Symmetric => &[KeyParam::Symmetric(SymmetricParam::K)],
        };
        CommonParam::ALL
            .iter()
            .map(|&c| KeyParam::Common(c))
            .chain(specific.iter().copied())
    }

    /// Resolves a parameter of the key type by its identifier.
    pub fn from_id(kty: KeyType, id: i64) -> Result<KeyParam> {
        if id > 0 {
            return CommonParam::from_id(id).map(KeyParam::Common);
        }
        match kty {
            KeyType::Okp => OkpParam::from_id(id).map(KeyParam::Okp),
            KeyType::Ec2 => Ec2Param::from_id(id).map(KeyParam::Ec2),
            KeyType::Rsa => RsaParam::from_id(id).map(KeyParam::Rsa),
            KeyType::Symmetric => {
                SymmetricParam::from_id(id).map(KeyParam::Symmetric)
            }
        }
    }

    /// Resolves a parameter of the key type by its name, ignoring case.
    pub fn from_name(kty: KeyType, name: &str) -> Result<KeyParam> {
        Self::all(kty)
            .find(|p| p.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::UnknownAttribute(Lookup::Name(name.into())))
    }

    /// Resolves a parameter of the key type from a map label.
    pub fn from_value(kty: KeyType, label: &Value) -> Result<KeyParam> {
        match label {
            Value::Integer(id) => Self::from_id(kty, *id),
            Value::Text(name) => Self::from_name(kty, name),
            _ => Err(Error::InvalidKeyFormat("key label must be int or tstr")),
        }
    }

    pub fn identifier(&self) -> i64 {
        match self {
            KeyParam::Common(p) => p.identifier(),
            KeyParam::Okp(p) => p.identifier(),
            KeyParam::Ec2(p) => p.identifier(),
            KeyParam::Rsa(p) => p.identifier(),
            KeyParam::Symmetric(p) => p.identifier(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            KeyParam::Common(p) => p.name(),
            KeyParam::Okp(p) => p.name(),
            KeyParam::Ec2(p) => p.name(),
            KeyParam::Rsa(p) => p.name(),
            KeyParam::Symmetric(p) => p.name(),
        }
    }

    /// Returns whether a key of this type can't exist without the parameter.
    pub fn is_required(&self) -> bool {
        matches!(
            self,
            KeyParam::Common(CommonParam::Kty)
                | KeyParam::Okp(OkpParam::Curve)
                | KeyParam::Okp(OkpParam::X)
                | KeyParam::Ec2(Ec2Param::Curve)
                | KeyParam::Ec2(Ec2Param::X)
                | KeyParam::Rsa(RsaParam::N)
                | KeyParam::Rsa(RsaParam::E)
                | KeyParam::Symmetric(SymmetricParam::K)
        )
    }

    /// Returns whether the parameter is a private component of an asymmetric
    /// key.
    pub fn is_private(&self) -> bool {
        matches!(
            self,
            KeyParam::Okp(OkpParam::D)
                | KeyParam::Ec2(Ec2Param::D)
                | KeyParam::Rsa(
                    RsaParam::D
                        | RsaParam::P
                        | RsaParam::Q
                        | RsaParam::DP
                        | RsaParam::DQ
                        | RsaParam::QInv
                )
        )
    }

    /// Checks that `value` is acceptable for this parameter.
    pub fn validate(&self, value: &Value) -> Result<()> {
        match self {
            KeyParam::Common(CommonParam::Kty) => {
                KeyType::from_value(value).map(|_| ())
            }
            KeyParam::Common(CommonParam::Alg) => validate::algorithm(value),
            KeyParam::Common(CommonParam::KeyOps) => validate::key_ops(value),
            KeyParam::Okp(OkpParam::Curve) => {
                validate::curve(value, KeyType::Okp)
            }
            KeyParam::Ec2(Ec2Param::Curve) => {
                validate::curve(value, KeyType::Ec2)
            }
            // The y-coordinate may be a sign bit for point compression
            KeyParam::Ec2(Ec2Param::Y) => match value {
                Value::Bytes(_) | Value::Bool(_) => Ok(()),
                _ => Err(Error::InvalidKeyFormat("y must be bstr or bool")),
            },
            _ => match value {
                Value::Bytes(_) => Ok(()),
                _ => Err(Error::InvalidKeyFormat(
                    "key parameter must be a byte string",
                )),
            },
        }
    }
}
