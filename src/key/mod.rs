//! The `COSE_Key` container for key material.

use alloc::vec::Vec;

use crate::{
    algorithm::Algorithm,
    attribute::{
        CommonParam, Curve, Ec2Param, KeyOp, KeyParam, KeyType, OkpParam,
        RsaParam, SymmetricParam,
    },
    cbor::{self, Value},
    Error, Result,
};

/// A `COSE_Key`: a key type plus the parameters registered for it.
///
/// Parameters are validated when set, and the ones a key of its type can't
/// do without can't be deleted.
#[derive(Clone, Debug, PartialEq)]
pub struct CoseKey {
    kty: KeyType,
    params: Vec<(KeyParam, Value)>,
}

impl CoseKey {
    /// Returns a symmetric key holding the given bytes.
    pub fn symmetric(k: &[u8]) -> CoseKey {
        CoseKey {
            kty: KeyType::Symmetric,
            params: vec![(
                KeyParam::Symmetric(SymmetricParam::K),
                Value::Bytes(k.to_vec()),
            )],
        }
    }

    /// Returns an octet key pair on the curve.
    pub fn okp(curve: Curve, x: &[u8], d: Option<&[u8]>) -> Result<CoseKey> {
        if curve.key_type() != KeyType::Okp {
            return Err(Error::InvalidKeyFormat("curve is not an OKP curve"));
        }
        let mut params = vec![
            (KeyParam::Okp(OkpParam::Curve), curve.to_value()),
            (KeyParam::Okp(OkpParam::X), Value::Bytes(x.to_vec())),
        ];
        if let Some(d) = d {
            params.push((KeyParam::Okp(OkpParam::D), Value::Bytes(d.to_vec())));
        }

        Ok(CoseKey {
            kty: KeyType::Okp,
            params,
        })
    }

    /// Returns an elliptic curve key with both coordinates.
    pub fn ec2(
        curve: Curve,
        x: &[u8],
        y: &[u8],
        d: Option<&[u8]>,
    ) -> Result<CoseKey> {
        if curve.key_type() != KeyType::Ec2 {
            return Err(Error::InvalidKeyFormat("curve is not an EC2 curve"));
        }
        let mut params = vec![
            (KeyParam::Ec2(Ec2Param::Curve), curve.to_value()),
            (KeyParam::Ec2(Ec2Param::X), Value::Bytes(x.to_vec())),
            (KeyParam::Ec2(Ec2Param::Y), Value::Bytes(y.to_vec())),
        ];
        if let Some(d) = d {
            params.push((KeyParam::Ec2(Ec2Param::D), Value::Bytes(d.to_vec())));
        }

        Ok(CoseKey {
            kty: KeyType::Ec2,
            params,
        })
    }

    /// Returns an RSA public key. Private components are added with `set`.
    pub fn rsa(n: &[u8], e: &[u8]) -> CoseKey {
        CoseKey {
            kty: KeyType::Rsa,
            params: vec![
                (KeyParam::Rsa(RsaParam::N), Value::Bytes(n.to_vec())),
                (KeyParam::Rsa(RsaParam::E), Value::Bytes(e.to_vec())),
            ],
        }
    }

    pub fn kty(&self) -> KeyType {
        self.kty
    }

    /// Returns the value of a parameter.
    pub fn get(&self, param: KeyParam) -> Option<&Value> {
        if param == KeyParam::Common(CommonParam::Kty) {
            return None;
        }
        self.params.iter().find(|(p, _)| *p == param).map(|(_, v)| v)
    }

    /// Sets a parameter, after checking it belongs to the key type and
    /// validating the value.
    pub fn set(&mut self, param: KeyParam, value: Value) -> Result<()> {
        match KeyParam::from_id(self.kty, param.identifier()) {
            Ok(registered) if registered == param => (),
            _ => {
                return Err(Error::InvalidKeyFormat(
                    "parameter doesn't belong to the key type",
                ))
            }
        }
        param.validate(&value)?;
        if param == KeyParam::Common(CommonParam::Kty) {
            return if KeyType::from_value(&value)? == self.kty {
                Ok(())
            } else {
                Err(Error::InvalidKeyType("key type can't be changed"))
            };
        }
        match self.params.iter_mut().find(|(p, _)| *p == param) {
            Some(entry) => entry.1 = value,
            None => self.params.push((param, value)),
        }

        Ok(())
    }

    /// Removes a parameter and returns its value.
    pub fn delete(&mut self, param: KeyParam) -> Result<Option<Value>> {
        if param.is_required() {
            return Err(Error::InvalidKey("can't delete a required parameter"));
        }
        Ok(self
            .params
            .iter()
            .position(|(p, _)| *p == param)
            .map(|i| self.params.remove(i).1))
    }

    /// Returns the byte string value of a parameter.
    pub fn bytes(&self, param: KeyParam) -> Option<&[u8]> {
        self.get(param).and_then(Value::as_bytes)
    }

    pub fn kid(&self) -> Option<&[u8]> {
        self.bytes(KeyParam::Common(CommonParam::Kid))
    }

    pub fn set_kid(&mut self, kid: &[u8]) -> Result<()> {
        self.set(KeyParam::Common(CommonParam::Kid), kid.into())
    }

    pub fn base_iv(&self) -> Option<&[u8]> {
        self.bytes(KeyParam::Common(CommonParam::BaseIv))
    }

    /// Returns the algorithm the key is restricted to, if any.
    pub fn algorithm(&self) -> Result<Option<Algorithm>> {
        self.get(KeyParam::Common(CommonParam::Alg))
            .map(Algorithm::from_value)
            .transpose()
    }

    pub fn set_algorithm(&mut self, alg: Algorithm) -> Result<()> {
        self.set(KeyParam::Common(CommonParam::Alg), alg.to_value())
    }

    /// Returns the operations the key is restricted to, if any.
    pub fn key_ops(&self) -> Result<Option<Vec<KeyOp>>> {
        match self.get(KeyParam::Common(CommonParam::KeyOps)) {
            Some(Value::Array(ops)) => Ok(Some(
                ops.iter().map(KeyOp::from_value).collect::<Result<_>>()?,
            )),
            Some(_) => Err(Error::InvalidKeyFormat("key_ops is not an array")),
            None => Ok(None),
        }
    }

    pub fn set_key_ops(&mut self, ops: &[KeyOp]) -> Result<()> {
        self.set(
            KeyParam::Common(CommonParam::KeyOps),
            Value::Array(ops.iter().map(KeyOp::to_value).collect()),
        )
    }

    /// Returns the curve of an OKP or EC2 key.
    pub fn curve(&self) -> Result<Curve> {
        let param = match self.kty {
            KeyType::Okp => KeyParam::Okp(OkpParam::Curve),
            KeyType::Ec2 => KeyParam::Ec2(Ec2Param::Curve),
            _ => return Err(Error::InvalidKeyType("key has no curve")),
        };
        let value = self
            .get(param)
            .ok_or(Error::InvalidKey("curve is missing"))?;

        Curve::from_value(value)
    }

    /// Returns the x-coordinate, or the public key of an OKP.
    pub fn x(&self) -> Option<&[u8]> {
        match self.kty {
            KeyType::Okp => self.bytes(KeyParam::Okp(OkpParam::X)),
            KeyType::Ec2 => self.bytes(KeyParam::Ec2(Ec2Param::X)),
            _ => None,
        }
    }

    pub fn y(&self) -> Option<&[u8]> {
        self.bytes(KeyParam::Ec2(Ec2Param::Y))
    }

    /// Returns the private key of an OKP, EC2 or RSA key.
    pub fn d(&self) -> Option<&[u8]> {
        match self.kty {
            KeyType::Okp => self.bytes(KeyParam::Okp(OkpParam::D)),
            KeyType::Ec2 => self.bytes(KeyParam::Ec2(Ec2Param::D)),
            KeyType::Rsa => self.bytes(KeyParam::Rsa(RsaParam::D)),
            KeyType::Symmetric => None,
        }
    }

    /// Returns the bytes of a symmetric key.
    pub fn k(&self) -> Option<&[u8]> {
        self.bytes(KeyParam::Symmetric(SymmetricParam::K))
    }

    pub fn n(&self) -> Option<&[u8]> {
        self.bytes(KeyParam::Rsa(RsaParam::N))
    }

    pub fn e(&self) -> Option<&[u8]> {
        self.bytes(KeyParam::Rsa(RsaParam::E))
    }

    pub fn has_private(&self) -> bool {
        self.params.iter().any(|(p, _)| p.is_private())
    }

    /// Returns a copy of the key without its private components.
    pub fn public_only(&self) -> CoseKey {
        CoseKey {
            kty: self.kty,
            params: self
                .params
                .iter()
                .filter(|(p, _)| !p.is_private())
                .cloned()
                .collect(),
        }
    }

    /// Checks that the key is of the expected type and that its `alg` and
    /// `key_ops` restrictions, where present, allow the use.
    pub fn verify(
        &self,
        kty: KeyType,
        alg: Option<Algorithm>,
        ops: &[KeyOp],
    ) -> Result<()> {
        if self.kty != kty {
            return Err(Error::InvalidKeyType("unexpected key type"));
        }
        if let (Some(wanted), Some(bound)) = (alg, self.algorithm()?) {
            if wanted != bound {
                return Err(Error::InvalidKey("key bound to another algorithm"));
            }
        }
        if let Some(allowed) = self.key_ops()? {
            if !ops.iter().all(|op| allowed.contains(op)) {
                return Err(Error::InvalidKey("operation not permitted"));
            }
        }

        Ok(())
    }

    /// Returns the key as a CBOR map.
    pub fn to_value(&self) -> Value {
        let mut map = Vec::with_capacity(self.params.len() + 1);
        map.push((CommonParam::Kty.to_value(), self.kty.to_value()));
        for (param, value) in &self.params {
            map.push((Value::Integer(param.identifier()), value.clone()));
        }

        Value::Map(map)
    }

    /// Reads a key from a CBOR map, validating every parameter.
    pub fn from_value(value: &Value) -> Result<CoseKey> {
        let map = value
            .as_map()
            .ok_or(Error::InvalidKeyFormat("key is not a map"))?;
        // The key type decides how the other labels are resolved
        let kty = map
            .iter()
            .find(|(label, _)| {
                CommonParam::from_value(label).ok() == Some(CommonParam::Kty)
            })
            .map(|(_, v)| KeyType::from_value(v))
            .ok_or(Error::InvalidKey("key type is missing"))??;

        let mut params: Vec<(KeyParam, Value)> = Vec::with_capacity(map.len());
        for (label, value) in map {
            let param = KeyParam::from_value(kty, label)?;
            if param == KeyParam::Common(CommonParam::Kty) {
                continue;
            }
            if params.iter().any(|(p, _)| *p == param) {
                return Err(Error::InvalidKeyFormat("duplicate key parameter"));
            }
            param.validate(value)?;
            params.push((param, value.clone()));
        }
        let key = CoseKey { kty, params };
        for param in KeyParam::all(kty) {
            if param.is_required()
                && param != KeyParam::Common(CommonParam::Kty)
                && key.get(param).is_none()
            {
                return Err(Error::InvalidKey("required parameter is missing"));
            }
        }

        Ok(key)
    }

    /// Returns the CBOR encoded key.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(cbor::encode(self.to_value())?)
    }

    /// Decodes a CBOR encoded key.
    pub fn decode(bytes: &[u8]) -> Result<CoseKey> {
        let value: Value = cbor::decode(bytes)?;
        CoseKey::from_value(&value)
    }
}
