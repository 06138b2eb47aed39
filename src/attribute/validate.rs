//! Value validators attached to header attributes and key parameters.

use super::{Curve, KeyOp, KeyType};
use crate::{algorithm::Algorithm, cbor::Value, key::CoseKey, Error, Result};

pub fn algorithm(value: &Value) -> Result<()> {
    Algorithm::from_value(value).map(|_| ())
}

pub fn critical(value: &Value) -> Result<()> {
    match value {
        Value::Array(labels)
            if !labels.is_empty()
                && labels
                    .iter()
                    .all(|l| matches!(l, Value::Integer(_) | Value::Text(_))) =>
        {
            Ok(())
        }
        _ => Err(Error::InvalidCriticalValue),
    }
}

pub fn content_type(value: &Value) -> Result<()> {
    match value {
        Value::Integer(i) if *i >= 0 => Ok(()),
        Value::Text(_) => Ok(()),
        _ => Err(Error::InvalidContentType),
    }
}

pub fn kid(value: &Value) -> Result<()> {
    match value {
        Value::Bytes(_) => Ok(()),
        _ => Err(Error::InvalidKidValue),
    }
}

pub fn counter_signature(value: &Value) -> Result<()> {
    match value {
        Value::Array(_) => Ok(()),
        _ => Err(Error::InvalidHeader("counter signature must be an array")),
    }
}

/// Certificate bags and chains: a single certificate or a non-empty array.
pub fn certificates(value: &Value) -> Result<()> {
    match value {
        Value::Bytes(_) => Ok(()),
        Value::Array(certs)
            if !certs.is_empty()
                && certs.iter().all(|c| matches!(c, Value::Bytes(_))) =>
        {
            Ok(())
        }
        _ => Err(Error::InvalidHeader(
            "certificates must be bstr or a non-empty array of bstr",
        )),
    }
}

/// Certificate thumbprint: `[hash algorithm, hash value]`.
pub fn thumbprint(value: &Value) -> Result<()> {
    match value.as_array() {
        Some([Value::Integer(_) | Value::Text(_), Value::Bytes(_)]) => Ok(()),
        _ => Err(Error::InvalidHeader("thumbprint must be [alg, bstr]")),
    }
}

pub fn uri(value: &Value) -> Result<()> {
    match value {
        Value::Text(_) => Ok(()),
        _ => Err(Error::InvalidHeader("certificate URI must be a tstr")),
    }
}

pub fn cose_key(value: &Value) -> Result<()> {
    CoseKey::from_value(value).map(|_| ())
}

pub fn nonce(value: &Value) -> Result<()> {
    match value {
        Value::Bytes(_) | Value::Integer(_) | Value::Null => Ok(()),
        _ => Err(Error::InvalidHeader("nonce must be bstr, int or nil")),
    }
}

pub fn opaque(value: &Value) -> Result<()> {
    match value {
        Value::Bytes(_) => Ok(()),
        _ => Err(Error::InvalidHeader("value must be a byte string")),
    }
}

pub fn curve(value: &Value, kty: KeyType) -> Result<()> {
    if Curve::from_value(value)?.key_type() == kty {
        Ok(())
    } else {
        Err(Error::InvalidKeyFormat("curve doesn't match key type"))
    }
}

pub fn key_ops(value: &Value) -> Result<()> {
    match value {
        Value::Array(ops) if !ops.is_empty() => {
            for op in ops {
                KeyOp::from_value(op)?;
            }
            Ok(())
        }
        _ => Err(Error::InvalidKeyFormat(
            "key operations must be a non-empty array",
        )),
    }
}
