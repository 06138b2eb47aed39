//! Helpful functionality around the `serde_cbor` crate.

use alloc::vec::Vec;
use serde::{de::DeserializeOwned, Serialize};
use serde_cbor::de;

#[cfg_attr(tarpaulin, skip)]
mod error;
mod value;

pub use error::CborError;
pub use value::Value;

/// The result type for the `cbor` module.
pub type Result<T> = core::result::Result<T, CborError>;

/// The tag of a `COSE_Encrypt0` message.
pub const TAG_ENCRYPT0: u64 = 16;
/// The tag of a `COSE_Mac0` message.
pub const TAG_MAC0: u64 = 17;
/// The tag of a `COSE_Sign1` message.
pub const TAG_SIGN1: u64 = 18;
/// The tag of a `COSE_Encrypt` message.
pub const TAG_ENCRYPT: u64 = 96;

/// Serializes an object into CBOR.
pub fn encode(object: impl Serialize) -> Result<Vec<u8>> {
    Ok(serde_cbor::to_vec(&object)?)
}

/// Deserializes a CBOR encoded object, rejecting trailing bytes.
pub fn decode<T>(bytes: &[u8]) -> Result<T>
where
    T: DeserializeOwned,
{
    // The slice deserializer wants a mutable buffer to unescape into
    let mut buf = bytes.to_vec();
    Ok(de::from_mut_slice(&mut buf)?)
}

/// Returns the encoded data item prefixed with the given CBOR tag.
pub fn tag(tag: u64, item: &[u8]) -> Vec<u8> {
    let mut tagged = head(0b110_00000, tag);
    tagged.extend_from_slice(item);

    tagged
}

/// Splits off a leading CBOR tag, if present, and returns it together with
/// the remaining data item.
pub fn untag(bytes: &[u8]) -> Result<(Option<u64>, &[u8])> {
    let first = *bytes.first().ok_or(CborError::Truncated)?;
    // Major type 6 is indicated by the three leftmost bits
    if first >> 5 != 6 {
        return Ok((None, bytes));
    }
    let (n, rest) = match first & 0b000_11111 {
        n @ 0..=23 => (u64::from(n), &bytes[1..]),
        24 => read_be(bytes, 1)?,
        25 => read_be(bytes, 2)?,
        26 => read_be(bytes, 4)?,
        27 => read_be(bytes, 8)?,
        _ => return Err(CborError::InvalidTag),
    };

    Ok((Some(n), rest))
}

/// Reads a big-endian argument of `len` bytes following the initial byte.
fn read_be(bytes: &[u8], len: usize) -> Result<(u64, &[u8])> {
    if bytes.len() < 1 + len {
        return Err(CborError::Truncated);
    }
    let n = bytes[1..=len]
        .iter()
        .fold(0u64, |acc, &b| (acc << 8) | u64::from(b));

    Ok((n, &bytes[1 + len..]))
}

/// Returns the initial bytes of a data item with the given major type (in
/// the three most significant bits) and argument.
fn head(major: u8, n: u64) -> Vec<u8> {
    match n {
        0..=23 => vec![major | n as u8],
        24..=0xFF => vec![major | 24, n as u8],
        0x100..=0xFFFF => {
            let mut v = vec![major | 25];
            v.extend_from_slice(&(n as u16).to_be_bytes());
            v
        }
        0x1_0000..=0xFFFF_FFFF => {
            let mut v = vec![major | 26];
            v.extend_from_slice(&(n as u32).to_be_bytes());
            v
        }
        _ => {
            let mut v = vec![major | 27];
            v.extend_from_slice(&n.to_be_bytes());
            v
        }
    }
}
