//! The protected and unprotected header maps of a message or recipient.

use alloc::vec::Vec;
use core::cell::OnceCell;

use crate::{
    algorithm::Algorithm, attribute::HeaderAttribute, cbor, cbor::Value,
    Error, Result,
};

type Entries = Vec<(HeaderAttribute, Value)>;

/// A pair of header maps.
///
/// Both maps keep their insertion order and never hold an attribute twice.
/// An attribute lives in at most one of them. The serialized protected map
/// is cached until the protected map changes, and when the headers were
/// decoded, the cache holds the bytes exactly as received.
#[derive(Clone, Debug, Default)]
pub struct Headers {
    protected: Entries,
    unprotected: Entries,
    protected_bytes: OnceCell<Vec<u8>>,
}

impl PartialEq for Headers {
    fn eq(&self, other: &Headers) -> bool {
        self.protected == other.protected
            && self.unprotected == other.unprotected
    }
}

impl Headers {
    pub fn new() -> Headers {
        Headers::default()
    }

    /// Builds headers from a received protected byte string and unprotected
    /// map, validating every entry.
    pub fn from_parts(
        protected: &[u8],
        unprotected: &Value,
    ) -> Result<Headers> {
        let headers = Headers {
            protected: parse(protected)?,
            unprotected: parse_map(unprotected)?,
            protected_bytes: OnceCell::new(),
        };
        if headers
            .protected
            .iter()
            .any(|(a, _)| find(&headers.unprotected, *a).is_some())
        {
            return Err(Error::InvalidHeader(
                "attribute in both protected and unprotected header",
            ));
        }
        // Keep the received encoding, it's what the sender authenticated
        let _ = headers.protected_bytes.set(protected.to_vec());

        Ok(headers)
    }

    /// Returns the value of the attribute, looking at the protected map
    /// first.
    pub fn get(&self, attribute: HeaderAttribute) -> Option<&Value> {
        self.get_protected(attribute)
            .or_else(|| self.get_unprotected(attribute))
    }

    pub fn get_protected(&self, attribute: HeaderAttribute) -> Option<&Value> {
        find(&self.protected, attribute)
    }

    pub fn get_unprotected(
        &self,
        attribute: HeaderAttribute,
    ) -> Option<&Value> {
        find(&self.unprotected, attribute)
    }

    pub fn contains(&self, attribute: HeaderAttribute) -> bool {
        self.get(attribute).is_some()
    }

    /// Sets an attribute of the protected map, after validating the value.
    pub fn set_protected(
        &mut self,
        attribute: HeaderAttribute,
        value: Value,
    ) -> Result<()> {
        if find(&self.unprotected, attribute).is_some() {
            return Err(Error::InvalidHeader(
                "attribute already in unprotected header",
            ));
        }
        attribute.validate(&value)?;
        upsert(&mut self.protected, attribute, value);
        self.protected_bytes.take();

        Ok(())
    }

    /// Sets an attribute of the unprotected map, after validating the value.
    pub fn set_unprotected(
        &mut self,
        attribute: HeaderAttribute,
        value: Value,
    ) -> Result<()> {
        if find(&self.protected, attribute).is_some() {
            return Err(Error::InvalidHeader(
                "attribute already in protected header",
            ));
        }
        attribute.validate(&value)?;
        upsert(&mut self.unprotected, attribute, value);

        Ok(())
    }

    pub fn remove_protected(
        &mut self,
        attribute: HeaderAttribute,
    ) -> Option<Value> {
        let index = self.protected.iter().position(|(a, _)| *a == attribute)?;
        self.protected_bytes.take();
        Some(self.protected.remove(index).1)
    }

    pub fn remove_unprotected(
        &mut self,
        attribute: HeaderAttribute,
    ) -> Option<Value> {
        let index =
            self.unprotected.iter().position(|(a, _)| *a == attribute)?;
        Some(self.unprotected.remove(index).1)
    }

    pub fn protected(&self) -> impl Iterator<Item = &(HeaderAttribute, Value)> {
        self.protected.iter()
    }

    pub fn unprotected(
        &self,
    ) -> impl Iterator<Item = &(HeaderAttribute, Value)> {
        self.unprotected.iter()
    }

    pub fn is_protected_empty(&self) -> bool {
        self.protected.is_empty()
    }

    /// Returns the algorithm, looking at the protected map first.
    pub fn algorithm(&self) -> Result<Algorithm> {
        let value = self.get(HeaderAttribute::Algorithm).ok_or(
            Error::InvalidAlgorithm("no algorithm in either header"),
        )?;

        Algorithm::from_value(value)
    }

    /// Returns the contents of the protected header byte string.
    ///
    /// An empty map serializes to zero bytes. Entries are written in
    /// ascending order of their identifiers.
    pub fn serialize_protected(&self) -> Result<Vec<u8>> {
        if let Some(bytes) = self.protected_bytes.get() {
            return Ok(bytes.clone());
        }
        let bytes = if self.protected.is_empty() {
            Vec::new()
        } else {
            let mut sorted = self.protected.clone();
            sorted.sort_by_key(|(a, _)| *a);
            cbor::encode(to_map(sorted))?
        };
        let _ = self.protected_bytes.set(bytes.clone());

        Ok(bytes)
    }

    /// Returns the unprotected map as a CBOR value, in insertion order.
    pub fn unprotected_value(&self) -> Value {
        to_map(self.unprotected.clone())
    }
}

/// Parses the contents of a protected header byte string.
///
/// Every key has to be a registered attribute and every value has to pass
/// the attribute's validator.
pub fn parse(bytes: &[u8]) -> Result<Vec<(HeaderAttribute, Value)>> {
    // A zero-length byte string stands for the empty map
    if bytes.is_empty() {
        return Ok(Vec::new());
    }
    let map: Value = cbor::decode(bytes)?;

    parse_map(&map)
}

fn parse_map(map: &Value) -> Result<Entries> {
    let map = map
        .as_map()
        .ok_or(Error::InvalidHeader("header is not a map"))?;
    let mut entries = Vec::with_capacity(map.len());
    for (label, value) in map {
        let attribute = HeaderAttribute::from_value(label)?;
        if find(&entries, attribute).is_some() {
            return Err(Error::InvalidHeader("duplicate header attribute"));
        }
        attribute.validate(value)?;
        entries.push((attribute, value.clone()));
    }
    log::trace!("Parsed header map with {} entries", entries.len());

    Ok(entries)
}

fn find(
    entries: &[(HeaderAttribute, Value)],
    attribute: HeaderAttribute,
) -> Option<&Value> {
    entries.iter().find(|(a, _)| *a == attribute).map(|(_, v)| v)
}

fn upsert(entries: &mut Entries, attribute: HeaderAttribute, value: Value) {
    match entries.iter_mut().find(|(a, _)| *a == attribute) {
        Some(entry) => entry.1 = value,
        None => entries.push((attribute, value)),
    }
}

fn to_map(entries: Entries) -> Value {
    Value::Map(
        entries
            .into_iter()
            .map(|(a, v)| (a.to_value(), v))
            .collect(),
    )
}
