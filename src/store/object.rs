//! Object - the unit of content-addressed storage
//!
//! Stored bytes are `[kind tag][payload]`. The tag tells a full revision
//! apart from a delta record without looking at the payload.

use crate::{Error, Result};
use serde::Serialize;

/// Structural tag for stored objects
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// Revision content, verbatim
    Full,
    /// A serialized delta record
    Delta,
}

impl ObjectKind {
    pub fn as_byte(&self) -> u8 {
        match self {
            ObjectKind::Full => 0,
            ObjectKind::Delta => 1,
        }
    }

    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(ObjectKind::Full),
            1 => Some(ObjectKind::Delta),
            _ => None,
        }
    }
}

/// A typed view over stored object bytes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Object<'a> {
    pub kind: ObjectKind,
    pub payload: &'a [u8],
}

impl<'a> Object<'a> {
    pub fn full(payload: &'a [u8]) -> Self {
        Object {
            kind: ObjectKind::Full,
            payload,
        }
    }

    pub fn delta(payload: &'a [u8]) -> Self {
        Object {
            kind: ObjectKind::Delta,
            payload,
        }
    }

    /// Serialize to the bytes handed to the store
    pub fn encode(&self) -> Vec<u8> {
        let mut output = Vec::with_capacity(1 + self.payload.len());
        output.push(self.kind.as_byte());
        output.extend_from_slice(self.payload);
        output
    }

    /// Split stored bytes into kind and payload
    pub fn decode(data: &'a [u8]) -> Result<Self> {
        let (&tag, payload) = data
            .split_first()
            .ok_or_else(|| Error::Corruption("Empty object data".into()))?;

        let kind = ObjectKind::from_byte(tag)
            .ok_or_else(|| Error::Corruption(format!("Invalid object kind: {}", tag)))?;

        Ok(Object { kind, payload })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_decode() {
        let encoded = Object::delta(b"record").encode();
        assert_eq!(encoded[0], 1);

        let decoded = Object::decode(&encoded).unwrap();
        assert_eq!(decoded.kind, ObjectKind::Delta);
        assert_eq!(decoded.payload, b"record");
    }

    #[test]
    fn test_full_object_may_look_like_anything() {
        // Payload starting with the delta tag stays a full object
        let encoded = Object::full(&[1, 1, 1]).encode();
        let decoded = Object::decode(&encoded).unwrap();
        assert_eq!(decoded.kind, ObjectKind::Full);
        assert_eq!(decoded.payload, &[1, 1, 1]);
    }

    #[test]
    fn test_empty_full_object() {
        let encoded = Object::full(b"").encode();
        assert_eq!(encoded, vec![0]);
        assert!(Object::decode(&encoded).unwrap().payload.is_empty());
    }

    #[test]
    fn test_rejects_bad_data() {
        assert!(matches!(Object::decode(&[]), Err(Error::Corruption(_))));
        assert!(matches!(Object::decode(&[7, 0]), Err(Error::Corruption(_))));
    }
}
