/// Opaque query cursors
///
/// A cursor is the raw byte position the store hands back with query results.
/// It is shown to callers as base64 text; equality is always on the bytes.

use crate::error::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Cursor(Bytes);

impl Cursor {
    /// Wrap raw cursor bytes as received on the wire
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Cursor(bytes.into())
    }

    /// Decode a cursor from its base64 text form
    pub fn from_base64(encoded: &str) -> Result<Self> {
        STANDARD
            .decode(encoded)
            .map(|bytes| Cursor(Bytes::from(bytes)))
            .map_err(|e| Error::InvalidCursor(format!("{:?} is not valid base64: {}", encoded, e)))
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_bytes(&self) -> Bytes {
        self.0.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for Cursor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Cursor::from_base64(s)
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cursor({})", self.to_base64())
    }
}

impl Serialize for Cursor {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for Cursor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Cursor::from_base64(&encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_base64_round_trip() {
        let cursor = Cursor::from_base64("c3VwZXJhd2Vzb21lIQ==").unwrap();
        assert_eq!(cursor.as_bytes(), b"superawesome!");
        assert_eq!(cursor.to_base64(), "c3VwZXJhd2Vzb21lIQ==");

        let decoded: Cursor = cursor.to_string().parse().unwrap();
        assert_eq!(decoded, cursor);
    }

    #[test]
    fn test_cursor_equality_is_on_bytes() {
        let a = Cursor::from_bytes(&b"result-cursor-0"[..]);
        let b = Cursor::from_base64(&STANDARD.encode(b"result-cursor-0")).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, Cursor::from_bytes(&b"result-cursor-1"[..]));
    }

    #[test]
    fn test_invalid_base64_is_rejected() {
        let err = Cursor::from_base64("not base64!!").unwrap_err();
        assert_eq!(err.code(), "INVALID_CURSOR");
    }

    #[test]
    fn test_cursor_serializes_as_text() {
        let cursor = Cursor::from_bytes(&b"superawesome!"[..]);
        let json = serde_json::to_string(&cursor).unwrap();
        assert_eq!(json, "\"c3VwZXJhd2Vzb21lIQ==\"");

        let back: Cursor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cursor);
    }
}
