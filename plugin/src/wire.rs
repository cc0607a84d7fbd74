//! Wire helpers shared by service request and reply types.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Opaque bytes carried as a base64 string.
///
/// A `null` or absent value decodes as empty.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Blob(pub Vec<u8>);

impl Blob {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl std::fmt::Debug for Blob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Blob({} bytes)", self.0.len())
    }
}

impl From<Vec<u8>> for Blob {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Blob {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<&str> for Blob {
    fn from(text: &str) -> Self {
        Self(text.as_bytes().to_vec())
    }
}

impl Serialize for Blob {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for Blob {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = Option::<String>::deserialize(deserializer)?;
        match encoded {
            None => Ok(Self::default()),
            Some(s) => STANDARD
                .decode(s.as_bytes())
                .map(Self)
                .map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_blob_is_base64_on_the_wire() {
        let blob = Blob::from("hello");
        assert_eq!(serde_json::to_value(&blob).unwrap(), json!("aGVsbG8="));
    }

    #[test]
    fn test_blob_null_is_empty() {
        let blob: Blob = serde_json::from_value(json!(null)).unwrap();
        assert!(blob.is_empty());
    }

    #[test]
    fn test_blob_rejects_bad_base64() {
        assert!(serde_json::from_value::<Blob>(json!("not base64!")).is_err());
    }
}
