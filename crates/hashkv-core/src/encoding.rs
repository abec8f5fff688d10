use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::HashkvError;

/// Encodes a value to the byte representation stored in a bucket file.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, HashkvError> {
    serde_json::to_vec(value).map_err(HashkvError::Encode)
}

/// Decodes a value previously produced by [`encode`].
pub fn decode<T: DeserializeOwned>(key: &str, bytes: &[u8]) -> Result<T, HashkvError> {
    serde_json::from_slice(bytes).map_err(|e| HashkvError::Decode(key.to_string(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[test]
    fn round_trips_a_struct() {
        let p = Point { x: 1, y: -2 };
        let bytes = encode(&p).unwrap();
        let decoded: Point = decode("k", &bytes).unwrap();
        assert_eq!(p, decoded);
    }

    #[test]
    fn decode_error_names_the_key() {
        let err = decode::<Point>("bad-key", b"not json").unwrap_err();
        match err {
            HashkvError::Decode(key, _) => assert_eq!(key, "bad-key"),
            other => panic!("expected Decode, got {other:?}"),
        }
    }
}
