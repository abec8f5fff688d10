use sha2::{Digest, Sha256};

/// Derives the bucket ID for a key: lower-case hex SHA-256 of its UTF-8
/// bytes, yielding 64 hex characters (32 trie levels at 2 chars/step).
pub fn bucket_id_for_key(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    hex_encode(&digest)
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}
