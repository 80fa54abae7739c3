use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of an artifact payload, logged next to every upload.
pub fn content_hash(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

#[cfg(test)]
mod tests {
    use super::content_hash;

    #[test]
    fn hash_is_stable_for_same_content() {
        let data = b"-- PostgreSQL database dump";
        let left = content_hash(data);
        let right = content_hash(data);
        assert_eq!(left, right);
    }

    #[test]
    fn hash_of_empty_dump_is_well_known() {
        assert_eq!(
            content_hash(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
