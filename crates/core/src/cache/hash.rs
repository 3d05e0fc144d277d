//! Body digests for cached responses.

use sha2::{Digest, Sha256};

/// Compute the hex SHA-256 digest of a response body.
pub fn compute_body_digest(body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_stability() {
        assert_eq!(compute_body_digest(b"body { color: red }"), compute_body_digest(b"body { color: red }"));
    }

    #[test]
    fn test_digest_differs_by_content() {
        assert_ne!(compute_body_digest(b"a"), compute_body_digest(b"b"));
    }

    #[test]
    fn test_digest_of_empty_body() {
        assert_eq!(
            compute_body_digest(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_digest_format() {
        let digest = compute_body_digest(b"x");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
