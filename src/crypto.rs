//! Static API token generation.

use rand::prelude::RngExt;
use rand::rng;

/// Generates a static API token with 256 bits of entropy.
///
/// The token is 32 bytes of cryptographically secure random data,
/// hex-encoded to a 64 character string.
pub fn generate_api_token() -> String {
    let mut token_bytes = [0u8; 32];
    rng().fill(&mut token_bytes);

    hex::encode(token_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_api_token_format() {
        let token = generate_api_token();

        // 32 bytes hex-encoded is 64 characters
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generate_api_token_uniqueness() {
        let mut tokens = HashSet::new();

        for _ in 0..1000 {
            let token = generate_api_token();
            assert!(tokens.insert(token), "Generated duplicate API token");
        }
    }
}
