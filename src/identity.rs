//! Short random document identities.
//!
//! Identities are drawn from a 28-character alphabet without vowels or
//! look-alike characters (`0`/`o`, `1`/`l`), so they stay short, readable and
//! unlikely to spell words.

use rand::Rng;

/// Characters used in generated identities.
pub const IDENTITY_ALPHABET: &[u8] = b"23456789bcdfghjkmnpqrstvwxyz";

/// Generate a random identity of `length` characters.
#[must_use]
pub fn generate_identity(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| char::from(IDENTITY_ALPHABET[rng.gen_range(0..IDENTITY_ALPHABET.len())]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alphabet() {
        assert_eq!(IDENTITY_ALPHABET.len(), 28);
        let mut sorted = IDENTITY_ALPHABET.to_vec();
        sorted.dedup();
        assert_eq!(sorted.len(), 28);
    }

    #[test]
    fn test_generate_identity() {
        for length in [1, 5, 12] {
            let id = generate_identity(length);
            assert_eq!(id.len(), length);
            assert!(id.bytes().all(|b| IDENTITY_ALPHABET.contains(&b)));
        }
        assert!(generate_identity(0).is_empty());
    }
}
