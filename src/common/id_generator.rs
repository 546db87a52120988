// src/common/id_generator.rs
//! Crockford Base32 ID Generator
//!
//! Generates human-readable, prefixed IDs using Crockford Base32 encoding.
//! Format: PREFIX_XXXXXX (e.g., S_K7NP3X for form sessions)

use rand::Rng;

/// Crockford Base32 alphabet (excludes I, L, O, U to avoid confusion)
const CROCKFORD_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Entity type prefixes for ID generation
#[derive(Debug, Clone, Copy)]
pub enum EntityPrefix {
    /// Address form session (S_)
    Session,
    /// Submission receipt (B_)
    Submission,
}

impl EntityPrefix {
    /// Get the string prefix for this entity type
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityPrefix::Session => "S",
            EntityPrefix::Submission => "B",
        }
    }
}

/// Generate a random Crockford Base32 string of specified length
fn generate_crockford_string(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..32);
            CROCKFORD_ALPHABET[idx] as char
        })
        .collect()
}

/// Generate a prefixed ID using Crockford Base32 encoding
pub fn generate_id(prefix: EntityPrefix) -> String {
    format!("{}_{}", prefix.as_str(), generate_crockford_string(6))
}

/// Generate a Session ID (S_XXXXXX)
pub fn generate_session_id() -> String {
    generate_id(EntityPrefix::Session)
}

/// Generate a Submission receipt ID (B_XXXXXX)
pub fn generate_submission_id() -> String {
    generate_id(EntityPrefix::Submission)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_id_format() {
        let session_id = generate_session_id();
        assert!(session_id.starts_with("S_"));
        assert_eq!(session_id.len(), 8); // "S_" + 6 chars

        let submission_id = generate_submission_id();
        assert!(submission_id.starts_with("B_"));
        assert_eq!(submission_id.len(), 8);
    }

    #[test]
    fn test_crockford_alphabet_only() {
        let id = generate_session_id();
        let random_part = &id[2..]; // Skip "S_"

        for c in random_part.chars() {
            assert!(
                CROCKFORD_ALPHABET.contains(&(c as u8)),
                "Character '{}' not in Crockford alphabet",
                c
            );
        }

        // Verify no ambiguous characters
        assert!(!random_part.contains('I'));
        assert!(!random_part.contains('L'));
        assert!(!random_part.contains('O'));
        assert!(!random_part.contains('U'));
    }

    #[test]
    fn test_uniqueness() {
        let mut ids = HashSet::new();
        for _ in 0..1000 {
            let id = generate_session_id();
            assert!(ids.insert(id), "Duplicate ID generated");
        }
    }
}
