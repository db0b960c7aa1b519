//! Join code generation for games.
//!
//! Join codes are 6-character strings over an alphabet with the ambiguous
//! glyphs (0/O, 1/I/L) removed, drawn from the OS RNG. Uniqueness against
//! live rooms is the registry's job; it retries a handful of times.

use rand::Rng;

const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const JOIN_CODE_LEN: usize = 6;
pub const MAX_GENERATION_ATTEMPTS: usize = 5;

/// Generate one join code candidate.
pub fn generate_join_code() -> String {
    let mut rng = rand::rng();
    let mut code = String::with_capacity(JOIN_CODE_LEN);
    for _ in 0..JOIN_CODE_LEN {
        code.push(ALPHABET[rng.random_range(0..ALPHABET.len())] as char);
    }
    code
}

/// Whether a client-supplied string even looks like a join code.
pub fn is_well_formed(code: &str) -> bool {
    code.len() == JOIN_CODE_LEN && code.bytes().all(|b| ALPHABET.contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_have_the_right_shape() {
        for _ in 0..64 {
            let code = generate_join_code();
            assert_eq!(code.len(), JOIN_CODE_LEN);
            assert!(is_well_formed(&code), "bad code {code}");
        }
    }

    #[test]
    fn consecutive_codes_differ() {
        let a = generate_join_code();
        let b = generate_join_code();
        let c = generate_join_code();
        assert!(a != b || b != c);
    }

    #[test]
    fn ambiguous_glyphs_are_rejected() {
        assert!(!is_well_formed("ABC01I"));
        assert!(!is_well_formed("abcdef"));
        assert!(!is_well_formed("ABCDE"));
        assert!(is_well_formed("ABCDEF"));
        assert!(is_well_formed(&"23456789"[..6]));
    }
}
