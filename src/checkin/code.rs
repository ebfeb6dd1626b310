//! Booking verification code generation

use rand::Rng;

/// Code symbols; visually ambiguous characters (0, O, I) are excluded so the
/// guest can read the code out loud or off a cracked phone screen
pub const CODE_ALPHABET: &[u8; 33] = b"ABCDEFGHJKLMNPQRSTUVWXYZ123456789";

/// Length of a booking verification code
pub const CODE_LENGTH: usize = 6;

/// Generate one candidate code; global uniqueness is enforced by the caller
/// against the shared booking-code index
pub fn generate_booking_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LENGTH)
        .map(|_| {
            let idx = rng.gen_range(0..CODE_ALPHABET.len());
            CODE_ALPHABET[idx] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_length() {
        assert_eq!(generate_booking_code().len(), CODE_LENGTH);
    }

    #[test]
    fn test_code_uses_only_alphabet_symbols() {
        for _ in 0..200 {
            let code = generate_booking_code();
            assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)), "{}", code);
        }
    }

    #[test]
    fn test_alphabet_excludes_ambiguous_symbols() {
        assert_eq!(CODE_ALPHABET.len(), 33);
        assert!(!CODE_ALPHABET.contains(&b'0'));
        assert!(!CODE_ALPHABET.contains(&b'O'));
        assert!(!CODE_ALPHABET.contains(&b'I'));
    }
}
