//! Small generators for member-facing identifiers.

use rand::prelude::RngExt;
use rand::rng;

/// Alphabet for referral codes: uppercase letters and digits.
const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of a member referral code.
pub const REFERRAL_CODE_LEN: usize = 8;

/// Generate a fresh referral code: 8 uppercase alphanumeric characters.
///
/// Uniqueness is enforced by the database; with 36^8 possibilities a collision
/// on insert is effectively unheard of and simply surfaces as a conflict.
pub fn generate_referral_code() -> String {
    let mut rng = rng();
    (0..REFERRAL_CODE_LEN)
        .map(|_| CODE_CHARSET[rng.random_range(0..CODE_CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_shape() {
        let code = generate_referral_code();
        assert_eq!(code.len(), REFERRAL_CODE_LEN);
        assert!(code.bytes().all(|b| CODE_CHARSET.contains(&b)));
        // Already normalized: codes are stored uppercase
        assert_eq!(code, code.to_uppercase());
    }

    #[test]
    fn test_codes_are_not_constant() {
        let codes: std::collections::HashSet<String> = (0..32).map(|_| generate_referral_code()).collect();
        assert!(codes.len() > 1);
    }
}
