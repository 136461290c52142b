use rand::{thread_rng, Rng};

const CODE_PREFIX: &str = "HMB-";
const CODE_LENGTH: usize = 8;
const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// One-time proof-of-control token, e.g. `HMB-7QK2M9XD`.
pub fn generate_validation_code() -> String {
    let mut rng = thread_rng();
    let suffix: String = (0..CODE_LENGTH)
        .map(|_| CODE_CHARSET[rng.gen_range(0..CODE_CHARSET.len())] as char)
        .collect();
    format!("{}{}", CODE_PREFIX, suffix)
}

pub fn is_validation_code(candidate: &str) -> bool {
    candidate
        .strip_prefix(CODE_PREFIX)
        .map(|rest| {
            rest.len() == CODE_LENGTH
                && rest
                    .chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_have_expected_shape() {
        for _ in 0..100 {
            let code = generate_validation_code();
            assert!(is_validation_code(&code), "bad code {}", code);
        }
    }

    #[test]
    fn shape_check_rejects_lowercase_and_wrong_length() {
        assert!(is_validation_code("HMB-ABCD1234"));
        assert!(!is_validation_code("HMB-abcd1234"));
        assert!(!is_validation_code("HMB-ABCD123"));
        assert!(!is_validation_code("XYZ-ABCD1234"));
    }
}
