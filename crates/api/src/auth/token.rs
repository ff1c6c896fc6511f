use rand::distr::{Alphanumeric, SampleString};

/// Length of email verification and password reset tokens.
pub const ONE_TIME_TOKEN_LEN: usize = 48;

/// A random URL-safe token for links sent by email.
pub fn generate_one_time_token() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), ONE_TIME_TOKEN_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_alphanumeric_and_distinct() {
        let a = generate_one_time_token();
        let b = generate_one_time_token();
        assert_eq!(a.len(), ONE_TIME_TOKEN_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }
}
