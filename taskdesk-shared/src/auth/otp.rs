/// Password-reset one-time codes
///
/// A code is six decimal digits drawn uniformly from 100000..=999999 and is
/// stored inline on the user row together with its expiry and a counter of
/// failed attempts.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

/// How long a freshly issued code stays valid
pub const OTP_TTL_MINUTES: i64 = 15;

/// Failed confirmations tolerated before a code stops working
pub const MAX_RESET_ATTEMPTS: i32 = 5;

/// Draws a new six-digit code
pub fn generate_otp() -> String {
    rand::thread_rng().gen_range(100_000..=999_999u32).to_string()
}

/// Expiry for a code issued at `now`
pub fn otp_expiry(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::minutes(OTP_TTL_MINUTES)
}

/// Whether `provided` unlocks the stored code at `now`
///
/// Requires an exact string match, an expiry strictly in the future and an
/// attempt counter below [`MAX_RESET_ATTEMPTS`].
pub fn otp_accepts(
    stored: Option<&str>,
    expires_at: Option<DateTime<Utc>>,
    attempts: i32,
    provided: &str,
    now: DateTime<Utc>,
) -> bool {
    match (stored, expires_at) {
        (Some(code), Some(expires_at)) => {
            attempts < MAX_RESET_ATTEMPTS && now < expires_at && code == provided
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_codes_are_six_digits() {
        for _ in 0..1000 {
            let code = generate_otp();
            assert_eq!(code.len(), 6);
            let value: u32 = code.parse().unwrap();
            assert!((100_000..=999_999).contains(&value));
        }
    }

    #[test]
    fn test_expiry_is_fifteen_minutes_out() {
        let now = Utc::now();
        assert_eq!(otp_expiry(now) - now, Duration::minutes(15));
    }

    #[test]
    fn test_accepts_matching_live_code() {
        let now = Utc::now();
        assert!(otp_accepts(Some("123456"), Some(otp_expiry(now)), 0, "123456", now));
    }

    #[test]
    fn test_rejects_mismatch_expiry_and_missing_code() {
        let now = Utc::now();
        let expiry = otp_expiry(now);

        assert!(!otp_accepts(Some("123456"), Some(expiry), 0, "654321", now));
        assert!(!otp_accepts(Some("123456"), Some(expiry), 0, " 123456", now));
        assert!(!otp_accepts(Some("123456"), Some(now), 0, "123456", now));
        assert!(!otp_accepts(Some("123456"), Some(expiry), 0, "123456", expiry + Duration::seconds(1)));
        assert!(!otp_accepts(None, None, 0, "123456", now));
    }

    #[test]
    fn test_rejects_after_too_many_attempts() {
        let now = Utc::now();
        let expiry = otp_expiry(now);

        assert!(otp_accepts(Some("123456"), Some(expiry), MAX_RESET_ATTEMPTS - 1, "123456", now));
        assert!(!otp_accepts(Some("123456"), Some(expiry), MAX_RESET_ATTEMPTS, "123456", now));
    }
}
