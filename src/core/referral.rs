//! Referral codes - generation for new sellers and resolution on commissions.

use crate::entities::commission;
use rand::Rng;

/// Prefix of every generated referral code
pub const REFERRAL_PREFIX: &str = "RK";

const REFERRAL_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const REFERRAL_SUFFIX_LEN: usize = 6;

/// Generates a candidate referral code: `RK` followed by six characters from `A-Z0-9`.
///
/// Uniqueness is not checked here; see [`crate::core::wallet::create_seller`].
#[must_use]
pub fn generate_referral_code() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..REFERRAL_SUFFIX_LEN)
        .map(|_| char::from(REFERRAL_ALPHABET[rng.random_range(0..REFERRAL_ALPHABET.len())]))
        .collect();
    format!("{REFERRAL_PREFIX}{suffix}")
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

/// Returns the referral code a commission is owed to.
///
/// `referral_code` is the source of truth; the legacy `codee` and `code`
/// columns are consulted in that order only when it is blank.
#[must_use]
pub fn resolve_referral_code(commission: &commission::Model) -> Option<&str> {
    non_blank(commission.referral_code.as_ref())
        .or_else(|| non_blank(commission.codee.as_ref()))
        .or_else(|| non_blank(commission.code.as_ref()))
}
