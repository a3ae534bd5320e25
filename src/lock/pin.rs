use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// PIN accepted when the device configuration carries none.
pub const DEFAULT_PIN: &str = "12345678";

/// Lowercase hex SHA-256 of `pin`.
pub fn hash_pin(pin: &str) -> String {
    hex::encode(Sha256::digest(pin.as_bytes()))
}

/// Compare the hash of `entered` with `stored_hash`, or with the hash of
/// [`DEFAULT_PIN`] when no hash is configured.
pub fn verify_pin(entered: &str, stored_hash: Option<&str>) -> bool {
    if entered.is_empty() {
        return false;
    }
    let expected = stored_hash
        .filter(|h| !h.is_empty())
        .map_or_else(|| hash_pin(DEFAULT_PIN), str::to_ascii_lowercase);
    let entered_hash = Zeroizing::new(hash_pin(entered));
    entered_hash.as_bytes().ct_eq(expected.as_bytes()).into()
}
