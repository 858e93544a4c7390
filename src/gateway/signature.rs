use sha2::{Digest, Sha512};
use subtle::ConstantTimeEq;

/// Compute the Midtrans notification signature: lowercase hex of
/// SHA-512(order_id + status_code + gross_amount + server_key).
pub fn compute_signature(
    order_id: &str,
    status_code: &str,
    gross_amount: &str,
    server_key: &str,
) -> String {
    let mut hasher = Sha512::new();
    hasher.update(order_id.as_bytes());
    hasher.update(status_code.as_bytes());
    hasher.update(gross_amount.as_bytes());
    hasher.update(server_key.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn verify_signature(
    order_id: &str,
    status_code: &str,
    gross_amount: &str,
    server_key: &str,
    provided: &str,
) -> bool {
    let expected = compute_signature(order_id, status_code, gross_amount, server_key);

    // Use constant-time comparison to prevent timing attacks.
    let expected_bytes = expected.as_bytes();
    let provided_bytes = provided.as_bytes();

    // Length check is not constant-time, but that's fine - signature length
    // is not secret (it's always 128 hex chars for SHA-512)
    if expected_bytes.len() != provided_bytes.len() {
        return false;
    }

    expected_bytes.ct_eq(provided_bytes).into()
}
