//! # Payment Confirmation
//!
//! The interface the core needs from the payment gateway: on success the
//! gateway adapter hands back a `(payment_id, signature)` pair to record
//! against the order.
//!
//! The signature is HMAC-SHA256 over `"<order_id>|<payment_id>"` with the
//! gateway secret, hex-encoded. Verification is mandatory before the
//! confirmation is persisted — an unverified confirmation is treated as a
//! failed payment, never recorded on trust.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

// =============================================================================
// Payment Confirmation
// =============================================================================

/// What the gateway adapter returns on a successful charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    /// Gateway-assigned payment identifier.
    pub payment_id: String,
    /// Hex-encoded HMAC-SHA256 signature of `"<order_id>|<payment_id>"`.
    pub signature: String,
}

/// Computes the expected signature for an order/payment pair.
///
/// Used by tests and by adapters that need to re-sign for reconciliation.
pub fn payment_signature(secret: &[u8], order_id: &str, payment_id: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret).expect("HMAC accepts keys of any length");
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies a gateway confirmation against the shared secret.
///
/// Constant-time comparison via `Mac::verify_slice`. Returns `false` for
/// malformed hex rather than erroring: a garbled signature is simply not
/// a valid one.
pub fn verify_payment(secret: &[u8], order_id: &str, confirmation: &PaymentConfirmation) -> bool {
    let Ok(signature) = hex::decode(&confirmation.signature) else {
        return false;
    };
    let mut mac =
        HmacSha256::new_from_slice(secret).expect("HMAC accepts keys of any length");
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(confirmation.payment_id.as_bytes());
    mac.verify_slice(&signature).is_ok()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-gateway-secret";

    #[test]
    fn valid_signature_verifies() {
        let confirmation = PaymentConfirmation {
            payment_id: "pay_123".to_string(),
            signature: payment_signature(SECRET, "order-1", "pay_123"),
        };
        assert!(verify_payment(SECRET, "order-1", &confirmation));
    }

    #[test]
    fn tampered_fields_fail() {
        let confirmation = PaymentConfirmation {
            payment_id: "pay_123".to_string(),
            signature: payment_signature(SECRET, "order-1", "pay_123"),
        };
        // Signature bound to a different order
        assert!(!verify_payment(SECRET, "order-2", &confirmation));

        // Payment id swapped after signing
        let swapped = PaymentConfirmation {
            payment_id: "pay_999".to_string(),
            ..confirmation.clone()
        };
        assert!(!verify_payment(SECRET, "order-1", &swapped));

        // Wrong secret
        assert!(!verify_payment(b"other-secret", "order-1", &confirmation));
    }

    #[test]
    fn malformed_hex_fails_quietly() {
        let confirmation = PaymentConfirmation {
            payment_id: "pay_123".to_string(),
            signature: "not-hex!".to_string(),
        };
        assert!(!verify_payment(SECRET, "order-1", &confirmation));
    }
}
