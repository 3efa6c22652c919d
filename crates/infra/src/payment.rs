//! Payment gateway callback contract.
//!
//! The gateway signs its confirmation callback with HMAC-SHA256 over
//! `"{order_id}|{payment_id}"`, hex-encoded. Verification must pass before
//! any order mutation; a failed check produces a plain unsuccessful response
//! and touches nothing.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use orderdesk_core::{OrderId, PaymentId};

/// Verify a gateway callback signature.
///
/// The supplied signature is hex-decoded and compared against the expected
/// MAC in constant time. Malformed hex fails verification rather than
/// erroring; the caller only needs a yes/no.
pub fn verify_callback_signature(
    order_id: OrderId,
    payment_id: PaymentId,
    signature: &str,
    secret: &[u8],
) -> bool {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret) else {
        return false;
    };
    mac.update(format!("{order_id}|{payment_id}").as_bytes());

    let Ok(sig_bytes) = hex::decode(signature) else {
        return false;
    };
    mac.verify_slice(&sig_bytes).is_ok()
}

/// Sign a callback payload the way the gateway does. Exposed for tests and
/// for the dev-mode gateway stub.
pub fn sign_callback(order_id: OrderId, payment_id: PaymentId, secret: &[u8]) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret).expect("HMAC accepts keys of any length");
    mac.update(format!("{order_id}|{payment_id}").as_bytes());
    hex::encode(mac.finalize().into_bytes())
}
