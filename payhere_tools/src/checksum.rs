//! # PayHere notification checksum
//!
//! PayHere signs every server-to-server notification with an `md5sig` field. The signature is not
//! an HMAC; it is PayHere's documented composite digest:
//!
//! ```text
//!    md5sig = UPPER(MD5(merchant_id + order_id + amount + currency + status_code + UPPER(MD5(merchant_secret))))
//! ```
//!
//! where `amount` is formatted with exactly two decimal places and no separators, `status_code` is
//! the signed integer as a decimal string, and `+` is plain string concatenation. The merchant
//! secret never travels over the wire; only its uppercased MD5 digest enters the base string.
//!
//! These functions are pure. Persisting a rejection and answering the gateway is the caller's job.

use epg_common::{Cents, Secret};

/// Lowercase hex MD5 of `data`, uppercased. Exposed for tests against the RFC 1321 reference
/// digests; everything else should go through [`local_md5sig`].
pub fn md5_hex_upper(data: &[u8]) -> String {
    format!("{:x}", md5::compute(data)).to_uppercase()
}

/// Recomputes the signature PayHere should have produced for the given notification fields.
pub fn local_md5sig(
    merchant_id: &str,
    order_id: &str,
    amount: Cents,
    currency: &str,
    status_code: i32,
    merchant_secret: &Secret<String>,
) -> String {
    let secret_digest = md5_hex_upper(merchant_secret.reveal().as_bytes());
    let base = format!("{merchant_id}{order_id}{}{currency}{status_code}{secret_digest}", amount.to_decimal_string());
    md5_hex_upper(base.as_bytes())
}

/// Checks a supplied `md5sig` against the locally recomputed one. PayHere documents the signature
/// as uppercase hex, but the comparison is case-normalized so a gateway-side casing change cannot
/// silently invalidate every notification.
pub fn verify_md5sig(
    merchant_id: &str,
    order_id: &str,
    amount: Cents,
    currency: &str,
    status_code: i32,
    supplied: &str,
    merchant_secret: &Secret<String>,
) -> bool {
    let expected = local_md5sig(merchant_id, order_id, amount, currency, status_code, merchant_secret);
    expected == supplied.to_uppercase()
}
