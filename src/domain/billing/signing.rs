//! Crypto-rail request/webhook signing codec.
//!
//! The crypto rail signs every request and webhook with an MD5 digest over
//! the base64-encoded canonical JSON payload concatenated with the merchant
//! API key. Canonical form: null values dropped, keys sorted
//! lexicographically, compact serialization (no extra whitespace).
//!
//! Webhook verification recomputes the signature over the payload minus its
//! `sign` field, injecting the merchant id when the provider omitted it, and
//! compares in constant time. Verification never errors; any mismatch or
//! malformed payload yields `false`.

use base64::Engine;
use md5::{Digest, Md5};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use subtle::ConstantTimeEq;

/// Name of the signature field inside webhook payloads. It is always
/// excluded from the signing input.
const SIGN_FIELD: &str = "sign";

/// Signs and verifies crypto-rail payloads.
#[derive(Clone)]
pub struct CryptoSigner {
    api_key: SecretString,
    merchant_id: String,
}

impl CryptoSigner {
    pub fn new(api_key: impl Into<String>, merchant_id: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            merchant_id: merchant_id.into(),
        }
    }

    pub fn merchant_id(&self) -> &str {
        &self.merchant_id
    }

    /// Canonicalizes a payload: drops nulls and orders keys.
    fn canonical_json(payload: &Map<String, Value>) -> String {
        let cleaned: BTreeMap<&str, &Value> = payload
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k.as_str(), v))
            .collect();
        serde_json::to_string(&cleaned).unwrap_or_default()
    }

    fn digest(&self, canonical: &str) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(canonical.as_bytes());
        let mut hasher = Md5::new();
        hasher.update(encoded.as_bytes());
        hasher.update(self.api_key.expose_secret().as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Computes the signature for an outbound payload.
    pub fn sign(&self, payload: &Map<String, Value>) -> String {
        self.digest(&Self::canonical_json(payload))
    }

    /// Canonicalizes an outbound request and signs it, returning the exact
    /// body string to send alongside its signature. Signing the serialized
    /// body (rather than re-canonicalizing provider-side) keeps the two in
    /// lockstep.
    pub fn sign_request(&self, payload: &Map<String, Value>) -> (String, String) {
        let body = Self::canonical_json(payload);
        let sign = self.digest(&body);
        (body, sign)
    }

    /// Verifies an inbound webhook payload against its claimed signature.
    ///
    /// The `sign` field is stripped from the payload before recomputation
    /// and the merchant id injected when absent. Returns `false` for
    /// non-object payloads; never errors.
    pub fn verify(&self, payload: &Value, claimed: &str) -> bool {
        let Some(object) = payload.as_object() else {
            return false;
        };

        let mut unsigned = object.clone();
        unsigned.remove(SIGN_FIELD);
        unsigned
            .entry("merchant_id")
            .or_insert_with(|| Value::String(self.merchant_id.clone()));

        let expected = self.sign(&unsigned);
        expected.as_bytes().ct_eq(claimed.as_bytes()).into()
    }

    /// Verifies a webhook payload whose signature is embedded in its own
    /// `sign` field.
    pub fn verify_embedded(&self, payload: &Value) -> bool {
        match payload.get(SIGN_FIELD).and_then(Value::as_str) {
            Some(claimed) => self.verify(payload, claimed),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TEST_KEY: &str = "test_api_key_000";
    const TEST_MERCHANT: &str = "merchant-42";

    fn signer() -> CryptoSigner {
        CryptoSigner::new(TEST_KEY, TEST_MERCHANT)
    }

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    // ══════════════════════════════════════════════════════════════
    // Canonicalization
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn signature_is_lowercase_hex_md5() {
        let sig = signer().sign(&object(json!({"amount": "10.00"})));
        assert_eq!(sig.len(), 32);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn key_order_does_not_affect_signature() {
        let s = signer();
        let a = s.sign(&object(json!({"b": "2", "a": "1", "c": 3})));
        let b = s.sign(&object(json!({"c": 3, "a": "1", "b": "2"})));
        assert_eq!(a, b);
    }

    #[test]
    fn null_values_are_dropped_before_signing() {
        let s = signer();
        let with_null = s.sign(&object(json!({"a": "1", "gone": null})));
        let without = s.sign(&object(json!({"a": "1"})));
        assert_eq!(with_null, without);
    }

    #[test]
    fn different_keys_produce_different_signatures() {
        let payload = object(json!({"amount": "10.00"}));
        let a = CryptoSigner::new("key-a", TEST_MERCHANT).sign(&payload);
        let b = CryptoSigner::new("key-b", TEST_MERCHANT).sign(&payload);
        assert_ne!(a, b);
    }

    #[test]
    fn sign_request_body_matches_signature_input() {
        let s = signer();
        let (body, sign) = s.sign_request(&object(json!({"b": "2", "a": null, "amount": "1.00"})));
        // The body is the canonical form: sorted, nulls dropped, compact.
        assert_eq!(body, r#"{"amount":"1.00","b":"2"}"#);
        assert_eq!(sign, s.sign(&object(json!({"amount": "1.00", "b": "2"}))));
    }

    // ══════════════════════════════════════════════════════════════
    // Webhook verification
    // ══════════════════════════════════════════════════════════════

    fn signed_webhook(s: &CryptoSigner, mut payload: Value) -> Value {
        // Webhooks are signed with the merchant id present.
        let mut with_merchant = payload.as_object().unwrap().clone();
        with_merchant.insert("merchant_id".into(), json!(TEST_MERCHANT));
        let sign = s.sign(&with_merchant);
        payload
            .as_object_mut()
            .unwrap()
            .insert(SIGN_FIELD.into(), json!(sign));
        payload
    }

    #[test]
    fn round_trip_verifies() {
        let s = signer();
        let payload = signed_webhook(
            &s,
            json!({
                "uuid": "u-1",
                "order_id": "one_time_p_u_1",
                "amount": "10.00",
                "payment_status": "paid"
            }),
        );
        assert!(s.verify_embedded(&payload));
    }

    #[test]
    fn mutated_field_fails_verification() {
        let s = signer();
        let mut payload = signed_webhook(&s, json!({"uuid": "u-1", "amount": "10.00"}));
        payload["amount"] = json!("99.00");
        assert!(!s.verify_embedded(&payload));
    }

    #[test]
    fn missing_sign_field_fails() {
        let s = signer();
        assert!(!s.verify_embedded(&json!({"uuid": "u-1"})));
    }

    #[test]
    fn wrong_signature_fails() {
        let s = signer();
        assert!(!s.verify(&json!({"uuid": "u-1"}), "deadbeef"));
    }

    #[test]
    fn non_object_payload_fails_without_panicking() {
        let s = signer();
        assert!(!s.verify(&json!("just a string"), "deadbeef"));
        assert!(!s.verify(&json!([1, 2, 3]), "deadbeef"));
        assert!(!s.verify_embedded(&json!(null)));
    }

    #[test]
    fn sign_field_is_excluded_from_signing_input() {
        let s = signer();
        let payload = signed_webhook(&s, json!({"uuid": "u-1", "amount": "10.00"}));
        // Re-verifying the already-signed payload works because `sign`
        // is stripped before recomputation.
        assert!(s.verify_embedded(&payload));
    }

    #[test]
    fn merchant_id_is_injected_when_absent() {
        let s = signer();
        // Signed over a payload that includes merchant_id, delivered without it.
        let payload = signed_webhook(&s, json!({"uuid": "u-1"}));
        assert!(payload.get("merchant_id").is_none());
        assert!(s.verify_embedded(&payload));
    }

    #[test]
    fn wrong_merchant_fails_verification() {
        let s = signer();
        let payload = signed_webhook(&s, json!({"uuid": "u-1"}));
        let other = CryptoSigner::new(TEST_KEY, "merchant-other");
        assert!(!other.verify_embedded(&payload));
    }
}
