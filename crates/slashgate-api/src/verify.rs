//! Ed25519 request signature verification.
//!
//! The platform signs `timestamp || body` with the application's key and sends
//! the hex signature and the timestamp in the `X-Signature-Ed25519` and
//! `X-Signature-Timestamp` headers.

use ed25519_dalek::{Signature, Verifier as _, VerifyingKey};

pub const SIGNATURE_HEADER: &str = "x-signature-ed25519";
pub const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("public key is not valid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("public key must be 32 bytes, got {0}")]
    Length(usize),

    #[error("public key is not a valid Ed25519 point")]
    Invalid,
}

/// Verifies inbound requests against the application's public key.
#[derive(Debug, Clone)]
pub struct Verifier {
    key: VerifyingKey,
}

impl Verifier {
    pub fn new(key: VerifyingKey) -> Self {
        Self { key }
    }

    /// Build from the hex public key shown in the developer portal.
    pub fn from_hex(public_key: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(public_key.trim())?;
        let bytes: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::Length(bytes.len()))?;
        let key = VerifyingKey::from_bytes(&bytes).map_err(|_| KeyError::Invalid)?;
        Ok(Self { key })
    }

    /// `true` only if `signature_hex` is a valid signature of
    /// `timestamp || body`. Never panics; malformed input is just `false`.
    pub fn verify(&self, body: &[u8], signature_hex: &str, timestamp: &str) -> bool {
        let Ok(sig_bytes) = hex::decode(signature_hex) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(&sig_bytes) else {
            return false;
        };

        let mut message = Vec::with_capacity(timestamp.len() + body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(body);

        self.key.verify(&message, &signature).is_ok()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    pub(crate) fn signing_key() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32])
    }

    pub(crate) fn sign(key: &SigningKey, timestamp: &str, body: &[u8]) -> String {
        let mut message = timestamp.as_bytes().to_vec();
        message.extend_from_slice(body);
        hex::encode(key.sign(&message).to_bytes())
    }

    fn verifier() -> Verifier {
        Verifier::from_hex(&hex::encode(signing_key().verifying_key().as_bytes())).unwrap()
    }

    #[test]
    fn valid_signature_verifies() {
        let body = br#"{"type":1}"#;
        let sig = sign(&signing_key(), "1700000000", body);
        assert!(verifier().verify(body, &sig, "1700000000"));
    }

    #[test]
    fn timestamp_is_part_of_the_message() {
        let body = br#"{"type":1}"#;
        let sig = sign(&signing_key(), "1700000000", body);
        assert!(!verifier().verify(body, &sig, "1700000001"));
    }

    #[test]
    fn tampered_body_fails() {
        let sig = sign(&signing_key(), "1", br#"{"type":1}"#);
        assert!(!verifier().verify(br#"{"type":2}"#, &sig, "1"));
    }

    #[test]
    fn malformed_signatures_are_false_not_errors() {
        let v = verifier();
        assert!(!v.verify(b"{}", "", "1"));
        assert!(!v.verify(b"{}", "zz-not-hex", "1"));
        assert!(!v.verify(b"{}", "abcd", "1"));
        assert!(!v.verify(b"{}", &"00".repeat(64), "1"));
    }

    #[test]
    fn bad_public_keys_are_rejected() {
        assert!(matches!(Verifier::from_hex("nothex"), Err(KeyError::Hex(_))));
        assert!(matches!(Verifier::from_hex("abcd"), Err(KeyError::Length(2))));
    }
}
