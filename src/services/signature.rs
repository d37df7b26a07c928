use ring::hmac;

/// HMAC-SHA256 over a payload string, hex-encoded.
pub fn sign(payload: &str, key: &[u8]) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, key);
    let tag = hmac::sign(&key, payload.as_bytes());
    hex::encode(tag.as_ref())
}

/// Constant-time verification of a hex signature.
pub fn verify(payload: &str, signature: &str, key: &[u8]) -> bool {
    let Ok(signature_bytes) = hex::decode(signature) else {
        return false;
    };
    let key = hmac::Key::new(hmac::HMAC_SHA256, key);
    hmac::verify(&key, payload.as_bytes(), &signature_bytes).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_round_trips() {
        let key = b"test-signing-key";
        let signature = sign("payload", key);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(verify("payload", &signature, key));
    }

    #[test]
    fn tampered_payload_fails_verification() {
        let key = b"test-signing-key";
        let signature = sign("payload", key);
        assert!(!verify("payload2", &signature, key));
    }

    #[test]
    fn wrong_key_fails_verification() {
        let signature = sign("payload", b"key-one");
        assert!(!verify("payload", &signature, b"key-two"));
    }

    #[test]
    fn malformed_hex_fails_verification() {
        assert!(!verify("payload", "not-hex", b"key"));
    }
}
