use jsonwebtoken::{decode, Algorithm, DecodingKey, TokenData, Validation};
use serde::{Deserialize, Serialize};

/// Claims carried by the identity provider's access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Email, when the provider includes it
    #[serde(default)]
    pub email: Option<String>,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    #[serde(default)]
    pub iat: Option<i64>,
}

/// Verifies bearer tokens against the shared HS256 signing secret.
///
/// Pure: a function of (token, secret, current time) with no store or
/// network access, so it can be unit-tested with synthetically signed
/// tokens.
#[derive(Clone)]
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        // The identity provider sets an audience this service does not pin.
        validation.validate_aud = false;

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Validate signature and expiry, returning the embedded claims.
    pub fn verify(&self, token: &str) -> Result<AccessClaims, jsonwebtoken::errors::Error> {
        let data: TokenData<AccessClaims> = decode(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::errors::ErrorKind;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "unit-test-secret";

    fn sign(secret: &str, sub: &str, exp_offset: Duration) -> String {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: sub.to_string(),
            email: Some("reader@example.com".to_string()),
            exp: (now + exp_offset).timestamp(),
            iat: Some(now.timestamp()),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("Failed to sign test token")
    }

    #[test]
    fn valid_token_yields_subject() {
        let verifier = TokenVerifier::new(SECRET);
        let token = sign(SECRET, "user_123", Duration::hours(1));

        let claims = verifier.verify(&token).expect("token should verify");
        assert_eq!(claims.sub, "user_123");
        assert_eq!(claims.email.as_deref(), Some("reader@example.com"));
    }

    #[test]
    fn expired_token_is_rejected() {
        let verifier = TokenVerifier::new(SECRET);
        // Well beyond the default leeway
        let token = sign(SECRET, "user_123", Duration::hours(-2));

        let err = verifier.verify(&token).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ExpiredSignature));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let verifier = TokenVerifier::new(SECRET);
        let token = sign("some-other-secret", "user_123", Duration::hours(1));

        let err = verifier.verify(&token).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidSignature));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let verifier = TokenVerifier::new(SECRET);
        let token = sign(SECRET, "user_123", Duration::hours(1));

        // Flip a character in the payload segment
        let mut parts: Vec<String> = token.split('.').map(str::to_owned).collect();
        let mut payload: Vec<u8> = parts[1].clone().into_bytes();
        payload[0] = if payload[0] == b'A' { b'B' } else { b'A' };
        parts[1] = String::from_utf8(payload).unwrap();

        assert!(verifier.verify(&parts.join(".")).is_err());
    }

    #[test]
    fn malformed_token_is_rejected() {
        let verifier = TokenVerifier::new(SECRET);
        assert!(verifier.verify("not-a-token").is_err());
        assert!(verifier.verify("a.b").is_err());
        assert!(verifier.verify("").is_err());
    }
}
