//! HS256 verification of Supabase access tokens

use anyhow::{Context, Result};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use super::Claims;

/// Verifies bearer tokens signed with the project's shared JWT secret
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[audience]);
        validation.validate_exp = true;
        validation.validate_nbf = true;

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Verify a JWT token and return the claims
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let token_data =
            decode::<Claims>(token, &self.key, &self.validation).context("JWT validation failed")?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use uuid::Uuid;

    const SECRET: &str = "test-secret";

    fn token(secret: &str, aud: &str, exp_offset: i64) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            aud: aud.to_string(),
            iat: Some(now),
            exp: now + exp_offset,
            email: Some("kullanici@example.com".into()),
            role: Some("authenticated".into()),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret.as_bytes()))
            .unwrap()
    }

    #[test]
    fn test_valid_token() {
        let verifier = TokenVerifier::new(SECRET, "authenticated");
        let claims = verifier.verify_token(&token(SECRET, "authenticated", 3600)).unwrap();
        assert_eq!(claims.email.as_deref(), Some("kullanici@example.com"));
    }

    #[test]
    fn test_wrong_secret_audience_or_expiry() {
        let verifier = TokenVerifier::new(SECRET, "authenticated");
        assert!(verifier.verify_token(&token("other", "authenticated", 3600)).is_err());
        assert!(verifier.verify_token(&token(SECRET, "anon", 3600)).is_err());
        assert!(verifier.verify_token(&token(SECRET, "authenticated", -3600)).is_err());
        assert!(verifier.verify_token("not-a-jwt").is_err());
    }
}
