use crate::models::user::User;
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::Error as JwtError, Algorithm, DecodingKey, EncodingKey, Header,
    Validation,
};
use serde::{Deserialize, Serialize};

pub const AUDIENCE: &str = "subtrack";
pub const TOKEN_DURATION_DAYS: i64 = 30;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Claims {
    pub sub: i32,
    pub role: String,
    pub email: String,
    pub aud: String,
    pub exp: usize,
}

/// Signing material built once from configuration and shared through app data.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn issue(&self, user: &User, ttl: Duration) -> Result<String, JwtError> {
        let claims = Claims {
            sub: user.id,
            role: user.role.clone(),
            email: user.email.clone(),
            aud: AUDIENCE.to_string(),
            exp: (Utc::now() + ttl).timestamp().max(0) as usize,
        };

        encode(&Header::new(Algorithm::HS512), &claims, &self.encoding)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS512);
        validation.set_audience(&[AUDIENCE]);

        decode::<Claims>(token, &self.decoding, &validation).map(|data| data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::errors::ErrorKind;

    fn get_test_user() -> User {
        User {
            id: 7,
            name: "Testy".to_string(),
            email: "testy@example.com".to_string(),
            role: "user".to_string(),
            created_at: Utc::now().naive_utc(),
        }
    }

    fn keys() -> JwtKeys {
        JwtKeys::new("an-extremely-secret-test-key-of-some-length")
    }

    #[test]
    fn test_issue_and_verify() {
        let keys = keys();
        let token = keys.issue(&get_test_user(), Duration::days(1)).unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.email, "testy@example.com");
        assert_eq!(claims.role, "user");
        assert_eq!(claims.aud, AUDIENCE);
        assert!(claims.exp > Utc::now().timestamp() as usize + 60 * 60 * 23);
    }

    #[test]
    fn test_verify_fails_w_other_secret() {
        let token = keys().issue(&get_test_user(), Duration::days(1)).unwrap();
        let other = JwtKeys::new("a-completely-different-secret-value-here");
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn test_verify_fails_when_expired() {
        let keys = keys();
        let token = keys.issue(&get_test_user(), Duration::days(-1)).unwrap();
        let err = keys.verify(&token).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ExpiredSignature));
    }

    #[test]
    fn test_verify_fails_on_tampered_signature() {
        let keys = keys();
        let mut token = keys.issue(&get_test_user(), Duration::days(1)).unwrap();
        token.push('a');
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn test_verify_fails_on_garbage() {
        assert!(keys().verify("not.a.token").is_err());
        assert!(keys().verify("").is_err());
    }
}
