use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: usize,
    pub iat: usize,
    pub role: String,
}

pub fn issue_token(secret: &str, user_id: Uuid, role: &str, ttl_minutes: i64) -> Result<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id,
        exp: (now + Duration::minutes(ttl_minutes)).timestamp() as usize,
        iat: now.timestamp() as usize,
        role: role.to_string(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| Error::Internal(format!("Token signing failed: {}", e)))
}

pub fn verify_token(secret: &str, token: &str) -> Result<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|_| Error::Unauthorized("Invalid or expired token".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_verifies_with_same_secret() {
        let user_id = Uuid::new_v4();
        let token = issue_token("s3cret", user_id, "student", 60).unwrap();
        let claims = verify_token("s3cret", &token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, "student");
        assert!(matches!(verify_token("other", &token), Err(Error::Unauthorized(_))));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = issue_token("s3cret", Uuid::new_v4(), "student", -10).unwrap();
        assert!(matches!(verify_token("s3cret", &token), Err(Error::Unauthorized(_))));
    }
}
