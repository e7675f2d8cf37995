use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use crate::{model::role::Role, models::Claims};

fn now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as usize)
        .unwrap_or_default()
}

pub fn generate_access_token(
    user_id: &str,
    username: &str,
    role: Role,
    student_id: Option<String>,
    secret: &str,
    ttl: usize,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        sub: user_id.to_string(),
        username: username.to_string(),
        role,
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
        student_id,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip() {
        let token =
            generate_access_token("u1", "li.wei", Role::Student, Some("s1".into()), "k", 60).unwrap();
        let claims = verify_token(&token, "k").unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.role, Role::Student);
        assert_eq!(claims.student_id.as_deref(), Some("s1"));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = generate_access_token("u1", "admin", Role::Admin, None, "k", 60).unwrap();
        assert!(verify_token(&token, "other").is_err());
    }
}
