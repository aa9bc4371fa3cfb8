use std::sync::Arc;

use axum::async_trait;
use axum::extract::{FromRequest, RequestParts};
use axum::http::header::AUTHORIZATION;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::err::Error;

pub const TOKEN_TTL_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roll_number: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

pub fn issue_token(
    sub: &str,
    email: &str,
    role: &str,
    roll_number: Option<String>,
    secret: &str,
) -> Result<String, Error> {
    let now = Utc::now();
    let claims = Claims {
        sub: sub.to_string(),
        email: email.to_string(),
        role: role.to_string(),
        roll_number,
        iat: now.timestamp(),
        exp: (now + Duration::days(TOKEN_TTL_DAYS)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|err| Error::InternalError {
        kind: "TokenError",
        message: err.to_string(),
    })
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|err| match err.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => Error::forbidden("Token has expired"),
        _ => Error::forbidden("Invalid token"),
    })
}

pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    header
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

// Verified request identity, carried explicitly into the handler.
#[derive(Debug, Clone)]
pub struct Identity(pub Claims);

impl Identity {
    pub fn student_id(&self) -> Result<Uuid, Error> {
        Uuid::parse_str(&self.0.sub)
            .map_err(|_| Error::bad_request("User ID not found in token"))
    }

    pub fn may_access(&self, student_id: Uuid) -> bool {
        self.0.role != "student" || self.0.sub == student_id.to_string()
    }
}

#[async_trait]
impl<B> FromRequest<B> for Identity
where
    B: Send,
{
    type Rejection = Error;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        let header = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        if header.is_none() {
            return Err(Error::unauthorized("Missing authorization header"));
        }
        let token =
            bearer_token(header).ok_or_else(|| Error::forbidden("Malformed authorization header"))?;
        let config = req
            .extensions()
            .get::<Arc<Config>>()
            .cloned()
            .ok_or_else(|| Error::InternalError {
                kind: "StateError",
                message: "Configuration missing from request extensions".to_string(),
            })?;
        verify_token(token, &config.jwt_secret).map(Identity)
    }
}

#[derive(Debug, Clone)]
pub struct AdminIdentity(pub Claims);

#[async_trait]
impl<B> FromRequest<B> for AdminIdentity
where
    B: Send,
{
    type Rejection = Error;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        let Identity(claims) = Identity::from_request(req).await?;
        if claims.role != "admin" {
            return Err(Error::forbidden("Admin access required"));
        }
        Ok(AdminIdentity(claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-signing-secret";

    #[test]
    fn token_roundtrip_preserves_claims() {
        let id = Uuid::new_v4();
        let token = issue_token(
            &id.to_string(),
            "ada@example.com",
            "student",
            Some("R1".to_string()),
            SECRET,
        )
        .unwrap();
        let claims = verify_token(&token, SECRET).unwrap();
        assert_eq!(claims.sub, id.to_string());
        assert_eq!(claims.email, "ada@example.com");
        assert_eq!(claims.role, "student");
        assert_eq!(claims.roll_number.as_deref(), Some("R1"));
        assert!(claims.exp - claims.iat >= Duration::days(TOKEN_TTL_DAYS).num_seconds());
    }

    #[test]
    fn admin_token_has_no_roll_number() {
        let token = issue_token("admin", "admin@example.com", "admin", None, SECRET).unwrap();
        let claims = verify_token(&token, SECRET).unwrap();
        assert_eq!(claims.sub, "admin");
        assert_eq!(claims.role, "admin");
        assert!(claims.roll_number.is_none());
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = Utc::now();
        let claims = Claims {
            sub: "admin".to_string(),
            email: "admin@example.com".to_string(),
            role: "admin".to_string(),
            roll_number: None,
            iat: (now - Duration::days(8)).timestamp(),
            exp: (now - Duration::days(1)).timestamp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        let err = verify_token(&token, SECRET).unwrap_err();
        assert!(matches!(err, Error::Forbidden { .. }));
    }

    #[test]
    fn tampered_token_is_rejected() {
        let token = issue_token("admin", "admin@example.com", "admin", None, SECRET).unwrap();
        let mut tampered = token;
        tampered.push('x');
        assert!(verify_token(&tampered, SECRET).is_err());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue_token("admin", "admin@example.com", "admin", None, SECRET).unwrap();
        assert!(verify_token(&token, "another-secret").is_err());
    }

    #[test]
    fn bearer_token_parsing() {
        assert_eq!(bearer_token(Some("Bearer abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(bearer_token(Some("Bearer ")), None);
        assert_eq!(bearer_token(Some("Basic abc")), None);
        assert_eq!(bearer_token(None), None);
    }

    #[test]
    fn identity_access_rules() {
        let student_id = Uuid::new_v4();
        let own = Identity(Claims {
            sub: student_id.to_string(),
            email: "ada@example.com".to_string(),
            role: "student".to_string(),
            roll_number: Some("R1".to_string()),
            iat: 0,
            exp: 0,
        });
        assert!(own.may_access(student_id));
        assert!(!own.may_access(Uuid::new_v4()));

        let admin = Identity(Claims {
            sub: "admin".to_string(),
            email: "admin@example.com".to_string(),
            role: "admin".to_string(),
            roll_number: None,
            iat: 0,
            exp: 0,
        });
        assert!(admin.may_access(student_id));
        assert!(admin.student_id().is_err());
        assert!(own.student_id().is_ok());
    }
}
