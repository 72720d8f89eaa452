use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::models::auth::{IssuedToken, TokenClaims};
use crate::services::errors::auth_service_errors::AuthServiceError;

#[cfg(test)]
use mockall::automock;

const TOKEN_LIFETIME_HOURS: i64 = 24;

#[cfg_attr(test, automock)]
pub trait AuthServiceTrait: Send + Sync {
    fn generate_token(&self, user_id: &str) -> Result<IssuedToken, AuthServiceError>;
    fn verify_token(&self, token: &str) -> Result<TokenClaims, AuthServiceError>;
    fn extract_user_id_from_token(&self, token: &str) -> Result<String, AuthServiceError>;
}

/// Issues and verifies the HS256 tokens that identify a connection's user.
pub struct AuthService {
    jwt_secret: String,
}

impl AuthService {
    pub fn with_jwt_secret(jwt_secret: String) -> Self {
        AuthService { jwt_secret }
    }
}

impl AuthServiceTrait for AuthService {
    fn generate_token(&self, user_id: &str) -> Result<IssuedToken, AuthServiceError> {
        if user_id.is_empty() {
            return Err(AuthServiceError::ValidationError(
                "User ID cannot be empty".to_string(),
            ));
        }

        let now = Utc::now();
        let lifetime = Duration::hours(TOKEN_LIFETIME_HOURS);
        let claims = TokenClaims {
            sub: user_id.to_string(),
            exp: (now + lifetime).timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )
        .map_err(|e| AuthServiceError::JwtError(format!("{:#?}", e)))?;

        Ok(IssuedToken {
            token,
            token_type: "Bearer".to_string(),
            expires_in: lifetime.num_seconds(),
        })
    }

    fn verify_token(&self, token: &str) -> Result<TokenClaims, AuthServiceError> {
        let decoding_key = DecodingKey::from_secret(self.jwt_secret.as_ref());
        let validation = Validation::default();

        match decode::<TokenClaims>(token, &decoding_key, &validation) {
            Ok(token_data) => {
                let now = Utc::now().timestamp() as usize;
                if token_data.claims.exp < now {
                    Err(AuthServiceError::ExpiredToken)
                } else {
                    Ok(token_data.claims)
                }
            }
            Err(err) => match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    Err(AuthServiceError::ExpiredToken)
                }
                _ => Err(AuthServiceError::InvalidToken),
            },
        }
    }

    fn extract_user_id_from_token(&self, token: &str) -> Result<String, AuthServiceError> {
        let claims = self.verify_token(token)?;
        Ok(claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: &str) -> AuthService {
        AuthService::with_jwt_secret(secret.to_string())
    }

    #[test]
    fn test_token_generation_and_verification_roundtrip() {
        let auth_service = service("test-secret-key");

        let issued = auth_service.generate_token("roundtrip-user-id").unwrap();

        assert_eq!(issued.token_type, "Bearer");
        assert_eq!(issued.expires_in, 24 * 60 * 60);
        let claims = auth_service.verify_token(&issued.token).unwrap();
        assert_eq!(claims.sub, "roundtrip-user-id");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_verify_token_invalid() {
        let result = service("test-secret-key").verify_token("invalid-token");

        assert_eq!(result.unwrap_err(), AuthServiceError::InvalidToken);
    }

    #[test]
    fn test_verify_token_expired() {
        let past = Utc::now() - Duration::hours(2);
        let claims = TokenClaims {
            sub: "late".to_string(),
            exp: past.timestamp() as usize,
            iat: (past - Duration::hours(1)).timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret-key"),
        )
        .unwrap();

        let result = service("test-secret-key").verify_token(&token);

        assert_eq!(result.unwrap_err(), AuthServiceError::ExpiredToken);
    }

    #[test]
    fn test_empty_user_id_is_rejected() {
        assert!(matches!(
            service("s").generate_token(""),
            Err(AuthServiceError::ValidationError(_))
        ));
    }

    #[test]
    fn test_different_secrets_do_not_cross_verify() {
        let first = service("secret1");
        let second = service("secret2");

        let token = first.generate_token("same-user-id").unwrap().token;

        assert_eq!(first.extract_user_id_from_token(&token).unwrap(), "same-user-id");
        assert!(second.verify_token(&token).is_err());
    }
}
