//! Access, refresh and reset token issuance.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crewdesk_core::DocumentId;

use crate::claims::{JwtClaims, TokenKind, TokenValidationError};
use crate::error::AuthError;
use crate::jwt::{Hs256Jwt, JwtValidator};

/// Lifetime of password reset tokens.
pub const RESET_TOKEN_TTL_MINUTES: i64 = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
pub struct TokenService {
    jwt: Arc<Hs256Jwt>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: impl AsRef<[u8]>, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            jwt: Arc::new(Hs256Jwt::new(secret)),
            access_ttl,
            refresh_ttl,
        }
    }

    fn ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
            TokenKind::Reset => Duration::minutes(RESET_TOKEN_TTL_MINUTES),
        }
    }

    pub fn issue(
        &self,
        kind: TokenKind,
        sub: DocumentId,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let claims = JwtClaims {
            sub,
            email: email.to_string(),
            kind,
            jti: Uuid::now_v7(),
            issued_at: now,
            expires_at: now + self.ttl(kind),
        };
        self.jwt.sign(&claims)
    }

    /// Access + refresh token for a new session.
    pub fn issue_pair(
        &self,
        sub: DocumentId,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access_token: self.issue(TokenKind::Access, sub, email, now)?,
            refresh_token: self.issue(TokenKind::Refresh, sub, email, now)?,
        })
    }

    /// Validate `token` and require it to be of `kind`.
    pub fn verify(
        &self,
        token: &str,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<JwtClaims, TokenValidationError> {
        let claims = self.jwt.validate(token, now)?;
        if claims.kind != kind {
            tracing::debug!(sub = %claims.sub, expected = ?kind, found = ?claims.kind, "token of the wrong kind");
            return Err(TokenValidationError::WrongKind {
                expected: kind,
                found: claims.kind,
            });
        }
        Ok(claims)
    }

    pub fn validator(&self) -> Arc<dyn JwtValidator> {
        self.jwt.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("secret", Duration::hours(1), Duration::days(7))
    }

    #[test]
    fn pair_tokens_are_distinct_and_typed() {
        let tokens = service();
        let now = Utc::now();
        let sub = DocumentId::new();
        let pair = tokens.issue_pair(sub, "ada@example.com", now).unwrap();
        assert_ne!(pair.access_token, pair.refresh_token);

        let access = tokens.verify(&pair.access_token, TokenKind::Access, now).unwrap();
        assert_eq!(access.sub, sub);
        assert_eq!(
            tokens.verify(&pair.refresh_token, TokenKind::Access, now),
            Err(TokenValidationError::WrongKind {
                expected: TokenKind::Access,
                found: TokenKind::Refresh
            })
        );
    }

    #[test]
    fn reset_tokens_expire_after_fifteen_minutes() {
        let tokens = service();
        let now = Utc::now();
        let reset = tokens
            .issue(TokenKind::Reset, DocumentId::new(), "ada@example.com", now)
            .unwrap();
        assert!(tokens.verify(&reset, TokenKind::Reset, now + Duration::minutes(14)).is_ok());
        assert_eq!(
            tokens.verify(&reset, TokenKind::Reset, now + Duration::minutes(15)),
            Err(TokenValidationError::Expired)
        );
    }
}
