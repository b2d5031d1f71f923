use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use crewdesk_auth::{JwtValidator, TokenKind, TokenValidationError};
use crewdesk_customers::{Customer, CustomerSession};
use crewdesk_infra::store::ID_FIELD;
use crewdesk_infra::{Filter, Repository};

use crate::app::errors::ApiError;
use crate::context::CustomerContext;

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
    pub sessions: Repository<CustomerSession>,
    pub customers: Repository<Customer>,
}

/// Require a live access token: valid signature and time window, kind
/// `access`, an open session holding exactly this token, and an existing
/// customer.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(req.headers())?.to_string();

    let claims = state.jwt.validate(&token, Utc::now())?;
    if claims.kind != TokenKind::Access {
        return Err(TokenValidationError::WrongKind {
            expected: TokenKind::Access,
            found: claims.kind,
        }
        .into());
    }

    let session = state
        .sessions
        .get_one(
            &Filter::eq("cus_auth_token", token.as_str())
                .and(Filter::eq("cus_id", claims.sub.to_string())),
        )
        .await?
        .ok_or_else(|| ApiError::unauthorized("Session expired or logged out"))?;

    let customer = state
        .customers
        .get_one(&Filter::eq(ID_FIELD, claims.sub.to_string()))
        .await?;
    if customer.is_none() {
        tracing::warn!(customer_id = %claims.sub, "token for a deleted customer");
        return Err(ApiError::unauthorized("Customer not found"));
    }

    req.extensions_mut()
        .insert(CustomerContext::new(claims.sub, session.id));

    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, ApiError> {
    let missing = || ApiError::unauthorized("Authorization token missing");

    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(missing)?;

    let header = header.to_str().map_err(|_| missing())?;

    let header = header.strip_prefix("Bearer ").ok_or_else(missing)?;

    let token = header.trim();
    if token.is_empty() {
        return Err(missing());
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_str(value).unwrap(),
        );
        headers
    }

    #[test]
    fn bearer_token_is_extracted_and_trimmed() {
        assert_eq!(extract_bearer(&headers("Bearer abc.def ")).unwrap(), "abc.def");
    }

    #[test]
    fn other_schemes_and_blank_tokens_are_rejected() {
        assert!(extract_bearer(&headers("Basic Zm9v")).is_err());
        assert!(extract_bearer(&headers("Bearer   ")).is_err());
        assert!(extract_bearer(&HeaderMap::new()).is_err());
    }
}
