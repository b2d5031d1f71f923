//! Customer sign-up, sign-in and password recovery.
//!
//! Every sign-up or login opens a session (`customer_auth` row) keyed by the
//! issued access token. Protected routes require that row to exist, so
//! logout and password reset revoke tokens before they expire.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;

use crewdesk_auth::TokenKind;
use crewdesk_customers::{
    CreateCustomer, Customer, CustomerStatus, ForgotPasswordRequest, LoginRequest, NewSession,
    ResetPasswordRequest,
};
use crewdesk_infra::store::ID_FIELD;
use crewdesk_infra::Filter;

use crate::app::dto::{self, SessionTokens};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::services::{self, AppServices};
use crate::context::CustomerContext;
use crate::middleware::{self, AuthState};

pub fn router(auth: AuthState) -> Router {
    let protected = Router::new()
        .route("/logout", post(logout))
        .route("/profile", get(profile))
        .route_layer(axum::middleware::from_fn_with_state(
            auth,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/forget-password", post(forget_password))
        .route("/reset-password", post(reset_password))
        .merge(protected)
}

#[derive(Serialize)]
struct ResetTokenUpdate<'a> {
    cus_reset_token: &'a str,
}

#[derive(Serialize)]
struct PasswordUpdate {
    cus_password: String,
    cus_reset_token: Option<String>,
}

/// Issue an access/refresh pair and record the session.
async fn open_session(
    services: &AppServices,
    customer: &Customer,
    status: StatusCode,
    message: &str,
) -> ApiResult<Response> {
    let pair = services
        .tokens
        .issue_pair(customer.id, &customer.cus_email, Utc::now())?;
    services
        .sessions
        .create(&NewSession {
            cus_id: customer.id,
            cus_auth_token: pair.access_token.clone(),
            cus_refresh_auth_token: pair.refresh_token.clone(),
        })
        .await?;

    let mut response = dto::success(
        status,
        message,
        SessionTokens {
            token: &pair.access_token,
            refresh_token: &pair.refresh_token,
            customer,
        },
    );
    services
        .cookies
        .set_refresh(&mut response, &pair.refresh_token)?;
    Ok(response)
}

pub async fn signup(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<CreateCustomer>, JsonRejection>,
) -> ApiResult<Response> {
    let mut registration = dto::body(payload)?.validate()?;
    registration.cus_status = CustomerStatus::Active;
    let password = std::mem::take(&mut registration.password);
    let hash = services::hash_password(password).await?;

    let customer = services.customers.create(&registration.into_draft(hash)).await?;
    tracing::info!(cus_id = customer.cus_id, "customer signed up");

    open_session(&services, &customer, StatusCode::CREATED, "Customer signed up").await
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let credentials = dto::body(payload)?.validate()?;

    let customer = services
        .customers
        .get_one(&Filter::eq("cus_email", credentials.cus_email.as_str()))
        .await?
        .ok_or_else(|| ApiError::not_found("Customer not found"))?;

    let valid =
        services::verify_password(credentials.cus_password, customer.cus_password.clone()).await?;
    if !valid {
        tracing::info!(cus_id = customer.cus_id, "login rejected: wrong password");
        return Err(ApiError::unauthorized("Invalid password"));
    }
    if !customer.cus_status.can_login() {
        return Err(ApiError::unauthorized(format!(
            "Customer account is {}",
            customer.cus_status
        )));
    }

    open_session(&services, &customer, StatusCode::OK, "Login successful").await
}

pub async fn logout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<CustomerContext>,
) -> ApiResult<Response> {
    services
        .sessions
        .delete(&Filter::eq(ID_FIELD, session.session_id().to_string()))
        .await?;
    tracing::info!(customer_id = %session.customer_id(), "customer logged out");

    let mut response = dto::success(StatusCode::OK, "Logged out successfully", json!({}));
    services.cookies.clear_refresh(&mut response)?;
    Ok(response)
}

pub async fn profile(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<CustomerContext>,
) -> ApiResult<Response> {
    let customer = services
        .customers
        .get_one(&Filter::eq(ID_FIELD, session.customer_id().to_string()))
        .await?
        .ok_or_else(|| ApiError::not_found("Customer not found"))?;
    Ok(dto::success(StatusCode::OK, "Profile fetched successfully", customer))
}

/// There is no mail delivery; the reset token is returned to the caller.
pub async fn forget_password(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<ForgotPasswordRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let request = dto::body(payload)?.validate()?;

    let customer = services
        .customers
        .get_one(&Filter::eq("cus_email", request.cus_email.as_str()))
        .await?
        .ok_or_else(|| ApiError::not_found("Customer not found"))?;

    let reset_token =
        services
            .tokens
            .issue(TokenKind::Reset, customer.id, &customer.cus_email, Utc::now())?;
    services
        .customers
        .update_one_returning(
            &Filter::eq(ID_FIELD, customer.id.to_string()),
            &ResetTokenUpdate {
                cus_reset_token: &reset_token,
            },
        )
        .await?;
    tracing::info!(cus_id = customer.cus_id, "password reset token issued");

    Ok(dto::success(
        StatusCode::OK,
        "Reset token generated",
        json!({ "reset_token": reset_token }),
    ))
}

pub async fn reset_password(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let request = dto::body(payload)?.validate()?;
    let invalid = || ApiError::unauthorized("Invalid or expired reset token");

    let claims = services
        .tokens
        .verify(&request.reset_token, TokenKind::Reset, Utc::now())
        .map_err(|_| invalid())?;

    // The stored token must still match: each one works once.
    let owner = Filter::eq(ID_FIELD, claims.sub.to_string())
        .and(Filter::eq("cus_reset_token", request.reset_token.as_str()));
    let hash = services::hash_password(request.new_password).await?;
    services
        .customers
        .update_one_returning(
            &owner,
            &PasswordUpdate {
                cus_password: hash,
                cus_reset_token: None,
            },
        )
        .await?
        .ok_or_else(invalid)?;

    let revoked = services
        .sessions
        .delete_all(&Filter::eq("cus_id", claims.sub.to_string()))
        .await?;
    tracing::info!(customer_id = %claims.sub, revoked, "password reset");

    Ok(dto::success(StatusCode::OK, "Password reset successfully", json!({})))
}
