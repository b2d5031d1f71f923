use axum::Router;

use crate::middleware::AuthState;

pub mod assignments;
pub mod common;
pub mod customer_auth;
pub mod customers;
pub mod employees;
pub mod jobs;
pub mod system;

/// Router for every resource endpoint. Only the session routes under
/// `/customer-auth` require a bearer token.
pub fn router(auth: AuthState) -> Router {
    Router::new()
        .nest("/customer", customers::router())
        .nest("/employee", employees::router())
        .nest("/job", jobs::router())
        .nest("/employee-job", assignments::router())
        .nest("/customer-auth", customer_auth::router(auth))
}
