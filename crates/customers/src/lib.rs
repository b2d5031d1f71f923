//! Customers domain module.
//!
//! A customer is the account holder of the platform: it signs up, logs in and
//! owns employees. This crate holds the persisted shapes (entity + insert
//! draft), request validation and the customer auth-session record. It is
//! pure domain logic (no IO, no HTTP, no storage).

pub mod credentials;
pub mod customer;
pub mod session;

pub use credentials::{ForgotPasswordRequest, LoginRequest, ResetPasswordRequest};
pub use customer::{
    CreateCustomer, Customer, CustomerPatch, CustomerRegistration, CustomerStatus, NewCustomer,
    UpdateCustomer,
};
pub use session::{CustomerSession, NewSession};
