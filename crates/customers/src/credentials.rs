//! Request bodies of the customer auth flow.

use serde::Deserialize;

use crewdesk_core::validation::normalize_email;
use crewdesk_core::{DomainResult, Violations};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub cus_email: String,
    #[serde(default)]
    pub cus_password: String,
}

impl LoginRequest {
    pub fn validate(self) -> DomainResult<Self> {
        let email = normalize_email(&self.cus_email);
        let mut v = Violations::new();
        v.email("cus_email", &email)
            .length("cus_password", &self.cus_password, 1, usize::MAX);
        v.finish()?;
        Ok(Self {
            cus_email: email,
            cus_password: self.cus_password,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub cus_email: String,
}

impl ForgotPasswordRequest {
    pub fn validate(self) -> DomainResult<Self> {
        let email = normalize_email(&self.cus_email);
        let mut v = Violations::new();
        v.email("cus_email", &email);
        v.finish()?;
        Ok(Self { cus_email: email })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub reset_token: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub confirm_password: String,
}

impl ResetPasswordRequest {
    pub fn validate(self) -> DomainResult<Self> {
        let mut v = Violations::new();
        v.check(!self.reset_token.trim().is_empty(), "Reset token is required")
            .strong_password("new_password", &self.new_password, 8)
            .check(
                self.new_password == self.confirm_password,
                "Passwords do not match",
            );
        v.finish()?;
        Ok(Self {
            reset_token: self.reset_token.trim().to_string(),
            ..self
        })
    }
}
