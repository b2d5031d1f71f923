use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crewdesk_core::{DocumentId, DomainError, DomainResult, Entity, SequenceField, Violations};
use crewdesk_core::validation::normalize_email;

/// Customer account status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerStatus {
    #[default]
    Active,
    Inactive,
    Restricted,
    Blocked,
}

impl CustomerStatus {
    pub const ALL: [CustomerStatus; 4] = [
        CustomerStatus::Active,
        CustomerStatus::Inactive,
        CustomerStatus::Restricted,
        CustomerStatus::Blocked,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerStatus::Active => "active",
            CustomerStatus::Inactive => "inactive",
            CustomerStatus::Restricted => "restricted",
            CustomerStatus::Blocked => "blocked",
        }
    }

    /// Only active customers may open a session.
    pub fn can_login(&self) -> bool {
        *self == CustomerStatus::Active
    }
}

impl core::fmt::Display for CustomerStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CustomerStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                DomainError::validation(
                    "cus_status must be one of active, inactive, restricted, blocked",
                )
            })
    }
}

/// Persisted customer document (`customer` collection).
///
/// The password hash and the pending reset token are read from the store but
/// never serialized back out, so a `Customer` can be returned to clients as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub cus_id: i64,
    pub cus_firstname: String,
    pub cus_lastname: String,
    pub cus_email: String,
    pub cus_phone_number: String,
    #[serde(default, skip_serializing)]
    pub cus_password: String,
    pub cus_status: CustomerStatus,
    #[serde(default, skip_serializing)]
    pub cus_reset_token: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Entity for Customer {
    type Draft = NewCustomer;

    const COLLECTION: &'static str = "customer";
    const SEQUENCE: Option<SequenceField> = Some(SequenceField {
        counter: "customerId",
        field: "cus_id",
    });
    const UNIQUE_FIELDS: &'static [&'static str] = &["cus_id", "cus_email", "cus_phone_number"];

    fn id(&self) -> &DocumentId {
        &self.id
    }
}

/// Insert draft for a customer. `cus_password` already holds the hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewCustomer {
    pub cus_firstname: String,
    pub cus_lastname: String,
    pub cus_email: String,
    pub cus_phone_number: String,
    pub cus_password: String,
    pub cus_status: CustomerStatus,
}

/// Request body: create a customer (admin create and signup).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CreateCustomer {
    #[serde(default)]
    pub cus_firstname: String,
    #[serde(default)]
    pub cus_lastname: String,
    #[serde(default)]
    pub cus_email: String,
    #[serde(default)]
    pub cus_phone_number: String,
    #[serde(default)]
    pub cus_password: String,
    #[serde(default)]
    pub cus_confirm_password: String,
    #[serde(default)]
    pub cus_status: Option<String>,
}

/// A validated, normalized [`CreateCustomer`]. The password is still plain
/// text; hash it before building the draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerRegistration {
    pub cus_firstname: String,
    pub cus_lastname: String,
    pub cus_email: String,
    pub cus_phone_number: String,
    pub password: String,
    pub cus_status: CustomerStatus,
}

impl CreateCustomer {
    pub fn validate(self) -> DomainResult<CustomerRegistration> {
        let firstname = self.cus_firstname.trim().to_string();
        let lastname = self.cus_lastname.trim().to_string();
        let email = normalize_email(&self.cus_email);
        let phone = self.cus_phone_number.trim().to_string();

        let mut v = Violations::new();
        v.length("cus_firstname", &firstname, 1, 50)
            .letters_and_spaces("cus_firstname", &firstname)
            .length("cus_lastname", &lastname, 1, 50)
            .letters_and_spaces("cus_lastname", &lastname)
            .email("cus_email", &email)
            .digits("cus_phone_number", &phone, 10, 10)
            .strong_password("cus_password", &self.cus_password, 8)
            .check(
                self.cus_password == self.cus_confirm_password,
                "Passwords do not match",
            );

        let status = match self.cus_status.as_deref() {
            None => CustomerStatus::default(),
            Some(raw) => match raw.parse() {
                Ok(status) => status,
                Err(DomainError::Validation(msg)) => {
                    v.push(msg);
                    CustomerStatus::default()
                }
                Err(other) => return Err(other),
            },
        };
        v.finish()?;

        Ok(CustomerRegistration {
            cus_firstname: firstname,
            cus_lastname: lastname,
            cus_email: email,
            cus_phone_number: phone,
            password: self.cus_password,
            cus_status: status,
        })
    }
}

impl CustomerRegistration {
    pub fn into_draft(self, password_hash: String) -> NewCustomer {
        NewCustomer {
            cus_firstname: self.cus_firstname,
            cus_lastname: self.cus_lastname,
            cus_email: self.cus_email,
            cus_phone_number: self.cus_phone_number,
            cus_password: password_hash,
            cus_status: self.cus_status,
        }
    }
}

/// Request body: partial customer update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UpdateCustomer {
    pub cus_firstname: Option<String>,
    pub cus_lastname: Option<String>,
    pub cus_email: Option<String>,
    pub cus_phone_number: Option<String>,
    pub cus_password: Option<String>,
    pub cus_status: Option<String>,
}

/// Fields written by a customer update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CustomerPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cus_firstname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cus_lastname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cus_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cus_phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cus_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cus_status: Option<CustomerStatus>,
}

impl UpdateCustomer {
    /// Validate and normalize. The returned patch carries the plain password
    /// (if any) in `cus_password`; replace it with a hash before writing.
    pub fn validate(self) -> DomainResult<CustomerPatch> {
        let trimmed = |v: Option<String>| v.map(|s| s.trim().to_string());
        let firstname = trimmed(self.cus_firstname);
        let lastname = trimmed(self.cus_lastname);
        let email = self.cus_email.as_deref().map(normalize_email);
        let phone = trimmed(self.cus_phone_number);

        let mut v = Violations::new();
        if let Some(name) = &firstname {
            v.length("cus_firstname", name, 2, 50)
                .letters_and_spaces("cus_firstname", name);
        }
        if let Some(name) = &lastname {
            v.length("cus_lastname", name, 2, 50)
                .letters_and_spaces("cus_lastname", name);
        }
        if let Some(email) = &email {
            v.email("cus_email", email);
        }
        if let Some(phone) = &phone {
            v.digits("cus_phone_number", phone, 10, 10);
        }
        if let Some(password) = &self.cus_password {
            v.strong_password("cus_password", password, 8);
        }
        let status = match self.cus_status.as_deref().map(str::parse::<CustomerStatus>) {
            None => None,
            Some(Ok(status)) => Some(status),
            Some(Err(err)) => {
                v.push(match err {
                    DomainError::Validation(msg) => msg,
                    other => other.to_string(),
                });
                None
            }
        };
        v.finish()?;

        let patch = CustomerPatch {
            cus_firstname: firstname,
            cus_lastname: lastname,
            cus_email: email,
            cus_phone_number: phone,
            cus_password: self.cus_password,
            cus_status: status,
        };
        if patch.is_empty() {
            return Err(DomainError::validation("at least one field must be provided"));
        }
        Ok(patch)
    }
}

impl CustomerPatch {
    pub fn is_empty(&self) -> bool {
        *self == CustomerPatch::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> CreateCustomer {
        CreateCustomer {
            cus_firstname: " Ada ".into(),
            cus_lastname: "Lovelace".into(),
            cus_email: "Ada@Example.com".into(),
            cus_phone_number: "5551234567".into(),
            cus_password: "Str0ng!pw".into(),
            cus_confirm_password: "Str0ng!pw".into(),
            cus_status: None,
        }
    }

    #[test]
    fn create_normalizes_and_defaults_status() {
        let reg = valid_request().validate().unwrap();
        assert_eq!(reg.cus_firstname, "Ada");
        assert_eq!(reg.cus_email, "ada@example.com");
        assert_eq!(reg.cus_status, CustomerStatus::Active);

        let draft = reg.into_draft("hash".into());
        assert_eq!(draft.cus_password, "hash");
    }

    #[test]
    fn create_rejects_mismatched_confirmation_and_bad_phone() {
        let mut req = valid_request();
        req.cus_confirm_password = "Other0!pw".into();
        req.cus_phone_number = "12345".into();

        match req.validate() {
            Err(DomainError::Validation(msg)) => {
                assert!(msg.contains("Passwords do not match"));
                assert!(msg.contains("cus_phone_number must be exactly 10 digits"));
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn create_rejects_unknown_status() {
        let mut req = valid_request();
        req.cus_status = Some("deleted".into());
        assert!(matches!(req.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn update_requires_at_least_one_field() {
        let err = UpdateCustomer::default().validate().unwrap_err();
        assert_eq!(
            err,
            DomainError::validation("at least one field must be provided")
        );
    }

    #[test]
    fn update_patch_serializes_only_present_fields() {
        let patch = UpdateCustomer {
            cus_firstname: Some("Grace".into()),
            cus_status: Some("blocked".into()),
            ..UpdateCustomer::default()
        }
        .validate()
        .unwrap();

        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "cus_firstname": "Grace", "cus_status": "blocked" })
        );
    }

    #[test]
    fn serialized_customer_hides_credentials() {
        let customer = Customer {
            id: DocumentId::new(),
            cus_id: 1,
            cus_firstname: "Ada".into(),
            cus_lastname: "Lovelace".into(),
            cus_email: "ada@example.com".into(),
            cus_phone_number: "5551234567".into(),
            cus_password: "$argon2id$...".into(),
            cus_status: CustomerStatus::Active,
            cus_reset_token: Some("reset".into()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&customer).unwrap();
        assert!(json.get("cus_password").is_none());
        assert!(json.get("cus_reset_token").is_none());
        assert_eq!(json["_id"], serde_json::json!(customer.id.to_string()));
        assert!(json.get("createdAt").is_some());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 1000,
                ..ProptestConfig::default()
            })]

            #[test]
            fn phone_must_be_ten_digits(phone in "[0-9]{1,15}") {
                let mut req = valid_request();
                req.cus_phone_number = phone.clone();
                prop_assert_eq!(req.validate().is_ok(), phone.len() == 10);
            }
        }
    }
}
