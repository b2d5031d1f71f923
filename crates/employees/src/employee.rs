use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crewdesk_core::validation::normalize_email;
use crewdesk_core::{DocumentId, DomainError, DomainResult, Entity, SequenceField, Violations};

/// Persisted employee document (`employee` collection).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub emp_id: i64,
    pub emp_name: String,
    pub emp_email: String,
    #[serde(default, skip_serializing)]
    pub emp_password: String,
    pub emp_company_name: String,
    /// Sequence id of the owning customer.
    pub cus_id: i64,
    pub emp_mobile_number: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Entity for Employee {
    type Draft = NewEmployee;

    const COLLECTION: &'static str = "employee";
    const SEQUENCE: Option<SequenceField> = Some(SequenceField {
        counter: "employeeId",
        field: "emp_id",
    });
    const UNIQUE_FIELDS: &'static [&'static str] = &["emp_id", "emp_email", "emp_mobile_number"];

    fn id(&self) -> &DocumentId {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewEmployee {
    pub emp_name: String,
    pub emp_email: String,
    pub emp_password: String,
    pub emp_company_name: String,
    pub cus_id: i64,
    pub emp_mobile_number: String,
}

/// Request body: create an employee. Unknown fields are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateEmployee {
    #[serde(default)]
    pub emp_name: String,
    #[serde(default)]
    pub emp_email: String,
    #[serde(default)]
    pub emp_password: String,
    #[serde(default)]
    pub emp_company_name: String,
    pub cus_id: i64,
    #[serde(default)]
    pub emp_mobile_number: String,
}

impl CreateEmployee {
    /// Validate and normalize. The returned draft still carries the plain
    /// password; hash it before inserting.
    pub fn validate(self) -> DomainResult<NewEmployee> {
        let name = self.emp_name.trim().to_string();
        let email = normalize_email(&self.emp_email);
        let company = self.emp_company_name.trim().to_string();
        let mobile = self.emp_mobile_number.trim().to_string();

        let mut v = Violations::new();
        v.length("emp_name", &name, 2, 100)
            .email("emp_email", &email)
            .strong_password("emp_password", &self.emp_password, 8)
            .length("emp_company_name", &company, 2, 100)
            .positive("cus_id", self.cus_id)
            .digits("emp_mobile_number", &mobile, 10, 15);
        v.finish()?;

        Ok(NewEmployee {
            emp_name: name,
            emp_email: email,
            emp_password: self.emp_password,
            emp_company_name: company,
            cus_id: self.cus_id,
            emp_mobile_number: mobile,
        })
    }
}

/// Request body: partial employee update. Unknown fields are rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateEmployee {
    pub emp_name: Option<String>,
    pub emp_email: Option<String>,
    pub emp_password: Option<String>,
    pub emp_company_name: Option<String>,
    pub cus_id: Option<i64>,
    pub emp_mobile_number: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmployeePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emp_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emp_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emp_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emp_company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cus_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emp_mobile_number: Option<String>,
}

impl UpdateEmployee {
    pub fn validate(self) -> DomainResult<EmployeePatch> {
        let trimmed = |v: Option<String>| v.map(|s| s.trim().to_string());
        let patch = EmployeePatch {
            emp_name: trimmed(self.emp_name),
            emp_email: self.emp_email.as_deref().map(normalize_email),
            emp_password: self.emp_password,
            emp_company_name: trimmed(self.emp_company_name),
            cus_id: self.cus_id,
            emp_mobile_number: trimmed(self.emp_mobile_number),
        };

        let mut v = Violations::new();
        if let Some(name) = &patch.emp_name {
            v.length("emp_name", name, 1, 100);
        }
        if let Some(email) = &patch.emp_email {
            v.email("emp_email", email);
        }
        if let Some(password) = &patch.emp_password {
            v.length("emp_password", password, 6, usize::MAX);
        }
        if let Some(company) = &patch.emp_company_name {
            v.length("emp_company_name", company, 1, 100);
        }
        if let Some(cus_id) = patch.cus_id {
            v.positive("cus_id", cus_id);
        }
        if let Some(mobile) = &patch.emp_mobile_number {
            v.digits("emp_mobile_number", mobile, 10, 10);
        }
        v.finish()?;

        if patch == EmployeePatch::default() {
            return Err(DomainError::validation("at least one field must be provided"));
        }
        Ok(patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> CreateEmployee {
        CreateEmployee {
            emp_name: "Grace Hopper".into(),
            emp_email: "GRACE@navy.mil".into(),
            emp_password: "C0bol!now".into(),
            emp_company_name: "Navy".into(),
            cus_id: 1,
            emp_mobile_number: "555123456789".into(),
        }
    }

    #[test]
    fn create_accepts_valid_input_and_lowercases_email() {
        let draft = valid_request().validate().unwrap();
        assert_eq!(draft.emp_email, "grace@navy.mil");
        assert_eq!(draft.cus_id, 1);
    }

    #[test]
    fn create_rejects_unknown_fields() {
        let body = serde_json::json!({
            "emp_name": "Grace Hopper",
            "emp_email": "grace@navy.mil",
            "emp_password": "C0bol!now",
            "emp_company_name": "Navy",
            "cus_id": 1,
            "emp_mobile_number": "5551234567",
            "is_admin": true
        });
        assert!(serde_json::from_value::<CreateEmployee>(body).is_err());
    }

    #[test]
    fn create_collects_multiple_violations() {
        let mut req = valid_request();
        req.emp_name = "G".into();
        req.cus_id = 0;
        req.emp_mobile_number = "12ab".into();

        match req.validate() {
            Err(DomainError::Validation(msg)) => {
                assert_eq!(
                    msg,
                    "emp_name must be at least 2 characters, cus_id must be a positive integer, \
                     emp_mobile_number must be between 10 and 15 digits"
                );
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn update_mobile_must_be_exactly_ten_digits() {
        let err = UpdateEmployee {
            emp_mobile_number: Some("555123456789".into()),
            ..UpdateEmployee::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(
            err,
            DomainError::validation("emp_mobile_number must be exactly 10 digits")
        );
    }

    #[test]
    fn empty_update_is_rejected() {
        assert!(UpdateEmployee::default().validate().is_err());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 500,
                ..ProptestConfig::default()
            })]

            #[test]
            fn create_mobile_accepts_ten_to_fifteen_digits(mobile in "[0-9]{1,25}") {
                let mut req = valid_request();
                req.emp_mobile_number = mobile.clone();
                prop_assert_eq!(
                    req.validate().is_ok(),
                    (10..=15).contains(&mobile.len())
                );
            }

            #[test]
            fn update_mobile_accepts_exactly_ten_digits(mobile in "[0-9]{1,25}") {
                let patch = UpdateEmployee {
                    emp_mobile_number: Some(mobile.clone()),
                    ..UpdateEmployee::default()
                };
                prop_assert_eq!(patch.validate().is_ok(), mobile.len() == 10);
            }
        }
    }
}
