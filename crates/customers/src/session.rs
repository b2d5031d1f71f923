//! Customer auth session (`customer_auth` collection).
//!
//! One record per successful signup or login. The access token doubles as
//! the session key: a bearer token is only honoured while its record exists,
//! so deleting the record is how logout revokes it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crewdesk_core::{DocumentId, Entity};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSession {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    /// `_id` of the owning customer.
    pub cus_id: DocumentId,
    pub cus_auth_token: String,
    pub cus_refresh_auth_token: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Entity for CustomerSession {
    type Draft = NewSession;

    const COLLECTION: &'static str = "customer_auth";
    const UNIQUE_FIELDS: &'static [&'static str] = &["cus_auth_token"];

    fn id(&self) -> &DocumentId {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewSession {
    pub cus_id: DocumentId,
    pub cus_auth_token: String,
    pub cus_refresh_auth_token: String,
}
