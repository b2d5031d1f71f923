use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crewdesk_core::{DocumentId, DomainResult, Entity, SequenceField, Violations};

/// Persisted job document (`job` collection).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub job_id: i64,
    pub job_name: String,
    pub job_sku: String,
    pub job_category: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Entity for Job {
    type Draft = NewJob;

    const COLLECTION: &'static str = "job";
    const SEQUENCE: Option<SequenceField> = Some(SequenceField {
        counter: "jobId",
        field: "job_id",
    });
    const UNIQUE_FIELDS: &'static [&'static str] = &["job_id", "job_sku"];

    fn id(&self) -> &DocumentId {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewJob {
    pub job_name: String,
    pub job_sku: String,
    pub job_category: String,
}

/// Request body: create a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CreateJob {
    #[serde(default)]
    pub job_name: String,
    #[serde(default)]
    pub job_sku: String,
    #[serde(default)]
    pub job_category: String,
}

impl CreateJob {
    pub fn validate(self) -> DomainResult<NewJob> {
        let draft = NewJob {
            job_name: self.job_name.trim().to_string(),
            job_sku: self.job_sku.trim().to_string(),
            job_category: self.job_category.trim().to_string(),
        };

        let mut v = Violations::new();
        v.length("job_name", &draft.job_name, 1, 50)
            .length("job_sku", &draft.job_sku, 1, 20)
            .length("job_category", &draft.job_category, 1, 50);
        v.finish()?;
        Ok(draft)
    }
}
