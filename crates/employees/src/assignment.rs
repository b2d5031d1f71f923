//! Employee-to-job assignment (`employee_job` collection).
//!
//! References both sides by their sequence ids. `emp_id` carries a unique
//! index, so an employee holds at most one assignment at any time.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crewdesk_core::{DocumentId, DomainResult, Entity, Violations};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub emp_id: i64,
    pub job_id: i64,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Entity for Assignment {
    type Draft = NewAssignment;

    const COLLECTION: &'static str = "employee_job";
    const UNIQUE_FIELDS: &'static [&'static str] = &["emp_id"];

    fn id(&self) -> &DocumentId {
        &self.id
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct NewAssignment {
    pub emp_id: i64,
    pub job_id: i64,
}

/// Request body: assign one employee to a job.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
pub struct AssignJob {
    pub emp_id: i64,
    pub job_id: i64,
}

impl AssignJob {
    pub fn validate(self) -> DomainResult<NewAssignment> {
        let mut v = Violations::new();
        v.positive("emp_id", self.emp_id)
            .positive("job_id", self.job_id);
        v.finish()?;
        Ok(NewAssignment {
            emp_id: self.emp_id,
            job_id: self.job_id,
        })
    }
}

/// Request body: assign several employees to the same job.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AssignJobToMany {
    #[serde(default)]
    pub emp_ids: Vec<i64>,
    pub job_id: i64,
}

impl AssignJobToMany {
    pub fn validate(self) -> DomainResult<Vec<NewAssignment>> {
        let mut v = Violations::new();
        v.check(!self.emp_ids.is_empty(), "emp_ids must contain at least one employee")
            .check(
                self.emp_ids.iter().all(|id| *id > 0),
                "emp_ids must contain only positive integers",
            )
            .check(
                self.emp_ids.iter().collect::<HashSet<_>>().len() == self.emp_ids.len(),
                "emp_ids must not contain duplicates",
            )
            .positive("job_id", self.job_id);
        v.finish()?;

        Ok(self
            .emp_ids
            .into_iter()
            .map(|emp_id| NewAssignment {
                emp_id,
                job_id: self.job_id,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crewdesk_core::DomainError;

    #[test]
    fn assign_many_expands_into_one_draft_per_employee() {
        let drafts = AssignJobToMany {
            emp_ids: vec![3, 1, 2],
            job_id: 7,
        }
        .validate()
        .unwrap();
        assert_eq!(drafts.len(), 3);
        assert!(drafts.iter().all(|d| d.job_id == 7));
        assert_eq!(drafts[0].emp_id, 3);
    }

    #[test]
    fn assign_many_rejects_empty_and_duplicate_lists() {
        let empty = AssignJobToMany {
            emp_ids: vec![],
            job_id: 1,
        };
        assert_eq!(
            empty.validate().unwrap_err(),
            DomainError::validation("emp_ids must contain at least one employee")
        );

        let dup = AssignJobToMany {
            emp_ids: vec![1, 1],
            job_id: 1,
        };
        assert_eq!(
            dup.validate().unwrap_err(),
            DomainError::validation("emp_ids must not contain duplicates")
        );
    }

    #[test]
    fn assign_rejects_non_positive_ids() {
        let err = AssignJob { emp_id: 0, job_id: -1 }.validate().unwrap_err();
        assert_eq!(
            err,
            DomainError::validation(
                "emp_id must be a positive integer, job_id must be a positive integer"
            )
        );
    }
}
