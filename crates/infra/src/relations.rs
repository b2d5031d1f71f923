//! Relationship resolution.
//!
//! A [`JoinSpec`] describes one left outer join from a primary collection to
//! a related one, e.g. "attach each customer's employees" or "attach the job
//! an assignment points at". It expands into pipeline stages that every
//! store backend executes.

use crate::store::{Lookup, Projection, Stage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinSpec {
    pub local_field: String,
    pub from: String,
    pub foreign_field: String,
    pub as_field: String,
    pub projection: Option<Projection>,
    /// `Some(preserve_empty)` flattens the joined array to a single value.
    pub unwind: Option<bool>,
}

impl JoinSpec {
    /// Join `from` where `from.foreign_field == local_field`, writing the
    /// matches to `as_field`.
    pub fn new(
        local_field: impl Into<String>,
        from: impl Into<String>,
        foreign_field: impl Into<String>,
        as_field: impl Into<String>,
    ) -> Self {
        Self {
            local_field: local_field.into(),
            from: from.into(),
            foreign_field: foreign_field.into(),
            as_field: as_field.into(),
            projection: None,
            unwind: None,
        }
    }

    /// Restrict the fields copied from each related document.
    pub fn project(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }

    /// Expect at most one related document and attach it as a single value.
    /// Primary documents without a match are kept, with the field absent.
    pub fn single(mut self) -> Self {
        self.unwind = Some(true);
        self
    }

    pub fn stages(&self) -> Vec<Stage> {
        let mut stages = vec![Stage::Lookup(Lookup {
            from: self.from.clone(),
            local_field: self.local_field.clone(),
            foreign_field: self.foreign_field.clone(),
            as_field: self.as_field.clone(),
            projection: self.projection.clone(),
        })];
        if let Some(preserve_empty) = self.unwind {
            stages.push(Stage::Unwind {
                path: self.as_field.clone(),
                preserve_empty,
            });
        }
        stages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_join_expands_to_lookup_and_preserving_unwind() {
        let stages = JoinSpec::new("job_id", "job", "job_id", "job").single().stages();
        assert_eq!(stages.len(), 2);
        assert_eq!(
            stages[1],
            Stage::Unwind {
                path: "job".into(),
                preserve_empty: true
            }
        );
    }

    #[test]
    fn plain_join_is_one_lookup() {
        let stages = JoinSpec::new("cus_id", "employee", "cus_id", "employees")
            .project(Projection::exclude(["emp_password"]))
            .stages();
        match &stages[..] {
            [Stage::Lookup(lookup)] => {
                assert_eq!(lookup.as_field, "employees");
                assert!(lookup.projection.is_some());
            }
            other => panic!("unexpected stages: {other:?}"),
        }
    }
}
