//! `crewdesk-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the persisted-entity contract, pagination arithmetic and the
//! input validation helpers shared by the customer, employee and job crates.

pub mod entity;
pub mod error;
pub mod id;
pub mod page;
pub mod validation;

pub use entity::{Entity, SequenceField};
pub use error::{DomainError, DomainResult};
pub use id::DocumentId;
pub use page::{Page, PageRequest, Pagination};
pub use validation::Violations;
