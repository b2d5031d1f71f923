//! Infrastructure layer: document storage, sequences and the generic
//! repository the API builds on.
//!
//! - [`store`]: the [`store::DocumentStore`] port with in-memory and MongoDB
//!   backends.
//! - [`sequence`]: named atomic counters for human-facing integer ids.
//! - [`hooks`]: insert-time lifecycle hooks (timestamps, sequence fields).
//! - [`repository`]: typed CRUD over any [`crewdesk_core::Entity`].
//! - [`relations`]: join specifications resolved by the store.

pub mod error;
pub mod hooks;
pub mod relations;
pub mod repository;
pub mod sequence;
pub mod store;

pub use error::{RepositoryError, RepositoryResult};
pub use relations::JoinSpec;
pub use repository::{DeleteOutcome, Repository, UpdateOutcome};
pub use sequence::SequenceGenerator;
pub use store::{DocumentStore, Filter, InMemoryDocumentStore, Projection, SharedStore, Stage, StoreError};
