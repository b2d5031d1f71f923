//! Jobs domain module: the job catalogue employees are assigned to.

pub mod job;

pub use job::{CreateJob, Job, NewJob};
