//! Employees domain module.
//!
//! Employees belong to a customer (by the customer's `cus_id`) and may hold
//! at most one job assignment. Pure domain logic: persisted shapes and
//! request validation only.

pub mod assignment;
pub mod employee;

pub use assignment::{AssignJob, AssignJobToMany, Assignment, NewAssignment};
pub use employee::{CreateEmployee, Employee, EmployeePatch, NewEmployee, UpdateEmployee};
