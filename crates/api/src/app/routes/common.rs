use crewdesk_infra::{JoinSpec, Projection};

use crate::app::errors::{ApiError, ApiResult};

/// Parse a sequence id taken from the path (`/customer/:id` etc.).
pub fn parse_sequence_id(raw: &str, label: &str) -> ApiResult<i64> {
    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ApiError::validation(format!("Invalid {label} ID: {raw}"))),
    }
}

/// A customer's employees, without password hashes.
pub fn employees_of_customer() -> JoinSpec {
    JoinSpec::new("cus_id", "employee", "cus_id", "employees")
        .project(Projection::exclude(["emp_password"]))
}

/// The assignment row of an employee, then the job it points at.
pub fn job_of_employee() -> [JoinSpec; 2] {
    [
        JoinSpec::new("emp_id", "employee_job", "emp_id", "assignment").single(),
        JoinSpec::new("assignment.job_id", "job", "job_id", "job").single(),
    ]
}
