use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Query},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;

use crewdesk_employees::{AssignJob, AssignJobToMany};
use crewdesk_infra::{Filter, JoinSpec, Projection};
use crewdesk_jobs::Job;

use crate::app::dto::{self, ListQuery};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", post(assign_job))
        .route("/assign-multiple", post(assign_job_to_many))
        .route("/all-mappings", get(all_mappings))
}

async fn require_job(services: &AppServices, job_id: i64) -> ApiResult<Job> {
    services
        .jobs
        .get_one(&Filter::eq("job_id", job_id))
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Job with ID {job_id} not found")))
}

/// The unique index on `emp_id` is the real guard; the lookups only shape
/// the error message.
pub async fn assign_job(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<AssignJob>, JsonRejection>,
) -> ApiResult<Response> {
    let draft = dto::body(payload)?.validate()?;
    require_job(&services, draft.job_id).await?;

    let employee = services
        .employees
        .get_one(&Filter::eq("emp_id", draft.emp_id))
        .await?
        .ok_or_else(|| {
            ApiError::not_found(format!("Employee with ID {} not found", draft.emp_id))
        })?;

    let existing = services
        .assignments
        .count(&Filter::eq("emp_id", draft.emp_id))
        .await?;
    if existing > 0 {
        return Err(ApiError::Conflict(format!(
            "Employee \"{}\" is already assigned a job",
            employee.emp_name
        )));
    }

    let assignment = services.assignments.create(&draft).await?;
    tracing::info!(emp_id = assignment.emp_id, job_id = assignment.job_id, "job assigned");

    Ok(dto::success(
        StatusCode::CREATED,
        "Job assigned successfully",
        assignment,
    ))
}

pub async fn assign_job_to_many(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<AssignJobToMany>, JsonRejection>,
) -> ApiResult<Response> {
    let request = dto::body(payload)?;
    let job_id = request.job_id;
    let drafts = request.validate()?;
    let job = require_job(&services, job_id).await?;

    let emp_ids: Vec<i64> = drafts.iter().map(|d| d.emp_id).collect();
    let employees = services
        .employees
        .get_many(&Filter::is_in("emp_id", emp_ids.iter().copied()))
        .await?;

    let missing: Vec<String> = emp_ids
        .iter()
        .filter(|id| !employees.iter().any(|e| e.emp_id == **id))
        .map(i64::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(ApiError::not_found(format!(
            "Employee(s) not found for ID(s): {}",
            missing.join(", ")
        )));
    }

    let assigned: Vec<i64> = services
        .assignments
        .get_many(&Filter::is_in("emp_id", emp_ids.iter().copied()))
        .await?
        .into_iter()
        .map(|a| a.emp_id)
        .collect();
    if !assigned.is_empty() {
        let names: Vec<&str> = employees
            .iter()
            .filter(|e| assigned.contains(&e.emp_id))
            .map(|e| e.emp_name.as_str())
            .collect();
        return Err(ApiError::Conflict(format!(
            "These employees are already assigned a job: {}",
            names.join(", ")
        )));
    }

    let assignments = services.assignments.create_many(&drafts).await?;
    let names: Vec<&str> = emp_ids
        .iter()
        .filter_map(|id| employees.iter().find(|e| e.emp_id == *id))
        .map(|e| e.emp_name.as_str())
        .collect();
    tracing::info!(job_id, count = assignments.len(), "job assigned to many");

    Ok(dto::success(
        StatusCode::CREATED,
        format!("Job '{}' assigned to: {}", job.job_name, names.join(", ")),
        assignments,
    ))
}

pub async fn all_mappings(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Response> {
    let joins = [
        JoinSpec::new("emp_id", "employee", "emp_id", "employee")
            .project(Projection::include([
                "emp_id",
                "emp_name",
                "emp_email",
                "emp_company_name",
                "cus_id",
            ]))
            .single(),
        JoinSpec::new("job_id", "job", "job_id", "job")
            .project(Projection::include([
                "job_id",
                "job_name",
                "job_sku",
                "job_category",
            ]))
            .single(),
    ];
    let page = services
        .assignments
        .get_all_with_joins::<Value>(&Filter::All, &joins, query.page_request())
        .await?;
    Ok(dto::success(StatusCode::OK, "Mappings fetched successfully", page))
}
