use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Query},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};

use crewdesk_employees::{CreateEmployee, UpdateEmployee};
use crewdesk_infra::{Filter, Stage};

use crate::app::dto::{self, EmployeeWithJob, ListQuery};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::routes::common::{job_of_employee, parse_sequence_id};
use crate::app::services::{self, AppServices};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_employee).get(list_employees))
        .route(
            "/:id",
            get(get_employee).put(update_employee).delete(delete_employee),
        )
}

async fn ensure_customer_exists(services: &AppServices, cus_id: i64) -> ApiResult<()> {
    if services.customers.count(&Filter::eq("cus_id", cus_id)).await? == 0 {
        return Err(ApiError::validation(format!(
            "Customer with ID {cus_id} not found"
        )));
    }
    Ok(())
}

pub async fn create_employee(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<CreateEmployee>, JsonRejection>,
) -> ApiResult<Response> {
    let mut draft = dto::body(payload)?.validate()?;
    ensure_customer_exists(&services, draft.cus_id).await?;

    let password = std::mem::take(&mut draft.emp_password);
    draft.emp_password = services::hash_password(password).await?;

    let employee = services.employees.create(&draft).await?;
    tracing::info!(emp_id = employee.emp_id, cus_id = employee.cus_id, "employee created");

    Ok(dto::success(
        StatusCode::CREATED,
        "Employee created successfully",
        employee,
    ))
}

pub async fn list_employees(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Response> {
    let page = services
        .employees
        .get_all(&Filter::All, query.page_request())
        .await?;
    Ok(dto::success(StatusCode::OK, "Employees fetched successfully", page))
}

pub async fn get_employee(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let emp_id = parse_sequence_id(&id, "employee")?;

    let mut stages = vec![Stage::Match(Filter::eq("emp_id", emp_id))];
    stages.extend(job_of_employee().iter().flat_map(|join| join.stages()));
    let employee = services
        .employees
        .aggregate::<EmployeeWithJob>(&stages)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found("Employee not found"))?;

    Ok(dto::success(StatusCode::OK, "Employee fetched successfully", employee))
}

pub async fn update_employee(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateEmployee>, JsonRejection>,
) -> ApiResult<Response> {
    let emp_id = parse_sequence_id(&id, "employee")?;
    let mut patch = dto::body(payload)?.validate()?;
    if let Some(cus_id) = patch.cus_id {
        ensure_customer_exists(&services, cus_id).await?;
    }
    if let Some(password) = patch.emp_password.take() {
        patch.emp_password = Some(services::hash_password(password).await?);
    }

    let employee = services
        .employees
        .update_one_returning(&Filter::eq("emp_id", emp_id), &patch)
        .await?
        .ok_or_else(|| ApiError::not_found("Employee not found"))?;

    Ok(dto::success(StatusCode::OK, "Employee updated successfully", employee))
}

pub async fn delete_employee(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let emp_id = parse_sequence_id(&id, "employee")?;

    let employee = services
        .employees
        .delete(&Filter::eq("emp_id", emp_id))
        .await?
        .deleted
        .ok_or_else(|| ApiError::not_found("Employee not found"))?;
    tracing::info!(emp_id, "employee deleted");

    Ok(dto::success(StatusCode::OK, "Employee deleted successfully", employee))
}
