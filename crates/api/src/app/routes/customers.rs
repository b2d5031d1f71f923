use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Query},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};

use crewdesk_customers::{CreateCustomer, UpdateCustomer};
use crewdesk_infra::{Filter, Stage};

use crate::app::dto::{self, CustomerWithEmployees, ListQuery};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::routes::common::{employees_of_customer, parse_sequence_id};
use crate::app::services::{self, AppServices};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_customer).get(list_customers))
        .route(
            "/:id",
            get(get_customer).put(update_customer).delete(delete_customer),
        )
}

pub async fn create_customer(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<CreateCustomer>, JsonRejection>,
) -> ApiResult<Response> {
    let mut registration = dto::body(payload)?.validate()?;
    let password = std::mem::take(&mut registration.password);
    let hash = services::hash_password(password).await?;

    let customer = services.customers.create(&registration.into_draft(hash)).await?;
    tracing::info!(cus_id = customer.cus_id, "customer created");

    Ok(dto::success(
        StatusCode::CREATED,
        "Customer created successfully",
        customer,
    ))
}

pub async fn list_customers(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Response> {
    let page = services
        .customers
        .get_all_with_joins::<CustomerWithEmployees>(
            &Filter::All,
            &[employees_of_customer()],
            query.page_request(),
        )
        .await?;
    Ok(dto::success(StatusCode::OK, "Customers fetched successfully", page))
}

pub async fn get_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let cus_id = parse_sequence_id(&id, "customer")?;

    let mut stages = vec![Stage::Match(Filter::eq("cus_id", cus_id))];
    stages.extend(employees_of_customer().stages());
    let customer = services
        .customers
        .aggregate::<CustomerWithEmployees>(&stages)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found("Customer not found"))?;

    Ok(dto::success(StatusCode::OK, "Customer fetched successfully", customer))
}

pub async fn update_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateCustomer>, JsonRejection>,
) -> ApiResult<Response> {
    let cus_id = parse_sequence_id(&id, "customer")?;
    let mut patch = dto::body(payload)?.validate()?;
    if let Some(password) = patch.cus_password.take() {
        patch.cus_password = Some(services::hash_password(password).await?);
    }

    let customer = services
        .customers
        .update_one_returning(&Filter::eq("cus_id", cus_id), &patch)
        .await?
        .ok_or_else(|| ApiError::not_found("Customer not found"))?;

    Ok(dto::success(StatusCode::OK, "Customer updated successfully", customer))
}

pub async fn delete_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let cus_id = parse_sequence_id(&id, "customer")?;

    let outcome = services.customers.delete(&Filter::eq("cus_id", cus_id)).await?;
    let customer = outcome
        .deleted
        .ok_or_else(|| ApiError::not_found("Customer not found"))?;

    let sessions = services
        .sessions
        .delete_all(&Filter::eq("cus_id", customer.id.to_string()))
        .await?;
    tracing::info!(cus_id, sessions, "customer deleted");

    Ok(dto::success(StatusCode::OK, "Customer deleted successfully", customer))
}
