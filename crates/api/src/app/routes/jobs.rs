use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Query},
    http::StatusCode,
    response::Response,
    routing::post,
    Json, Router,
};

use crewdesk_infra::Filter;
use crewdesk_jobs::CreateJob;

use crate::app::dto::{self, ListQuery};
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new().route("/", post(create_job).get(list_jobs))
}

pub async fn create_job(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<CreateJob>, JsonRejection>,
) -> ApiResult<Response> {
    let draft = dto::body(payload)?.validate()?;
    let job = services.jobs.create(&draft).await?;
    tracing::info!(job_id = job.job_id, sku = %job.job_sku, "job created");
    Ok(dto::success(StatusCode::CREATED, "Job created successfully", job))
}

pub async fn list_jobs(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Response> {
    let page = services.jobs.get_all(&Filter::All, query.page_request()).await?;
    Ok(dto::success(StatusCode::OK, "Jobs fetched successfully", page))
}
