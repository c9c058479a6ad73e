use super::{ApiResponse, AppState, Result, WebError};
use crate::connection::pool::PoolStats;
use crate::json::JsonToInputConverter;
use crate::model::{ProjectView, TEAM_MEMBERS};
use crate::query::{ListParams, Pagination};
use crate::service::Counts;
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::Utc;
use serde::Serialize;
use serde_json::{Value as JsonValue, json};

type JsonBody = std::result::Result<Json<JsonValue>, JsonRejection>;

pub const ENDPOINTS: [&str; 6] = [
    "/projects",
    "/projects/overdue",
    "/projects/{id}",
    "/projects/{id}/complete",
    "/health",
    "/",
];

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub success: bool,
    pub data: Vec<ProjectView>,
    pub counts: Counts,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub pool: PoolStats,
    pub projects: u64,
}

pub async fn root() -> Json<JsonValue> {
    Json(json!({
        "message": "API root endpoint",
        "availableEndpoints": ENDPOINTS,
        "teamMembers": TEAM_MEMBERS,
    }))
}

pub async fn health(State(state): State<AppState>) -> Result<Json<ApiResponse<HealthReport>>> {
    let projects = state.listing.total().await?;
    Ok(Json(ApiResponse::ok(HealthReport {
        status: "ok",
        pool: state.pool.stats(),
        projects,
    })))
}

pub async fn list_projects(
    State(state): State<AppState>,
    query: std::result::Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<ListResponse>> {
    let Query(params) = query?;
    let listing = state.listing.list(&params).await?;

    Ok(Json(ListResponse {
        success: true,
        data: ProjectView::many(listing.data, listing.as_of),
        counts: listing.counts,
        pagination: listing.pagination,
    }))
}

pub async fn overdue_projects(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ProjectView>>>> {
    let now = Utc::now();
    let projects = state.listing.overdue_at(now).await?;
    Ok(Json(ApiResponse::ok(ProjectView::many(projects, now))))
}

pub async fn create_project(
    State(state): State<AppState>,
    body: JsonBody,
) -> Result<(StatusCode, Json<ApiResponse<ProjectView>>)> {
    let Json(payload) = body?;
    let input = JsonToInputConverter::convert(&payload)?;
    let project = state.records.create(input).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(ProjectView::at(project, Utc::now()))),
    ))
}

pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ProjectView>>> {
    let project = state.records.get(&id).await?;
    Ok(Json(ApiResponse::ok(ProjectView::at(project, Utc::now()))))
}

pub async fn update_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: JsonBody,
) -> Result<Json<ApiResponse<ProjectView>>> {
    // an unknown id is reported before payload problems
    state.records.get(&id).await?;

    let Json(payload) = body?;
    let input = JsonToInputConverter::convert(&payload)?;
    let project = state.records.update(&id, input).await?;
    Ok(Json(ApiResponse::ok(ProjectView::at(project, Utc::now()))))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<JsonValue>>> {
    state.records.delete(&id).await?;
    Ok(Json(ApiResponse::ok(json!({}))))
}

pub async fn complete_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ProjectView>>> {
    let project = state.records.mark_complete(&id).await?;
    Ok(Json(ApiResponse::ok(ProjectView::at(project, Utc::now()))))
}

pub async fn method_not_allowed() -> (StatusCode, Json<JsonValue>) {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "success": false, "message": "Method not allowed" })),
    )
}

pub async fn route_not_found() -> WebError {
    WebError::NotFound("Route not found".to_string())
}
