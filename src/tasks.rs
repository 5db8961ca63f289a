// src/tasks.rs

use actix_web::{web, HttpResponse};
use log::{debug, info};
use serde::Deserialize;

use crate::analytics::summarize;
use crate::app_state::AppState;
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::models::{parse_status_filter, CreateTaskRequest, UpdateTaskRequest};

#[derive(Debug, Deserialize)]
pub struct ListTasksQuery {
    pub status: Option<String>,
}

/// POST /api/tasks
pub async fn create_task(
    user: AuthUser,
    data: web::Data<AppState>,
    payload: web::Json<CreateTaskRequest>,
) -> ApiResult<HttpResponse> {
    debug!("Received task creation request from {}: {:?}", user.id(), payload);
    let new_task = payload.into_inner().validate()?;
    let task = data.tasks.insert(user.id(), new_task).await?;
    info!("Task {} created for user {}", task.id, user.id());
    Ok(HttpResponse::Created().json(task))
}

/// GET /api/tasks?status=
pub async fn list_tasks(
    user: AuthUser,
    data: web::Data<AppState>,
    query: web::Query<ListTasksQuery>,
) -> ApiResult<HttpResponse> {
    let status = parse_status_filter(query.status.as_deref())?;
    let tasks = data.tasks.list(user.id(), status).await?;
    debug!("Found {} tasks for user {}", tasks.len(), user.id());
    Ok(HttpResponse::Ok().json(tasks))
}

/// GET /api/tasks/summary
pub async fn task_summary(user: AuthUser, data: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let tasks = data.tasks.list(user.id(), None).await?;
    Ok(HttpResponse::Ok().json(summarize(&tasks)))
}

/// PATCH /api/tasks/{id}
pub async fn update_task(
    user: AuthUser,
    data: web::Data<AppState>,
    task_id: web::Path<String>,
    payload: web::Json<UpdateTaskRequest>,
) -> ApiResult<HttpResponse> {
    let changes = payload.into_inner().validate()?;
    let task = data
        .tasks
        .update(user.id(), &task_id, &changes)
        .await?
        .ok_or(ApiError::NotFound)?;
    info!("Task {} updated", task.id);
    Ok(HttpResponse::Ok().json(task))
}

/// DELETE /api/tasks/{id}
pub async fn delete_task(
    user: AuthUser,
    data: web::Data<AppState>,
    task_id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let task = data
        .tasks
        .delete(user.id(), &task_id)
        .await?
        .ok_or(ApiError::NotFound)?;
    info!("Task {} deleted", task.id);
    Ok(HttpResponse::Ok().json(task))
}
