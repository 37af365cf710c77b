use crate::error::AppError;
use crate::middlewares::AuthenticatedUser;
use crate::models::*;
use crate::services::PlanService;
use actix_web::{HttpMessage, HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

fn require_admin(req: &HttpRequest) -> Result<AuthenticatedUser, AppError> {
    let user = req
        .extensions()
        .get::<AuthenticatedUser>()
        .copied()
        .ok_or_else(|| AppError::AuthError("Missing access token".to_string()))?;
    if !user.is_admin {
        return Err(AppError::Forbidden);
    }
    Ok(user)
}

#[utoipa::path(
    get,
    path = "/plans",
    tag = "plan",
    responses(
        (status = 200, description = "Active plans, storefront order")
    )
)]
pub async fn list_active_plans(plan_service: web::Data<PlanService>) -> Result<HttpResponse> {
    match plan_service.list_active_plans().await {
        Ok(plans) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": plans
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/plans",
    tag = "admin-plan",
    params(
        ("page" = Option<u64>, Query, description = "Page number"),
        ("per_page" = Option<u64>, Query, description = "Items per page"),
        ("include_inactive" = Option<bool>, Query, description = "Include deactivated plans")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Plan catalog"),
        (status = 403, description = "Admin only")
    )
)]
pub async fn list_plans(
    plan_service: web::Data<PlanService>,
    req: HttpRequest,
    query: web::Query<PlanListQuery>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match plan_service.list_plans(&query).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/plans",
    tag = "admin-plan",
    request_body = CreatePlanRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Plan created", body = PlanResponse),
        (status = 400, description = "Invalid plan fields"),
        (status = 403, description = "Admin only")
    )
)]
pub async fn create_plan(
    plan_service: web::Data<PlanService>,
    req: HttpRequest,
    request: web::Json<CreatePlanRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match plan_service.create_plan(request.into_inner()).await {
        Ok(plan) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": plan
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/admin/plans/{id}",
    tag = "admin-plan",
    params(("id" = i64, Path, description = "Plan id")),
    request_body = UpdatePlanRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Plan updated", body = PlanResponse),
        (status = 404, description = "Plan not found")
    )
)]
pub async fn update_plan(
    plan_service: web::Data<PlanService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<UpdatePlanRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match plan_service
        .update_plan(path.into_inner(), request.into_inner())
        .await
    {
        Ok(plan) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": plan
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/plans/{id}/activate",
    tag = "admin-plan",
    params(("id" = i64, Path, description = "Plan id")),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Plan activated", body = PlanResponse))
)]
pub async fn activate_plan(
    plan_service: web::Data<PlanService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match plan_service.set_plan_active(path.into_inner(), true).await {
        Ok(plan) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": plan
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/plans/{id}/deactivate",
    tag = "admin-plan",
    params(("id" = i64, Path, description = "Plan id")),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Plan deactivated", body = PlanResponse))
)]
pub async fn deactivate_plan(
    plan_service: web::Data<PlanService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match plan_service.set_plan_active(path.into_inner(), false).await {
        Ok(plan) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": plan
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn plan_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/plans").route("", web::get().to(list_active_plans)));
}

pub fn admin_plan_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin/plans")
            .route("", web::get().to(list_plans))
            .route("", web::post().to(create_plan))
            .route("/{id}", web::put().to(update_plan))
            .route("/{id}/activate", web::post().to(activate_plan))
            .route("/{id}/deactivate", web::post().to(deactivate_plan)),
    );
}
