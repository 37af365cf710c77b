use crate::error::AppError;
use crate::middlewares::AuthenticatedUser;
use crate::models::*;
use crate::services::PromotionService;
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
    path = "/admin/promotions",
    tag = "admin-promotion",
    params(
        ("page" = Option<u64>, Query, description = "Page number"),
        ("per_page" = Option<u64>, Query, description = "Items per page"),
        ("include_archived" = Option<bool>, Query, description = "Include archived promotions")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Promotions, newest first"),
        (status = 403, description = "Admin only")
    )
)]
pub async fn list_promotions(
    promotion_service: web::Data<PromotionService>,
    req: HttpRequest,
    query: web::Query<PromotionListQuery>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match promotion_service.list_promotions(&query).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/promotions/locked-plans",
    tag = "admin-promotion",
    params(
        ("exclude" = Option<i64>, Query, description = "Promotion id being edited, excluded from the conflict scan")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Plans claimed by other active promotions", body = [LockedPlan])
    )
)]
pub async fn locked_plans(
    promotion_service: web::Data<PromotionService>,
    req: HttpRequest,
    query: web::Query<LockedPlansQuery>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match promotion_service.locked_plans(query.exclude).await {
        Ok(locked) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": locked
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/promotions/{id}",
    tag = "admin-promotion",
    params(("id" = i64, Path, description = "Promotion id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Promotion detail", body = PromotionResponse),
        (status = 404, description = "Promotion not found")
    )
)]
pub async fn get_promotion(
    promotion_service: web::Data<PromotionService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match promotion_service.get_promotion(path.into_inner()).await {
        Ok(promotion) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": promotion
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/promotions",
    tag = "admin-promotion",
    request_body = CreatePromotionRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Promotion created", body = PromotionResponse),
        (status = 400, description = "Validation failed, including empty plan selection"),
        (status = 409, description = "A selected plan is claimed by another active promotion")
    )
)]
pub async fn create_promotion(
    promotion_service: web::Data<PromotionService>,
    req: HttpRequest,
    request: web::Json<CreatePromotionRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match promotion_service.create_promotion(request.into_inner()).await {
        Ok(promotion) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": promotion
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/admin/promotions/{id}",
    tag = "admin-promotion",
    params(("id" = i64, Path, description = "Promotion id")),
    request_body = UpdatePromotionRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Promotion updated", body = PromotionResponse),
        (status = 409, description = "Locked field change on a redeemed promotion, or plan conflict"),
        (status = 404, description = "Promotion not found")
    )
)]
pub async fn update_promotion(
    promotion_service: web::Data<PromotionService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<UpdatePromotionRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match promotion_service
        .update_promotion(path.into_inner(), request.into_inner())
        .await
    {
        Ok(promotion) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": promotion
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/promotions/{id}/archive",
    tag = "admin-promotion",
    params(("id" = i64, Path, description = "Promotion id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Promotion archived; repeat calls are no-ops"),
        (status = 404, description = "Promotion not found")
    )
)]
pub async fn archive_promotion(
    promotion_service: web::Data<PromotionService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }
    match promotion_service.archive_promotion(path.into_inner()).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": null
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn admin_promotion_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin/promotions")
            .route("", web::get().to(list_promotions))
            .route("", web::post().to(create_promotion))
            .route("/locked-plans", web::get().to(locked_plans))
            .route("/{id}", web::get().to(get_promotion))
            .route("/{id}", web::put().to(update_promotion))
            .route("/{id}/archive", web::post().to(archive_promotion)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_plans_query_parses_exclude_id() {
        let query = web::Query::<LockedPlansQuery>::from_query("exclude=5").unwrap();
        assert_eq!(query.exclude, Some(5));

        let query = web::Query::<LockedPlansQuery>::from_query("").unwrap();
        assert_eq!(query.exclude, None);
    }
}
