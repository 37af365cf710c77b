use crate::error::AppError;
use crate::middlewares::AuthenticatedUser;
use crate::models::*;
use crate::services::CheckoutService;
use actix_web::{HttpMessage, HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;
use uuid::Uuid;

fn current_user(req: &HttpRequest) -> Result<AuthenticatedUser, AppError> {
    req.extensions()
        .get::<AuthenticatedUser>()
        .copied()
        .ok_or_else(|| AppError::AuthError("Missing access token".to_string()))
}

#[utoipa::path(
    post,
    path = "/checkout/intents",
    tag = "checkout",
    request_body = CreateCheckoutIntentRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Priced pending intent", body = CheckoutIntentResponse),
        (status = 400, description = "Plan missing or inactive"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn create_checkout_intent(
    checkout_service: web::Data<CheckoutService>,
    req: HttpRequest,
    request: web::Json<CreateCheckoutIntentRequest>,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };
    match checkout_service
        .create_intent(user.id, request.into_inner())
        .await
    {
        Ok(intent) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": intent
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/checkout/intents",
    tag = "checkout",
    params(
        ("page" = Option<u64>, Query, description = "Page number"),
        ("per_page" = Option<u64>, Query, description = "Items per page")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller's checkout intents, newest first"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_checkout_intents(
    checkout_service: web::Data<CheckoutService>,
    req: HttpRequest,
    query: web::Query<CheckoutIntentQuery>,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };
    match checkout_service.list_user_intents(user.id, &query).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/checkout/intents/{reference}",
    tag = "checkout",
    params(("reference" = Uuid, Path, description = "Intent reference")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Intent snapshot", body = CheckoutIntentResponse),
        (status = 404, description = "Intent not found")
    )
)]
pub async fn get_checkout_intent(
    checkout_service: web::Data<CheckoutService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };
    match checkout_service.get_intent(user.id, path.into_inner()).await {
        Ok(intent) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": intent
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/checkout/intents/{reference}/confirm",
    tag = "checkout",
    params(("reference" = Uuid, Path, description = "Intent reference")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Intent paid; the redemption ledger row is recorded", body = CheckoutIntentResponse),
        (status = 400, description = "Intent not confirmable or promotion quota exhausted"),
        (status = 404, description = "Intent not found")
    )
)]
pub async fn confirm_checkout_intent(
    checkout_service: web::Data<CheckoutService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };
    match checkout_service
        .confirm_intent(user.id, path.into_inner())
        .await
    {
        Ok(intent) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": intent
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn checkout_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/checkout")
            .route("/intents", web::post().to(create_checkout_intent))
            .route("/intents", web::get().to(list_checkout_intents))
            .route("/intents/{reference}", web::get().to(get_checkout_intent))
            .route(
                "/intents/{reference}/confirm",
                web::post().to(confirm_checkout_intent),
            ),
    );
}
