use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::CheckoutIntentStatus;
use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.as_mut().unwrap();
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        )
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::plan::list_active_plans,
        handlers::plan::list_plans,
        handlers::plan::create_plan,
        handlers::plan::update_plan,
        handlers::plan::activate_plan,
        handlers::plan::deactivate_plan,
        handlers::promotion::list_promotions,
        handlers::promotion::locked_plans,
        handlers::promotion::get_promotion,
        handlers::promotion::create_promotion,
        handlers::promotion::update_promotion,
        handlers::promotion::archive_promotion,
        handlers::checkout::create_checkout_intent,
        handlers::checkout::list_checkout_intents,
        handlers::checkout::get_checkout_intent,
        handlers::checkout::confirm_checkout_intent,
    ),
    components(
        schemas(
            PlanResponse,
            CreatePlanRequest,
            UpdatePlanRequest,
            PlanListQuery,
            CreatePromotionRequest,
            UpdatePromotionRequest,
            PromotionResponse,
            PromotionListQuery,
            LockedPlansQuery,
            LockedPlan,
            CreateCheckoutIntentRequest,
            CheckoutIntentResponse,
            CheckoutIntentQuery,
            CheckoutIntentStatus,
            PaginationParams,
            ApiError,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "plan", description = "Subscription plan catalog API"),
        (name = "checkout", description = "Checkout intent API"),
        (name = "admin-plan", description = "Plan administration API"),
        (name = "admin-promotion", description = "Promotion administration API"),
    ),
    info(
        title = "Duostory Billing API",
        version = "1.0.0",
        description = "Promotion eligibility and checkout pricing REST API documentation",
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
